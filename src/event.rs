use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh and query polling
  Tick,
  /// Raised by background work started from a view
  Ui(UiEvent),
}

/// Side effects views ask the app to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
  /// Navigate to an app path such as `/sign_in`
  Redirect(&'static str),
  /// One-line message for the footer
  Notice(String),
}

/// Handle views use to raise [`UiEvent`]s
#[derive(Debug, Clone)]
pub struct UiSender {
  tx: mpsc::UnboundedSender<Event>,
}

impl UiSender {
  pub fn send(&self, event: UiEvent) {
    // The loop is gone only when the app is exiting
    let _ = self.tx.send(Event::Ui(event));
  }

  #[cfg(test)]
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // crossterm polling blocks, so keep it off the async workers
    let input_tx = tx.clone();
    tokio::task::spawn_blocking(move || loop {
      if event::poll(tick_rate).unwrap_or(false) {
        if let Ok(CrosstermEvent::Key(key)) = event::read() {
          if input_tx.send(Event::Key(key)).is_err() {
            break;
          }
        }
      } else if input_tx.send(Event::Tick).is_err() {
        break;
      }
    });

    Self { tx, rx }
  }

  pub fn sender(&self) -> UiSender {
    UiSender {
      tx: self.tx.clone(),
    }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
