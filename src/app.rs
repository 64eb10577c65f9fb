use crate::api::types::CustomerId;
use crate::commands::{CommandId, Invocation};
use crate::error::SIGN_IN_PATH;
use crate::event::{Event, EventHandler, UiEvent, UiSender};
use crate::query::{CacheEntry, EntryWatch};
use crate::store::Storefront;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{HomeView, SearchResultsView, SignInView, WishlistView};
use crate::ui::ViewContext;
use crate::wishlist::WishlistState;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How long a footer notice stays up
const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Command palette (opened with :)
  palette: CommandInput,

  /// Store name for the header
  title: String,

  store: Storefront,

  /// Event sender for background work started by views
  ui: UiSender,

  /// Footer message and when it was raised
  notice: Option<(String, Instant)>,

  wishlist_rx: watch::Receiver<WishlistState>,

  /// Keeps the signed-in customer's cart entry observed
  cart_watch: Option<(CustomerId, EntryWatch)>,

  /// Latest cart summary entry; `None` for guests
  cart: Option<CacheEntry>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(title: String, store: Storefront, ui: UiSender) -> Self {
    let wishlist_rx = store.wishlist.subscribe();
    let mut app = Self {
      view_stack: Vec::new(),
      palette: CommandInput::new(),
      title,
      store,
      ui,
      notice: None,
      wishlist_rx,
      cart_watch: None,
      cart: None,
      should_quit: false,
    };
    app.reset_root(|ctx| Box::new(HomeView::new(ctx)));
    app.refresh_cart();
    app
  }

  pub async fn run(&mut self, mut events: EventHandler) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    info!("terminal ready");

    // Main loop
    while !self.should_quit {
      // Draw UI
      terminal.draw(|frame| ui::draw(frame, self))?;

      // Handle events
      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    // Views tear down their search surfaces on drop
    self.view_stack.clear();
    self.store.teardown();

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn context(&self) -> ViewContext {
    ViewContext::new(self.store.clone(), self.ui.clone())
  }

  /// Replace the whole stack with a new root view.
  ///
  /// The old views are dropped before the new one is built so a view that
  /// owns a search surface never tears down its successor's state.
  fn reset_root<F>(&mut self, build: F)
  where
    F: FnOnce(ViewContext) -> Box<dyn View>,
  {
    self.view_stack.clear();
    let view = build(self.context());
    self.view_stack.push(view);
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::Ui(event) => self.handle_ui_event(event),
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let view_has_input = self
      .view_stack
      .last()
      .map(|v| v.captures_input())
      .unwrap_or(false);
    if self.palette.is_active() || !view_has_input {
      match self.palette.handle_key(key) {
        KeyResult::Handled => return,
        KeyResult::Event(event) => {
          self.handle_command(event);
          return;
        }
        KeyResult::NotHandled => {}
      }
    }

    if let Some(view) = self.view_stack.last_mut() {
      let action = view.handle_key(key);
      self.apply(action);
    }
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        debug!(view = %view.breadcrumb_label(), "push view");
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn handle_command(&mut self, event: CommandEvent) {
    let Invocation { id, argument } = match event {
      CommandEvent::Run(invocation) => invocation,
      CommandEvent::Unknown(input) => {
        self.set_notice(format!("Unknown command: {}", input));
        return;
      }
      CommandEvent::Cancelled => return,
    };
    debug!(command = ?id, ?argument, "run command");

    match id {
      CommandId::Home => self.reset_root(|ctx| Box::new(HomeView::new(ctx))),
      CommandId::Search => match argument {
        Some(query) => {
          self.reset_root(|ctx| Box::new(HomeView::new(ctx)));
          let view = SearchResultsView::new(self.context(), &query);
          self.view_stack.push(Box::new(view));
        }
        None => self.set_notice("Usage: :search <query>".to_string()),
      },
      CommandId::Wishlist => self.reset_root(|ctx| Box::new(WishlistView::new(ctx))),
      CommandId::SignIn => match self.store.auth.session().customer() {
        Some(customer) => self.set_notice(format!("Already signed in as {}", customer.name)),
        None => self.navigate(SIGN_IN_PATH),
      },
      CommandId::SignOut => {
        if self.store.auth.is_authenticated() {
          self.store.auth.logout();
          self.set_notice("Signed out".to_string());
        }
      }
      CommandId::Quit => self.should_quit = true,
    }
  }

  fn handle_ui_event(&mut self, event: UiEvent) {
    match event {
      UiEvent::Redirect(path) => self.navigate(path),
      UiEvent::Notice(message) => self.set_notice(message),
    }
  }

  /// Open the view behind an app path, unless it is already showing
  fn navigate(&mut self, path: &'static str) {
    if self.view_stack.last().and_then(|v| v.route()) == Some(path) {
      return;
    }
    match path {
      SIGN_IN_PATH => {
        let view = SignInView::new(self.context());
        self.view_stack.push(Box::new(view));
      }
      other => warn!(path = other, "no view for path"),
    }
  }

  fn set_notice(&mut self, message: String) {
    self.notice = Some((message, Instant::now()));
  }

  fn tick(&mut self) {
    // Every view refreshes its snapshots; only the visible one may navigate
    let mut action = ViewAction::None;
    let top = self.view_stack.len().saturating_sub(1);
    for (i, view) in self.view_stack.iter_mut().enumerate() {
      let requested = view.tick();
      if i == top {
        action = requested;
      }
    }
    self.apply(action);

    if self.wishlist_rx.has_changed().unwrap_or(false) {
      let notice = self.wishlist_rx.borrow_and_update().notice.clone();
      if let Some(notice) = notice {
        self.set_notice(notice);
        self.store.wishlist.dismiss_notice();
      }
    }

    if let Some((_, raised)) = &self.notice {
      if raised.elapsed() >= NOTICE_TTL {
        self.notice = None;
      }
    }

    self.refresh_cart();
  }

  /// Follow the signed-in customer's cart summary.
  ///
  /// `get_summary` refetches once the entry is stale, so calling it every
  /// tick keeps the header current without extra requests.
  fn refresh_cart(&mut self) {
    let customer = self.store.auth.session().customer_id().cloned();
    let watched = self.cart_watch.as_ref().map(|(id, _)| id);
    if watched != customer.as_ref() {
      self.cart_watch = match &customer {
        Some(id) => self.store.cart.watch().map(|w| (id.clone(), w)),
        None => None,
      };
    }
    self.cart = customer.map(|id| self.store.cart.get_summary(Some(&id)));
  }

  // Accessors for UI rendering
  pub fn store(&self) -> &Storefront {
    &self.store
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn cart_entry(&self) -> Option<CacheEntry> {
    self.cart.clone()
  }

  pub fn notice(&self) -> Option<&str> {
    self.notice.as_ref().map(|(message, _)| message.as_str())
  }

  pub fn palette(&self) -> &CommandInput {
    &self.palette
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}
