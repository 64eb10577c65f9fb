use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Events emitted by the search box that the parent view handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Text changed; emitted on each edit and with an empty string on cancel
  Changed(String),
  /// Enter pressed with this text
  Submitted(String),
}

/// Always-visible search field, focused with `/`
#[derive(Debug, Clone, Default)]
pub struct SearchBox {
  input: TextInput,
  focused: bool,
}

impl SearchBox {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_focused(&self) -> bool {
    self.focused
  }

  pub fn focus(&mut self) {
    self.focused = true;
  }

  pub fn query(&self) -> &str {
    self.input.value()
  }

  /// Show `query` without reporting an edit
  pub fn set_query(&mut self, query: &str) {
    self.input.set_value(query);
  }

  /// Handle a key event
  /// Call this regardless of focus - it handles focusing too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.focused {
      if key.code == KeyCode::Char('/') {
        self.focused = true;
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Edited => KeyResult::Event(SearchEvent::Changed(self.input.value().to_string())),
      InputResult::Moved => KeyResult::Handled,
      InputResult::Submitted(query) => {
        self.focused = false;
        KeyResult::Event(SearchEvent::Submitted(query))
      }
      InputResult::Cancelled => {
        self.focused = false;
        self.input.clear();
        KeyResult::Event(SearchEvent::Changed(String::new()))
      }
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, placeholder: &str) {
    let accent = if self.focused { Color::Yellow } else { Color::Blue };
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(accent))
      .title(" Search ");

    let line = if self.focused {
      self.input.line("/", accent)
    } else if self.input.is_empty() {
      Line::from(Span::styled(
        placeholder.to_string(),
        Style::default().fg(Color::DarkGray),
      ))
    } else {
      Line::from(self.input.display())
    };
    frame.render_widget(Paragraph::new(line).block(block), area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_slash_focuses() {
    let mut search = SearchBox::new();
    assert_eq!(search.handle_key(key(KeyCode::Char('v'))), KeyResult::NotHandled);
    assert_eq!(search.handle_key(key(KeyCode::Char('/'))), KeyResult::Handled);
    assert!(search.is_focused());
  }

  #[test]
  fn test_every_edit_is_reported() {
    let mut search = SearchBox::new();
    search.focus();
    assert_eq!(
      search.handle_key(key(KeyCode::Char('v'))),
      KeyResult::Event(SearchEvent::Changed("v".to_string()))
    );
    assert_eq!(
      search.handle_key(key(KeyCode::Char('i'))),
      KeyResult::Event(SearchEvent::Changed("vi".to_string()))
    );
    assert_eq!(search.handle_key(key(KeyCode::Left)), KeyResult::Handled);
  }

  #[test]
  fn test_escape_clears_and_reports_empty() {
    let mut search = SearchBox::new();
    search.focus();
    search.handle_key(key(KeyCode::Char('v')));
    assert_eq!(
      search.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(SearchEvent::Changed(String::new()))
    );
    assert!(!search.is_focused());
    assert_eq!(search.query(), "");
  }

  #[test]
  fn test_enter_submits_and_keeps_text() {
    let mut search = SearchBox::new();
    search.focus();
    search.handle_key(key(KeyCode::Char('b')));
    assert_eq!(
      search.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(SearchEvent::Submitted("b".to_string()))
    );
    assert_eq!(search.query(), "b");
  }

  #[test]
  fn test_arrows_pass_through_while_focused() {
    let mut search = SearchBox::new();
    search.focus();
    assert_eq!(search.handle_key(key(KeyCode::Down)), KeyResult::NotHandled);
  }
}
