use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{self, Command, Invocation};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

/// Events emitted by the command palette that the app needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  /// A known command was chosen
  Run(Invocation),
  /// Input matched no command
  Unknown(String),
  /// Palette closed without running anything
  Cancelled,
}

/// Command palette with autocomplete, opened with `:`
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  selected_suggestion: usize,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
    self.selected_suggestion = 0;
  }

  fn close(&mut self) {
    self.active = false;
    self.input.clear();
    self.selected_suggestion = 0;
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(self.input.value())
  }

  /// Handle a key event
  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.step_suggestion(1);
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.step_suggestion(-1);
        return KeyResult::Handled;
      }
      _ => {}
    }

    match self.input.handle_key(key) {
      InputResult::Edited => {
        self.selected_suggestion = 0;
        KeyResult::Handled
      }
      InputResult::Moved => KeyResult::Handled,
      InputResult::Submitted(raw) => {
        let event = self.resolve(&raw);
        self.close();
        KeyResult::Event(event)
      }
      InputResult::Cancelled => {
        self.close();
        KeyResult::Event(CommandEvent::Cancelled)
      }
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  fn step_suggestion(&mut self, delta: isize) {
    let len = self.suggestions().len();
    if len > 0 {
      self.selected_suggestion =
        (self.selected_suggestion as isize + delta).rem_euclid(len as isize) as usize;
    }
  }

  /// The highlighted suggestion wins over the typed word; any argument is kept.
  fn resolve(&self, raw: &str) -> CommandEvent {
    let argument = raw
      .trim()
      .split_once(char::is_whitespace)
      .map(|(_, rest)| rest.trim().to_string())
      .filter(|rest| !rest.is_empty());

    if let Some(cmd) = self.suggestions().get(self.selected_suggestion) {
      return CommandEvent::Run(Invocation {
        id: cmd.id,
        argument,
      });
    }
    match commands::parse(raw) {
      Some(invocation) => CommandEvent::Run(invocation),
      None => CommandEvent::Unknown(raw.trim().to_string()),
    }
  }

  /// Render the palette overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();
    let shown = suggestions.len().min(8) as u16;
    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = (3 + shown).min(area.height);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height).intersection(area);

    frame.render_widget(Clear, overlay_area);
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);
    if inner.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    frame.render_widget(Paragraph::new(self.input.line(":", Color::Yellow)), chunks[0]);

    if suggestions.is_empty() || chunks[1].height == 0 {
      return;
    }
    let items: Vec<ListItem> = suggestions
      .iter()
      .take(8)
      .map(|cmd| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<12}", cmd.name), Style::default().fg(Color::Cyan)),
          Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();
    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default();
    state.select(Some(self.selected_suggestion));
    frame.render_stateful_widget(list, chunks[1], &mut state);
  }
}
