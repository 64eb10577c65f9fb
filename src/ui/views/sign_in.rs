use crate::api::types::{Credentials, CustomerProfile};
use crate::error::{StoreResult, SIGN_IN_PATH};
use crate::event::UiEvent;
use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::ViewContext;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
  Email,
  Password,
}

/// Email and password form; pops itself once the session is established
pub struct SignInView {
  ctx: ViewContext,
  email: TextInput,
  password: TextInput,
  focus: Field,
  pending: Option<oneshot::Receiver<StoreResult<CustomerProfile>>>,
  error: Option<String>,
}

impl SignInView {
  pub fn new(ctx: ViewContext) -> Self {
    Self {
      ctx,
      email: TextInput::new(),
      password: TextInput::masked(),
      focus: Field::Email,
      pending: None,
      error: None,
    }
  }

  fn focused(&mut self) -> &mut TextInput {
    match self.focus {
      Field::Email => &mut self.email,
      Field::Password => &mut self.password,
    }
  }

  fn switch_field(&mut self) {
    self.focus = match self.focus {
      Field::Email => Field::Password,
      Field::Password => Field::Email,
    };
  }

  fn submit(&mut self) {
    if self.pending.is_some() {
      return;
    }
    let credentials = Credentials {
      email: self.email.value().trim().to_string(),
      password: self.password.value().to_string(),
    };
    let auth = self.ctx.store.auth.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(auth.login(&credentials).await);
    });
    self.pending = Some(rx);
    self.error = None;
  }

  fn render_form(&self, frame: &mut Frame, area: Rect) {
    let width = area.width.min(50);
    let form_area = Rect::new(
      area.x + area.width.saturating_sub(width) / 2,
      area.y + area.height.saturating_sub(9) / 2,
      width,
      9.min(area.height),
    );

    frame.render_widget(Clear, form_area);
    let title = if self.pending.is_some() {
      " Sign in (signing in...) "
    } else {
      " Sign in "
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let field = |label: &'static str, input: &TextInput, focused: bool| -> Line<'static> {
      if focused {
        input.line(label, Color::Yellow)
      } else {
        Line::from(vec![
          Span::styled(label, Style::default().fg(Color::DarkGray)),
          Span::raw(input.display()),
        ])
      }
    };

    let mut lines = vec![
      Line::raw(""),
      field("Email:    ", &self.email, self.focus == Field::Email),
      Line::raw(""),
      field("Password: ", &self.password, self.focus == Field::Password),
      Line::raw(""),
    ];
    if let Some(error) = &self.error {
      lines.push(Line::from(Span::styled(
        error.clone(),
        Style::default().fg(Color::Red),
      )));
    }
    frame.render_widget(Paragraph::new(lines), inner);
  }
}

impl View for SignInView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
        self.switch_field();
        return ViewAction::None;
      }
      KeyCode::Enter if self.focus == Field::Email => {
        self.focus = Field::Password;
        return ViewAction::None;
      }
      _ => {}
    }

    match self.focused().handle_key(key) {
      InputResult::Submitted(_) => {
        self.submit();
        ViewAction::None
      }
      InputResult::Cancelled => ViewAction::Pop,
      InputResult::Edited | InputResult::Moved | InputResult::NotHandled => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_form(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Sign in".to_string()
  }

  fn captures_input(&self) -> bool {
    true
  }

  fn route(&self) -> Option<&'static str> {
    Some(SIGN_IN_PATH)
  }

  fn tick(&mut self) -> ViewAction {
    let Some(rx) = self.pending.as_mut() else {
      return ViewAction::None;
    };
    let outcome = match rx.try_recv() {
      Ok(outcome) => outcome,
      Err(TryRecvError::Empty) => return ViewAction::None,
      Err(TryRecvError::Closed) => {
        self.pending = None;
        self.error = Some("Sign in was interrupted".to_string());
        return ViewAction::None;
      }
    };
    self.pending = None;

    match outcome {
      Ok(customer) => {
        self
          .ctx
          .ui
          .send(UiEvent::Notice(format!("Signed in as {}", customer.name)));
        ViewAction::Pop
      }
      Err(e) => {
        self.password.clear();
        self.focus = Field::Password;
        self.error = Some(e.to_string());
        ViewAction::None
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Tab", "next field").with_priority(10),
      ShortcutInfo::new("Enter", "sign in").with_priority(20),
      ShortcutInfo::new("Esc", "cancel").with_priority(90),
    ]
  }
}
