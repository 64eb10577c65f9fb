use crate::api::types::{CustomerId, Product};
use crate::auth::AuthSession;
use crate::error::SIGN_IN_PATH;
use crate::event::UiEvent;
use crate::query::{CacheEntry, EntryWatch, QueryStatus};
use crate::ui::renderfns::results::product_line;
use crate::ui::renderfns::{ensure_valid_selection, entry_suffix};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ProductDetailView;
use crate::ui::ViewContext;
use crate::wishlist::WishlistState;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::sync::Arc;
use tokio::sync::watch;

/// The signed-in customer's saved products
pub struct WishlistView {
  ctx: ViewContext,
  session_rx: watch::Receiver<AuthSession>,
  customer: Option<CustomerId>,
  products_watch: Option<EntryWatch>,
  products: Option<CacheEntry>,
  wishlist_rx: watch::Receiver<WishlistState>,
  wishlist: WishlistState,
  list_state: ListState,
}

impl WishlistView {
  pub fn new(ctx: ViewContext) -> Self {
    let session_rx = ctx.store.auth.subscribe();
    let mut wishlist_rx = ctx.store.wishlist.subscribe();
    let wishlist = wishlist_rx.borrow_and_update().clone();

    let mut view = Self {
      ctx,
      session_rx,
      customer: None,
      products_watch: None,
      products: None,
      wishlist_rx,
      wishlist,
      list_state: ListState::default(),
    };
    view.follow_session();
    view
  }

  /// Re-observe the list when the customer changes
  fn follow_session(&mut self) {
    let customer = self.session_rx.borrow_and_update().customer_id().cloned();
    if customer == self.customer && self.products_watch.is_some() == customer.is_some() {
      return;
    }
    self.customer = customer;
    self.products_watch = self.ctx.store.wishlist.products();
    self.products = self.products_watch.as_mut().map(|w| w.mark_seen());
    self.list_state.select(None);
  }

  fn items(&self) -> Option<Arc<Vec<Product>>> {
    self.products.as_ref()?.data::<Vec<Product>>()
  }

  fn selected(&self) -> Option<Product> {
    let idx = self.list_state.selected()?;
    self.items()?.get(idx).cloned()
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let Some(entry) = self.products.as_ref() else {
      let block = Block::default()
        .title(" Wishlist ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
      let paragraph = Paragraph::new("Sign in to see your wishlist. Press Enter to sign in.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    let items = self.items();
    let count = items.as_ref().map(|i| i.len()).unwrap_or(0);
    let block = Block::default()
      .title(format!(" Wishlist ({}){} ", count, entry_suffix(entry)))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(items) = items.filter(|i| !i.is_empty()) else {
      let content = match entry.status {
        QueryStatus::Error => "Failed to load wishlist. Press 'r' to retry.",
        QueryStatus::Loading | QueryStatus::Idle => "Loading wishlist...",
        QueryStatus::Success => "Nothing saved yet. Press 'w' on a product to save it.",
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    ensure_valid_selection(&mut self.list_state, items.len());
    let width = area.width.saturating_sub(4) as usize;
    let rows: Vec<ListItem> = items
      .iter()
      .map(|product| ListItem::new(product_line(product, &self.wishlist, width)))
      .collect();
    let list = List::new(rows)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        Some(ViewAction::None)
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        Some(ViewAction::None)
      }
      _ => None,
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Enter if self.customer.is_none() => {
        self.ctx.ui.send(UiEvent::Redirect(SIGN_IN_PATH));
        Some(ViewAction::None)
      }
      KeyCode::Enter => {
        let product = self.selected()?;
        Some(ViewAction::Push(Box::new(ProductDetailView::new(
          self.ctx.clone(),
          product,
        ))))
      }
      KeyCode::Char('w') => {
        let product = self.selected()?;
        self.ctx.toggle_wishlist(&product.id);
        Some(ViewAction::None)
      }
      KeyCode::Char('r') => {
        self.ctx.store.wishlist.refresh();
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for WishlistView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_navigation(key)
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Wishlist".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if self.session_rx.has_changed().unwrap_or(false) {
      self.follow_session();
    }
    if let Some(watch) = self.products_watch.as_mut() {
      if watch.has_changed() {
        self.products = Some(watch.mark_seen());
      }
    }
    if self.wishlist_rx.has_changed().unwrap_or(false) {
      self.wishlist = self.wishlist_rx.borrow_and_update().clone();
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("w", "remove").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
