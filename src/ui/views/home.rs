use crate::api::types::{ListingParams, Product};
use crate::query::{keys, CacheEntry, EntryWatch};
use crate::search::{SearchState, Surface};
use crate::store::ListingPage;
use crate::ui::components::{KeyResult, SearchBox, SearchEvent};
use crate::ui::renderfns::results::{product_line, result_items, result_rows, step_selection, ResultRow};
use crate::ui::renderfns::{ensure_valid_selection, entry_suffix};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{ProductDetailView, SearchResultsView};
use crate::ui::ViewContext;
use crate::wishlist::WishlistState;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::sync::Arc;
use tokio::sync::watch;

/// Products shown under the search box while it is empty
fn picks_params() -> ListingParams {
  ListingParams {
    page: 1,
    limit: 8,
    category: None,
    sort: Some("popular".to_string()),
  }
}

/// Landing view: search box with live dropdown, and recommended products
pub struct HomeView {
  ctx: ViewContext,
  search: SearchBox,
  dropdown_rx: watch::Receiver<SearchState>,
  dropdown: SearchState,
  dropdown_state: ListState,
  wishlist_rx: watch::Receiver<WishlistState>,
  wishlist: WishlistState,
  picks_watch: EntryWatch,
  picks: CacheEntry,
  picks_state: ListState,
}

impl HomeView {
  pub fn new(ctx: ViewContext) -> Self {
    let mut dropdown_rx = ctx.store.search.subscribe(Surface::Dropdown);
    let dropdown = dropdown_rx.borrow_and_update().clone();
    let mut wishlist_rx = ctx.store.wishlist.subscribe();
    let wishlist = wishlist_rx.borrow_and_update().clone();
    let mut picks_watch = ctx.store.listing(&picks_params());
    let picks = picks_watch.mark_seen();

    Self {
      ctx,
      search: SearchBox::new(),
      dropdown_rx,
      dropdown,
      dropdown_state: ListState::default(),
      wishlist_rx,
      wishlist,
      picks_watch,
      picks,
      picks_state: ListState::default(),
    }
  }

  /// The dropdown replaces the picks whenever the box has text
  fn dropdown_open(&self) -> bool {
    !self.search.query().trim().is_empty()
  }

  fn picks(&self) -> Option<Arc<ListingPage>> {
    self.picks.data::<ListingPage>()
  }

  fn selected_pick(&self) -> Option<Product> {
    let idx = self.picks_state.selected()?;
    self.picks()?.items.get(idx).cloned()
  }

  fn selected_row(&self) -> Option<ResultRow<'_>> {
    let idx = self.dropdown_state.selected()?;
    result_rows(&self.dropdown).get(idx).copied()
  }

  fn render_dropdown(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" Results for \"{}\" ", self.search.query().trim()))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));

    let rows = result_rows(&self.dropdown);
    if rows.is_empty() {
      let message = self
        .dropdown
        .message()
        .unwrap_or_else(|| "Searching...".to_string());
      let paragraph = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    match self.dropdown_state.selected() {
      Some(i) if rows.get(i).is_some_and(|r| r.is_selectable()) => {}
      current => self.dropdown_state.select(step_selection(&rows, current, 1)),
    }
    let width = area.width.saturating_sub(4) as usize;
    let list = List::new(result_items(&rows, &self.wishlist, width))
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.dropdown_state);
  }

  fn render_picks(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" You may like{} ", entry_suffix(&self.picks)))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(page) = self.picks() else {
      let content = if self.picks.is_error() {
        "Failed to load products. Press 'r' to retry."
      } else {
        "Loading products..."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    ensure_valid_selection(&mut self.picks_state, page.items.len());
    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = page
      .items
      .iter()
      .map(|product| ListItem::new(product_line(product, &self.wishlist, width)))
      .collect();
    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.picks_state);
  }

  // Key handling helpers for or_else chain pattern
  fn handle_search(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.search.handle_key(key) {
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Changed(query)) => {
        self.dropdown_state.select(None);
        self.ctx.store.search.search(Surface::Dropdown, &query);
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Submitted(query)) => {
        if query.trim().is_empty() {
          return Some(ViewAction::None);
        }
        Some(ViewAction::Push(Box::new(SearchResultsView::new(
          self.ctx.clone(),
          &query,
        ))))
      }
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let step = match key.code {
      KeyCode::Char('j') | KeyCode::Down => 1,
      KeyCode::Char('k') | KeyCode::Up => -1,
      _ => return None,
    };
    if self.dropdown_open() {
      let next = step_selection(&result_rows(&self.dropdown), self.dropdown_state.selected(), step);
      self.dropdown_state.select(next);
    } else if step > 0 {
      self.picks_state.select_next();
    } else {
      self.picks_state.select_previous();
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Enter if self.dropdown_open() => match self.selected_row()? {
        ResultRow::Product(product) => Some(ViewAction::Push(Box::new(ProductDetailView::new(
          self.ctx.clone(),
          product.clone(),
        )))),
        ResultRow::Category(category) => Some(ViewAction::Push(Box::new(
          SearchResultsView::new(self.ctx.clone(), &category.name),
        ))),
        ResultRow::Heading(_) => None,
      },
      KeyCode::Enter => {
        let product = self.selected_pick()?;
        Some(ViewAction::Push(Box::new(ProductDetailView::new(
          self.ctx.clone(),
          product,
        ))))
      }
      KeyCode::Char('w') => {
        let product = if self.dropdown_open() {
          match self.selected_row()? {
            ResultRow::Product(product) => product.id.clone(),
            _ => return None,
          }
        } else {
          self.selected_pick()?.id
        };
        self.ctx.toggle_wishlist(&product);
        Some(ViewAction::None)
      }
      KeyCode::Char('r') => {
        let key = keys::products::listing(&picks_params());
        self.ctx.store.cache.invalidate(move |k| *k == key);
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for HomeView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_search(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(3), Constraint::Min(1)])
      .split(area);

    self
      .search
      .render(frame, chunks[0], "Press / to search products and categories");
    if self.dropdown_open() {
      self.render_dropdown(frame, chunks[1]);
    } else {
      self.render_picks(frame, chunks[1]);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Home".to_string()
  }

  fn captures_input(&self) -> bool {
    self.search.is_focused()
  }

  fn tick(&mut self) -> ViewAction {
    if self.dropdown_rx.has_changed().unwrap_or(false) {
      self.dropdown = self.dropdown_rx.borrow_and_update().clone();
    }
    if self.wishlist_rx.has_changed().unwrap_or(false) {
      self.wishlist = self.wishlist_rx.borrow_and_update().clone();
    }
    if self.picks_watch.has_changed() {
      self.picks = self.picks_watch.mark_seen();
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("w", "wishlist").with_priority(40),
      ShortcutInfo::new("Enter", "open").with_priority(50),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}

impl Drop for HomeView {
  fn drop(&mut self) {
    self.ctx.store.search.teardown(Surface::Dropdown);
  }
}
