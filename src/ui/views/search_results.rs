use crate::search::{SearchState, Surface};
use crate::ui::components::{KeyResult, SearchBox, SearchEvent};
use crate::ui::renderfns::results::{result_items, result_rows, step_selection, ResultRow};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ProductDetailView;
use crate::ui::ViewContext;
use crate::wishlist::WishlistState;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListState, Paragraph};
use tokio::sync::watch;

/// Full results page for one query, with paging
pub struct SearchResultsView {
  ctx: ViewContext,
  search: SearchBox,
  results_rx: watch::Receiver<SearchState>,
  results: SearchState,
  list_state: ListState,
  wishlist_rx: watch::Receiver<WishlistState>,
  wishlist: WishlistState,
}

impl SearchResultsView {
  pub fn new(ctx: ViewContext, query: &str) -> Self {
    let mut results_rx = ctx.store.search.subscribe(Surface::Page);
    let results = results_rx.borrow_and_update().clone();
    let mut wishlist_rx = ctx.store.wishlist.subscribe();
    let wishlist = wishlist_rx.borrow_and_update().clone();

    let mut view = Self {
      ctx,
      search: SearchBox::new(),
      results_rx,
      results,
      list_state: ListState::default(),
      wishlist_rx,
      wishlist,
    };
    view.run(query);
    view
  }

  /// Replace the query shown on this page
  fn run(&mut self, query: &str) {
    self.search.set_query(query);
    self.list_state.select(None);
    self.ctx.store.search.search(Surface::Page, query);
  }

  fn title(&self) -> String {
    let state = &self.results;
    let mut title = format!(" \"{}\"", self.search.query().trim());
    if state.total_products > 0 || state.total_categories > 0 {
      title.push_str(&format!(
        " {} products, {} categories",
        state.total_products, state.total_categories
      ));
    }
    if state.total_pages > 1 {
      title.push_str(&format!(" page {}/{}", state.page, state.total_pages));
    }
    if state.is_searching() {
      title.push_str(" (searching...)");
    }
    title.push(' ');
    title
  }

  fn render_results(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let rows = result_rows(&self.results);
    if rows.is_empty() {
      let message = self
        .results
        .message()
        .unwrap_or_else(|| "Searching...".to_string());
      let paragraph = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    match self.list_state.selected() {
      Some(i) if rows.get(i).is_some_and(|r| r.is_selectable()) => {}
      current => self.list_state.select(step_selection(&rows, current, 1)),
    }
    let width = area.width.saturating_sub(4) as usize;
    let list = List::new(result_items(&rows, &self.wishlist, width))
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn selected_row(&self) -> Option<ResultRow<'_>> {
    let idx = self.list_state.selected()?;
    result_rows(&self.results).get(idx).copied()
  }

  fn goto_page(&mut self, page: u32) {
    if self.ctx.store.search.goto_page(Surface::Page, page) {
      self.list_state.select(None);
    }
  }

  // Key handling helpers for or_else chain pattern
  fn handle_search(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.search.handle_key(key) {
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Changed(query)) => {
        self.list_state.select(None);
        self.ctx.store.search.search(Surface::Page, &query);
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Submitted(_)) => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let step = match key.code {
      KeyCode::Char('j') | KeyCode::Down => 1,
      KeyCode::Char('k') | KeyCode::Up => -1,
      KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => {
        if self.results.has_next_page() {
          self.goto_page(self.results.page + 1);
        }
        return Some(ViewAction::None);
      }
      KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => {
        if self.results.has_prev_page() {
          self.goto_page(self.results.page - 1);
        }
        return Some(ViewAction::None);
      }
      _ => return None,
    };
    let next = step_selection(&result_rows(&self.results), self.list_state.selected(), step);
    self.list_state.select(next);
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Enter => match self.selected_row()? {
        ResultRow::Product(product) => Some(ViewAction::Push(Box::new(ProductDetailView::new(
          self.ctx.clone(),
          product.clone(),
        )))),
        ResultRow::Category(category) => {
          let name = category.name.clone();
          self.run(&name);
          Some(ViewAction::None)
        }
        ResultRow::Heading(_) => None,
      },
      KeyCode::Char('w') => match self.selected_row()? {
        ResultRow::Product(product) => {
          self.ctx.toggle_wishlist(&product.id);
          Some(ViewAction::None)
        }
        _ => None,
      },
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for SearchResultsView {
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

    self.search.render(frame, chunks[0], "Press / to refine");
    self.render_results(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Search \"{}\"", self.search.query().trim())
  }

  fn captures_input(&self) -> bool {
    self.search.is_focused()
  }

  fn tick(&mut self) -> ViewAction {
    if self.results_rx.has_changed().unwrap_or(false) {
      self.results = self.results_rx.borrow_and_update().clone();
    }
    if self.wishlist_rx.has_changed().unwrap_or(false) {
      self.wishlist = self.wishlist_rx.borrow_and_update().clone();
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "refine").with_priority(20),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("w", "wishlist").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

impl Drop for SearchResultsView {
  fn drop(&mut self) {
    self.ctx.store.search.teardown(Surface::Page);
  }
}
