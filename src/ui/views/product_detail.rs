use crate::api::types::Product;
use crate::query::{keys, CacheEntry, EntryWatch};
use crate::ui::renderfns::{entry_suffix, format_price, heart};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::ViewContext;
use crate::wishlist::WishlistState;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tokio::sync::watch;

/// View for displaying one product
///
/// Opens with the row the customer selected and switches to the detail
/// response once it arrives.
pub struct ProductDetailView {
  ctx: ViewContext,
  summary: Product,
  detail_watch: EntryWatch,
  detail: CacheEntry,
  wishlist_rx: watch::Receiver<WishlistState>,
  wishlist: WishlistState,
  scroll: u16,
}

impl ProductDetailView {
  pub fn new(ctx: ViewContext, summary: Product) -> Self {
    let mut detail_watch = ctx.store.detail(&summary.id);
    let detail = detail_watch.mark_seen();
    let mut wishlist_rx = ctx.store.wishlist.subscribe();
    let wishlist = wishlist_rx.borrow_and_update().clone();

    Self {
      ctx,
      summary,
      detail_watch,
      detail,
      wishlist_rx,
      wishlist,
      scroll: 0,
    }
  }

  fn product(&self) -> Product {
    self
      .detail
      .data::<Product>()
      .map(|p| (*p).clone())
      .unwrap_or_else(|| self.summary.clone())
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let product = self.product();
    let block = Block::default()
      .title(format!(" {}{} ", product.name, entry_suffix(&self.detail)))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(4), // Price, stock, category, wishlist
        Constraint::Length(1), // Separator
        Constraint::Min(1),    // Description
      ])
      .split(inner);

    let member = self.wishlist.contains(&product.id);
    let pending = self.wishlist.is_pending(&product.id);
    let wishlist_label = match (self.ctx.store.auth.is_authenticated(), member) {
      (false, _) => "sign in to save",
      (true, true) => "saved",
      (true, false) => "not saved",
    };
    let stock = if product.in_stock {
      Span::styled("In stock", Style::default().fg(Color::Green))
    } else {
      Span::styled("Out of stock", Style::default().fg(Color::Red))
    };

    let header = vec![
      Line::from(vec![
        Span::styled("Price:    ", Style::default().fg(Color::DarkGray)),
        Span::styled(format_price(product.price), Style::default().fg(Color::Green).bold()),
      ]),
      Line::from(vec![
        Span::styled("Stock:    ", Style::default().fg(Color::DarkGray)),
        stock,
      ]),
      Line::from(vec![
        Span::styled("Category: ", Style::default().fg(Color::DarkGray)),
        Span::raw(product.category.clone().unwrap_or_else(|| "-".to_string())),
      ]),
      Line::from(vec![
        Span::styled("Wishlist: ", Style::default().fg(Color::DarkGray)),
        heart(member, pending),
        Span::raw(" "),
        Span::raw(wishlist_label),
      ]),
    ];
    frame.render_widget(Paragraph::new(header), chunks[0]);

    let separator = "─".repeat(chunks[1].width as usize);
    frame.render_widget(
      Paragraph::new(separator).style(Style::default().fg(Color::DarkGray)),
      chunks[1],
    );

    let description = match (&product.description, self.detail.is_loading()) {
      (Some(text), _) => Paragraph::new(text.clone()),
      (None, true) => {
        Paragraph::new("Loading description...").style(Style::default().fg(Color::DarkGray))
      }
      (None, false) => Paragraph::new("No description.").style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(
      description.wrap(Wrap { trim: false }).scroll((self.scroll, 0)),
      chunks[2],
    );
  }
}

impl View for ProductDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.scroll = self.scroll.saturating_add(1);
        ViewAction::None
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.scroll = self.scroll.saturating_sub(1);
        ViewAction::None
      }
      KeyCode::Char('w') => {
        self.ctx.toggle_wishlist(&self.summary.id);
        ViewAction::None
      }
      KeyCode::Char('r') => {
        let key = keys::products::detail(&self.summary.id);
        self.ctx.store.cache.invalidate(move |k| *k == key);
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.summary.name.clone()
  }

  fn tick(&mut self) -> ViewAction {
    if self.detail_watch.has_changed() {
      self.detail = self.detail_watch.mark_seen();
    }
    if self.wishlist_rx.has_changed().unwrap_or(false) {
      self.wishlist = self.wishlist_rx.borrow_and_update().clone();
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("w", "wishlist").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
