use ratatui::prelude::*;
use ratatui::widgets::ListState;
use rust_decimal::Decimal;

use crate::query::{CacheEntry, QueryStatus};

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Format a price in the store currency
pub fn format_price(amount: Decimal) -> String {
  format!("${:.2}", amount.round_dp(2))
}

/// Wishlist marker for a product row
pub fn heart(member: bool, pending: bool) -> Span<'static> {
  let style = if pending {
    Style::default().fg(Color::DarkGray)
  } else {
    Style::default().fg(Color::Red)
  };
  Span::styled(if member { "♥" } else { "♡" }, style)
}

/// Title suffix describing an entry's load state
pub fn entry_suffix(entry: &CacheEntry) -> String {
  match entry.status {
    QueryStatus::Idle => String::new(),
    QueryStatus::Loading => " (loading...)".to_string(),
    QueryStatus::Error => match &entry.error {
      Some(e) => format!(" (error: {})", e),
      None => " (error)".to_string(),
    },
    QueryStatus::Success if entry.is_stale() => " (stale)".to_string(),
    QueryStatus::Success => String::new(),
  }
}

/// Keep a list selection within bounds after its items changed
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}
