use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use super::format_price;
use crate::api::types::CartSummary;
use crate::query::{CacheEntry, QueryStatus};
use crate::ui::view::ShortcutInfo;

/// Everything the header shows besides the logo
pub struct HeaderInfo<'a> {
  pub title: &'a str,
  /// Signed-in customer's display name; `None` for guests
  pub customer: Option<&'a str>,
  /// Cart summary entry; `None` for guests
  pub cart: Option<&'a CacheEntry>,
  pub shortcuts: &'a [ShortcutInfo],
}

/// Draw the header bar with logo, store, customer, cart and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, info: &HeaderInfo) {
  let mut spans = vec![
    Span::styled(" shelf ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", info.title), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
  ];

  match info.customer {
    Some(name) => spans.push(Span::styled(
      format!(" {} ", name),
      Style::default().fg(Color::Yellow).bold(),
    )),
    None => spans.push(Span::styled(" guest ", Style::default().fg(Color::DarkGray))),
  }

  if let Some(entry) = info.cart {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      format!(" {} ", cart_label(entry)),
      Style::default().fg(Color::Green),
    ));
  }

  spans.push(Span::raw("  "));
  // Shortcuts - keys highlighted, descriptions dimmed
  let mut shortcuts: Vec<&ShortcutInfo> = info.shortcuts.iter().collect();
  shortcuts.sort_by_key(|s| s.priority);
  for (i, shortcut) in shortcuts.iter().enumerate() {
    if i > 0 {
      spans.push(Span::raw("   "));
    }
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Cart text for the header, e.g. `cart 3 · $59.97`
pub fn cart_label(entry: &CacheEntry) -> String {
  match entry.data::<CartSummary>() {
    Some(summary) => format!("cart {} · {}", summary.count, format_price(summary.total)),
    None if entry.status == QueryStatus::Error => "cart unavailable".to_string(),
    None => "cart ...".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::{keys, CachePolicy, QueryCache};
  use crate::api::types::CustomerId;
  use rust_decimal::Decimal;

  #[tokio::test]
  async fn test_cart_label() {
    let cache = QueryCache::new(CachePolicy::default());
    let key = keys::cart::summary(&CustomerId::new("ada"));
    assert_eq!(cart_label(&cache.get(&key)), "cart ...");

    cache
      .fetch(key.clone(), || async {
        Ok(CartSummary {
          count: 3,
          total: Decimal::new(5997, 2),
        })
      })
      .await
      .unwrap();
    assert_eq!(cart_label(&cache.get(&key)), "cart 3 · $59.97");
  }
}
