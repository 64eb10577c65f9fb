use ratatui::prelude::*;
use ratatui::widgets::ListItem;

use super::{format_price, heart, truncate};
use crate::api::types::{Category, Product};
use crate::search::{ResultSection, SearchState};
use crate::wishlist::WishlistState;

/// One line of a search result list
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResultRow<'a> {
  Heading(&'static str),
  Product(&'a Product),
  Category(&'a Category),
}

impl ResultRow<'_> {
  pub fn is_selectable(&self) -> bool {
    !matches!(self, ResultRow::Heading(_))
  }
}

/// Flatten the non-empty sections, each under its heading.
pub fn result_rows(state: &SearchState) -> Vec<ResultRow<'_>> {
  let mut rows = Vec::new();
  for section in state.sections() {
    rows.push(ResultRow::Heading(section.title()));
    match section {
      ResultSection::Products(products) => rows.extend(products.iter().map(ResultRow::Product)),
      ResultSection::Categories(categories) => {
        rows.extend(categories.iter().map(ResultRow::Category))
      }
    }
  }
  rows
}

/// Index of the next selectable row from `from` in direction `step`, wrapping.
pub fn step_selection(rows: &[ResultRow], from: Option<usize>, step: isize) -> Option<usize> {
  let len = rows.len() as isize;
  if len == 0 {
    return None;
  }
  let mut i = match from {
    Some(i) => i as isize,
    None if step > 0 => -1,
    None => len,
  };
  for _ in 0..len {
    i = (i + step).rem_euclid(len);
    if rows[i as usize].is_selectable() {
      return Some(i as usize);
    }
  }
  None
}

pub fn product_line(product: &Product, wishlist: &WishlistState, width: usize) -> Line<'static> {
  let stock = if product.in_stock {
    Span::raw("")
  } else {
    Span::styled("  out of stock", Style::default().fg(Color::DarkGray))
  };
  Line::from(vec![
    heart(wishlist.contains(&product.id), wishlist.is_pending(&product.id)),
    Span::raw(" "),
    Span::styled(
      format!("{:>9}", format_price(product.price)),
      Style::default().fg(Color::Green),
    ),
    Span::raw("  "),
    Span::raw(truncate(&product.name, width.saturating_sub(14).max(8))),
    stock,
  ])
}

pub fn result_items(rows: &[ResultRow], wishlist: &WishlistState, width: usize) -> Vec<ListItem<'static>> {
  rows
    .iter()
    .map(|row| match row {
      ResultRow::Heading(title) => ListItem::new(Line::from(Span::styled(
        title.to_string(),
        Style::default().fg(Color::Yellow).bold(),
      ))),
      ResultRow::Product(product) => ListItem::new(product_line(product, wishlist, width)),
      ResultRow::Category(category) => {
        let count = category
          .product_count
          .map(|n| format!(" ({})", n))
          .unwrap_or_default();
        ListItem::new(Line::from(vec![
          Span::styled("  # ", Style::default().fg(Color::Cyan)),
          Span::raw(category.name.clone()),
          Span::styled(count, Style::default().fg(Color::DarkGray)),
        ]))
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::results;

  #[test]
  fn test_products_only_has_one_heading() {
    let state = SearchState::from_results("BCAA", 1, &results(&["P1", "P2"], &[]));
    let rows = result_rows(&state);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], ResultRow::Heading("Products"));
    assert_eq!(rows.iter().filter(|r| r.is_selectable()).count(), 2);
  }

  #[test]
  fn test_selection_skips_headings_and_wraps() {
    let state = SearchState::from_results("whey", 1, &results(&["P1"], &["C1"]));
    let rows = result_rows(&state);
    // Products, P1, Categories, C1
    assert_eq!(step_selection(&rows, None, 1), Some(1));
    assert_eq!(step_selection(&rows, Some(1), 1), Some(3));
    assert_eq!(step_selection(&rows, Some(3), 1), Some(1));
    assert_eq!(step_selection(&rows, Some(1), -1), Some(3));
    assert_eq!(step_selection(&[], None, 1), None);
  }
}
