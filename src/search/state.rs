//! Per-surface search state and its debounce state machine.

use std::fmt;

use crate::api::types::{Category, Product, SearchResults};
use crate::error::StoreError;

/// Where search results are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
  /// Live dropdown under the hero search box
  Dropdown,
  /// Full search results page
  Page,
}

impl Surface {
  pub fn as_str(&self) -> &'static str {
    match self {
      Surface::Dropdown => "dropdown",
      Surface::Page => "page",
    }
  }
}

impl fmt::Display for Surface {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Debounce state machine for one surface.
///
/// `Idle -> Pending(timer) -> InFlight(request) -> Settled(request)`; a new
/// keystroke from any state goes back to `Pending`, an empty query to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfacePhase {
  Idle,
  Pending { timer: u64 },
  InFlight { request_id: u64 },
  Settled { request_id: u64 },
}

/// What the surface should show right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
  Idle,
  Searching,
  Results,
  NoResults,
  Error(String),
}

/// Snapshot of one surface, published to its subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
  pub query: String,
  pub products: Vec<Product>,
  pub categories: Vec<Category>,
  pub total_products: u32,
  pub total_categories: u32,
  pub page: u32,
  pub total_pages: u32,
  pub status: SearchStatus,
  /// Request whose response produced (or is producing) this state
  pub request_id: u64,
}

impl Default for SearchState {
  fn default() -> Self {
    Self {
      query: String::new(),
      products: Vec::new(),
      categories: Vec::new(),
      total_products: 0,
      total_categories: 0,
      page: 1,
      total_pages: 0,
      status: SearchStatus::Idle,
      request_id: 0,
    }
  }
}

impl SearchState {
  pub(crate) fn searching(previous: &SearchState, query: &str, page: u32, request_id: u64) -> Self {
    Self {
      query: query.to_string(),
      page,
      status: SearchStatus::Searching,
      request_id,
      ..previous.clone()
    }
  }

  pub(crate) fn from_results(query: &str, request_id: u64, results: &SearchResults) -> Self {
    Self {
      query: query.to_string(),
      products: results.products.clone(),
      categories: results.categories.clone(),
      total_products: results.total_products,
      total_categories: results.total_categories,
      page: results.page.max(1),
      total_pages: results.total_pages,
      status: if results.is_empty() {
        SearchStatus::NoResults
      } else {
        SearchStatus::Results
      },
      request_id,
    }
  }

  /// Failed searches show as an empty result with an inline message.
  pub(crate) fn failed(query: &str, page: u32, request_id: u64, error: &StoreError) -> Self {
    Self {
      query: query.to_string(),
      page,
      status: SearchStatus::Error(error.to_string()),
      request_id,
      ..Self::default()
    }
  }

  pub fn is_searching(&self) -> bool {
    self.status == SearchStatus::Searching
  }

  /// Inline message for states without rows.
  pub fn message(&self) -> Option<String> {
    match &self.status {
      SearchStatus::Idle => None,
      SearchStatus::Searching => Some("Searching...".to_string()),
      SearchStatus::Results => None,
      SearchStatus::NoResults => Some(format!("No results for \"{}\"", self.query)),
      SearchStatus::Error(e) => Some(format!("Search failed: {}", e)),
    }
  }

  /// Non-empty result sections in display order.
  pub fn sections(&self) -> Vec<ResultSection<'_>> {
    let mut sections = Vec::new();
    if !self.products.is_empty() {
      sections.push(ResultSection::Products(&self.products));
    }
    if !self.categories.is_empty() {
      sections.push(ResultSection::Categories(&self.categories));
    }
    sections
  }

  pub fn has_next_page(&self) -> bool {
    self.page < self.total_pages
  }

  pub fn has_prev_page(&self) -> bool {
    self.page > 1
  }
}

/// A titled block of rows in the dropdown or results page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResultSection<'a> {
  Products(&'a [Product]),
  Categories(&'a [Category]),
}

impl ResultSection<'_> {
  pub fn title(&self) -> &'static str {
    match self {
      ResultSection::Products(_) => "Products",
      ResultSection::Categories(_) => "Categories",
    }
  }

  pub fn len(&self) -> usize {
    match self {
      ResultSection::Products(p) => p.len(),
      ResultSection::Categories(c) => c.len(),
    }
  }
}
