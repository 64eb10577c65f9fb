//! Serde types matching the storefront API's response envelopes.
//!
//! Kept separate from the domain types so the wire shape can drift
//! (camelCase counters, `{success, data}` envelopes) without leaking into
//! the core.

use serde::{Deserialize, Serialize};

use super::types::{CartSummary, Category, Page, Product, ProductId, SearchResults};
use crate::error::{StoreError, StoreResult};

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSearchResponse {
  #[serde(default)]
  pub products: Vec<Product>,
  #[serde(default)]
  pub categories: Vec<Category>,
  #[serde(default)]
  pub total_products: u32,
  #[serde(default)]
  pub total_categories: u32,
  #[serde(default = "first_page")]
  pub page: u32,
  #[serde(default)]
  pub limit: u32,
  #[serde(default)]
  pub total_pages: u32,
}

fn first_page() -> u32 {
  1
}

impl From<ApiSearchResponse> for SearchResults {
  fn from(r: ApiSearchResponse) -> Self {
    SearchResults {
      products: r.products,
      categories: r.categories,
      total_products: r.total_products,
      total_categories: r.total_categories,
      page: r.page,
      limit: r.limit,
      total_pages: r.total_pages,
    }
  }
}

// ============================================================================
// Catalog listing
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiListingResponse {
  #[serde(default)]
  pub products: Vec<Product>,
  #[serde(default = "first_page")]
  pub page: u32,
  #[serde(default)]
  pub limit: u32,
  #[serde(default)]
  pub total_pages: u32,
}

impl From<ApiListingResponse> for Page<Product> {
  fn from(r: ApiListingResponse) -> Self {
    Page {
      items: r.products,
      page: r.page,
      limit: r.limit,
      total_pages: r.total_pages,
    }
  }
}

// ============================================================================
// Wishlist envelopes
// ============================================================================

/// `{success, data}` envelope used by the wishlist endpoints.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
  pub success: bool,
  #[serde(default)]
  pub message: Option<String>,
  pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
  /// Unwrap the envelope, treating `success: false` as a rejection.
  pub fn into_result(self) -> StoreResult<Option<T>> {
    if self.success {
      Ok(self.data)
    } else {
      Err(StoreError::Conflict(
        self
          .message
          .unwrap_or_else(|| "request was not accepted".to_string()),
      ))
    }
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiWishlistData {
  #[serde(default)]
  pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiWishlistItemRequest<'a> {
  pub product_id: &'a ProductId,
}

// ============================================================================
// Cart
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiCartSummary {
  #[serde(default)]
  pub count: u32,
  #[serde(default)]
  pub total: rust_decimal::Decimal,
}

impl From<ApiCartSummary> for CartSummary {
  fn from(r: ApiCartSummary) -> Self {
    CartSummary {
      count: r.count,
      total: r.total,
    }
  }
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiLoginRequest<'a> {
  pub email: &'a str,
  pub password: &'a str,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_search_response_defaults_missing_sections() {
    let json = r#"{"products":[{"id":"P1","name":"BCAA","price":"19.99"}],"totalProducts":1}"#;
    let resp: ApiSearchResponse = serde_json::from_str(json).unwrap();
    let results = SearchResults::from(resp);
    assert_eq!(results.products.len(), 1);
    assert!(results.categories.is_empty());
    assert_eq!(results.total_products, 1);
    assert_eq!(results.page, 1);
  }

  #[test]
  fn test_envelope_failure_is_conflict() {
    let env: ApiEnvelope<ApiWishlistData> =
      serde_json::from_str(r#"{"success":false,"message":"already in wishlist"}"#).unwrap();
    assert_eq!(
      env.into_result().unwrap_err(),
      StoreError::Conflict("already in wishlist".into())
    );
  }

  #[test]
  fn test_envelope_success_yields_data() {
    let env: ApiEnvelope<ApiWishlistData> =
      serde_json::from_str(r#"{"success":true,"data":{"products":[]}}"#).unwrap();
    let data = env.into_result().unwrap().unwrap();
    assert!(data.products.is_empty());
  }
}
