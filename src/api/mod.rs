//! Remote storefront API: domain types, wire types and the HTTP client.

pub mod api_types;
pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::StoreResult;
use types::{
  CartSummary, Credentials, CustomerId, ListingParams, Page, Product, ProductId, SearchResults,
  SessionGrant,
};

/// Identity attached to customer-scoped calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
  pub customer_id: CustomerId,
  pub token: String,
}

/// Everything the core consumes from the remote storefront.
///
/// Object-safe so the core can hold an `Arc<dyn StorefrontApi>` and tests
/// can substitute a scripted fake.
#[async_trait]
pub trait StorefrontApi: Send + Sync {
  /// Product + category search. Non-2xx is a `Network` error carrying the status.
  async fn search(&self, query: &str, page: u32, page_size: u32) -> StoreResult<SearchResults>;

  /// Add to wishlist. Returns the server's post-mutation list when it sends one.
  async fn wishlist_add(
    &self,
    who: &Principal,
    product: &ProductId,
  ) -> StoreResult<Option<Vec<Product>>>;

  /// Remove from wishlist. Returns the server's post-mutation list when it sends one.
  async fn wishlist_remove(
    &self,
    who: &Principal,
    product: &ProductId,
  ) -> StoreResult<Option<Vec<Product>>>;

  async fn wishlist_list(&self, who: &Principal) -> StoreResult<Vec<Product>>;

  async fn cart_summary(&self, who: &Principal) -> StoreResult<CartSummary>;

  async fn login(&self, credentials: &Credentials) -> StoreResult<SessionGrant>;

  async fn product_listing(&self, params: &ListingParams) -> StoreResult<Page<Product>>;

  async fn product_detail(&self, id: &ProductId) -> StoreResult<Product>;
}
