//! Scripted `StorefrontApi` used by unit tests across the crate.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::api::types::{
  CartSummary, Category, Credentials, CustomerId, CustomerProfile, ListingParams, Page, Product,
  ProductId, SearchResults, SessionGrant,
};
use crate::api::{Principal, StorefrontApi};
use crate::error::{StoreError, StoreResult};

pub fn product(id: &str) -> Product {
  Product {
    id: ProductId::new(id),
    name: format!("Product {}", id),
    slug: None,
    price: Decimal::new(1999, 2),
    image_url: None,
    category: None,
    description: None,
    in_stock: true,
  }
}

pub fn category(id: &str) -> Category {
  Category {
    id: id.to_string(),
    name: format!("Category {}", id),
    slug: None,
    product_count: None,
  }
}

pub fn customer(id: &str) -> CustomerProfile {
  CustomerProfile {
    id: CustomerId::new(id),
    name: format!("Customer {}", id),
    email: format!("{}@example.com", id),
  }
}

pub fn results(products: &[&str], categories: &[&str]) -> SearchResults {
  SearchResults {
    products: products.iter().map(|id| product(id)).collect(),
    categories: categories.iter().map(|id| category(id)).collect(),
    total_products: products.len() as u32,
    total_categories: categories.len() as u32,
    page: 1,
    limit: 20,
    total_pages: 1,
  }
}

#[derive(Default)]
struct FakeState {
  calls: HashMap<&'static str, u32>,
  search_results: HashMap<String, SearchResults>,
  search_gates: HashMap<String, Arc<Notify>>,
  search_error: Option<StoreError>,
  search_log: Vec<(String, u32)>,
  wishlist: HashMap<CustomerId, Vec<ProductId>>,
  wishlist_gate: Option<Arc<Notify>>,
  wishlist_failures: VecDeque<StoreError>,
  wishlist_in_flight: HashMap<ProductId, u32>,
  wishlist_max_in_flight: u32,
  wishlist_log: Vec<(&'static str, ProductId)>,
  login_error: Option<StoreError>,
  cart: CartSummary,
  cart_error: Option<StoreError>,
}

/// In-memory storefront with call counters and hold points.
#[derive(Default)]
pub struct FakeApi {
  state: Mutex<FakeState>,
}

impl FakeApi {
  pub fn new() -> Self {
    Self::default()
  }

  fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
    f(&mut self.state.lock().unwrap())
  }

  fn record(&self, name: &'static str) {
    self.with_state(|s| *s.calls.entry(name).or_default() += 1);
  }

  pub fn calls(&self, name: &str) -> u32 {
    self.with_state(|s| s.calls.get(name).copied().unwrap_or(0))
  }

  pub fn set_search(&self, query: &str, results: SearchResults) {
    self.with_state(|s| s.search_results.insert(query.to_string(), results));
  }

  /// Hold every search for `query` until the returned notify fires.
  pub fn hold_search(&self, query: &str) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    self.with_state(|s| s.search_gates.insert(query.to_string(), gate.clone()));
    gate
  }

  pub fn fail_search(&self, error: StoreError) {
    self.with_state(|s| s.search_error = Some(error));
  }

  /// Queries searched, in call order.
  pub fn searched(&self) -> Vec<String> {
    self.with_state(|s| s.search_log.iter().map(|(q, _)| q.clone()).collect())
  }

  pub fn searched_pages(&self) -> Vec<u32> {
    self.with_state(|s| s.search_log.iter().map(|(_, p)| *p).collect())
  }

  pub fn seed_wishlist(&self, customer: &str, products: &[&str]) {
    self.with_state(|s| {
      s.wishlist.insert(
        CustomerId::new(customer),
        products.iter().map(|p| ProductId::new(*p)).collect(),
      )
    });
  }

  /// Hold wishlist mutations; each `notify_one` releases one of them.
  pub fn hold_wishlist(&self) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    self.with_state(|s| s.wishlist_gate = Some(gate.clone()));
    gate
  }

  pub fn fail_next_wishlist(&self, error: StoreError) {
    self.with_state(|s| s.wishlist_failures.push_back(error));
  }

  pub fn wishlist_of(&self, customer: &str) -> Vec<ProductId> {
    self.with_state(|s| {
      s.wishlist
        .get(&CustomerId::new(customer))
        .cloned()
        .unwrap_or_default()
    })
  }

  /// Most add/remove calls ever in flight at once for a single product.
  pub fn max_concurrent_wishlist_calls(&self) -> u32 {
    self.with_state(|s| s.wishlist_max_in_flight)
  }

  pub fn wishlist_log(&self) -> Vec<(&'static str, ProductId)> {
    self.with_state(|s| s.wishlist_log.clone())
  }

  pub fn fail_login(&self, error: StoreError) {
    self.with_state(|s| s.login_error = Some(error));
  }

  pub fn set_cart(&self, count: u32, total: Decimal) {
    self.with_state(|s| s.cart = CartSummary { count, total });
  }

  pub fn fail_cart(&self, error: StoreError) {
    self.with_state(|s| s.cart_error = Some(error));
  }

  async fn mutate_wishlist(
    &self,
    op: &'static str,
    who: &Principal,
    product: &ProductId,
  ) -> StoreResult<Option<Vec<Product>>> {
    self.record(op);
    let gate = self.with_state(|s| {
      s.wishlist_log.push((op, product.clone()));
      let n = s.wishlist_in_flight.entry(product.clone()).or_default();
      *n += 1;
      s.wishlist_max_in_flight = s.wishlist_max_in_flight.max(*n);
      s.wishlist_gate.clone()
    });

    if let Some(gate) = gate {
      gate.notified().await;
    }

    self.with_state(|s| {
      if let Some(n) = s.wishlist_in_flight.get_mut(product) {
        *n -= 1;
      }
      if let Some(err) = s.wishlist_failures.pop_front() {
        return Err(err);
      }
      let list = s.wishlist.entry(who.customer_id.clone()).or_default();
      if op == "wishlist_add" {
        if !list.contains(product) {
          list.push(product.clone());
        }
      } else {
        list.retain(|p| p != product);
      }
      Ok(Some(list.iter().map(|id| self::product(id.as_str())).collect()))
    })
  }
}

#[async_trait]
impl StorefrontApi for FakeApi {
  async fn search(&self, query: &str, page: u32, _page_size: u32) -> StoreResult<SearchResults> {
    self.record("search");
    let gate = self.with_state(|s| {
      s.search_log.push((query.to_string(), page));
      s.search_gates.get(query).cloned()
    });
    if let Some(gate) = gate {
      gate.notified().await;
    }
    self.with_state(|s| {
      if let Some(err) = &s.search_error {
        return Err(err.clone());
      }
      let found = s.search_results.get(query).cloned().unwrap_or_default();
      Ok(SearchResults { page, ..found })
    })
  }

  async fn wishlist_add(
    &self,
    who: &Principal,
    product: &ProductId,
  ) -> StoreResult<Option<Vec<Product>>> {
    self.mutate_wishlist("wishlist_add", who, product).await
  }

  async fn wishlist_remove(
    &self,
    who: &Principal,
    product: &ProductId,
  ) -> StoreResult<Option<Vec<Product>>> {
    self.mutate_wishlist("wishlist_remove", who, product).await
  }

  async fn wishlist_list(&self, who: &Principal) -> StoreResult<Vec<Product>> {
    self.record("wishlist_list");
    Ok(
      self
        .wishlist_of(who.customer_id.as_str())
        .iter()
        .map(|id| product(id.as_str()))
        .collect(),
    )
  }

  async fn cart_summary(&self, _who: &Principal) -> StoreResult<CartSummary> {
    self.record("cart_summary");
    self.with_state(|s| match &s.cart_error {
      Some(err) => Err(err.clone()),
      None => Ok(s.cart),
    })
  }

  async fn login(&self, credentials: &Credentials) -> StoreResult<SessionGrant> {
    self.record("login");
    if let Some(err) = self.with_state(|s| s.login_error.clone()) {
      return Err(err);
    }
    let id = credentials
      .email
      .split('@')
      .next()
      .unwrap_or("customer")
      .to_string();
    Ok(SessionGrant {
      token: format!("token-{}", id),
      customer: CustomerProfile {
        email: credentials.email.clone(),
        ..customer(&id)
      },
    })
  }

  async fn product_listing(&self, params: &ListingParams) -> StoreResult<Page<Product>> {
    self.record("product_listing");
    Ok(Page {
      items: vec![product("P1"), product("P2"), product("P3")],
      page: params.page,
      limit: params.limit,
      total_pages: 1,
    })
  }

  async fn product_detail(&self, id: &ProductId) -> StoreResult<Product> {
    self.record("product_detail");
    Ok(product(id.as_str()))
  }
}
