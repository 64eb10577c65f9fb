//! The storefront handle every view receives.

use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use crate::api::types::{ListingParams, Page, Product, ProductId};
use crate::api::StorefrontApi;
use crate::auth::{AuthGate, AuthSession, SessionStore};
use crate::cart::CartSummaryReader;
use crate::query::{keys, CachePolicy, EntryWatch, QueryCache};
use crate::search::{SearchEngine, SearchSettings};
use crate::wishlist::WishlistCoordinator;

/// Core components wired together. Cloning shares the same state.
#[derive(Clone)]
pub struct Storefront {
  pub api: Arc<dyn StorefrontApi>,
  pub cache: QueryCache,
  pub auth: AuthGate,
  pub search: SearchEngine,
  pub wishlist: WishlistCoordinator,
  pub cart: CartSummaryReader,
}

impl Storefront {
  /// Build every component and restore the persisted session.
  pub fn init(
    api: Arc<dyn StorefrontApi>,
    sessions: Arc<dyn SessionStore>,
    policy: CachePolicy,
    search: SearchSettings,
  ) -> Self {
    let cache = QueryCache::new(policy);
    let auth = AuthGate::new(Arc::clone(&api), sessions);

    // Registered first so a new customer never sees the previous one's entries
    let previous = Mutex::new(None);
    auth.on_change({
      let cache = cache.clone();
      move |session: &AuthSession| {
        let mut previous = previous.lock().unwrap_or_else(PoisonError::into_inner);
        let current = session.customer_id().cloned();
        if *previous == current {
          return;
        }
        if let Some(old) = previous.take() {
          let removed = cache.remove(keys::of_customer(old.as_str()));
          debug!(customer = %old, removed, "dropped customer entries");
        }
        *previous = current;
      }
    });

    let wishlist = WishlistCoordinator::new(Arc::clone(&api), auth.clone(), cache.clone());
    let cart = CartSummaryReader::new(Arc::clone(&api), auth.clone(), cache.clone());
    let search = SearchEngine::new(Arc::clone(&api), cache.clone(), search);

    auth.restore();
    info!(signed_in = auth.is_authenticated(), "storefront ready");

    Self {
      api,
      cache,
      auth,
      search,
      wishlist,
      cart,
    }
  }

  /// Stop every search surface and drop all cached data.
  pub fn teardown(&self) {
    self.search.teardown_all();
    self.cache.clear();
    debug!("storefront torn down");
  }

  /// Observe one page of the catalog listing.
  pub fn listing(&self, params: &ListingParams) -> EntryWatch {
    let api = Arc::clone(&self.api);
    let request = params.clone();
    self.cache.observe(&keys::products::listing(params), move || {
      let api = Arc::clone(&api);
      let request = request.clone();
      async move { api.product_listing(&request).await }
    })
  }

  /// Observe one product's detail.
  pub fn detail(&self, id: &ProductId) -> EntryWatch {
    let api = Arc::clone(&self.api);
    let id = id.clone();
    self.cache.observe(&keys::products::detail(&id), move || {
      let api = Arc::clone(&api);
      let id = id.clone();
      async move { api.product_detail(&id).await }
    })
  }
}

/// Payload type of [`Storefront::listing`] entries.
pub type ListingPage = Page<Product>;

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Credentials;
  use crate::auth::{MemorySessionStore, PersistedSession};
  use crate::query::QueryStatus;
  use crate::search::Surface;
  use crate::testing::{customer, results, FakeApi};
  use std::time::Duration;

  fn storefront(sessions: MemorySessionStore) -> (Storefront, Arc<FakeApi>) {
    storefront_on(Arc::new(FakeApi::new()), sessions)
  }

  fn storefront_on(api: Arc<FakeApi>, sessions: MemorySessionStore) -> (Storefront, Arc<FakeApi>) {
    let store = Storefront::init(
      api.clone(),
      Arc::new(sessions),
      CachePolicy::default(),
      SearchSettings::default(),
    );
    (store, api)
  }

  async fn idle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
  }

  #[tokio::test(start_paused = true)]
  async fn test_init_restores_session_and_loads_wishlist() {
    let api = Arc::new(FakeApi::new());
    api.seed_wishlist("ada", &["P2"]);
    let (store, _) = storefront_on(
      api,
      MemorySessionStore::with(PersistedSession {
        token: Some("tok".into()),
        customer: Some(customer("ada")),
      }),
    );
    idle().await;

    assert!(store.auth.is_authenticated());
    assert!(store.wishlist.is_member(&ProductId::new("P2")));
  }

  #[tokio::test(start_paused = true)]
  async fn test_sign_out_drops_customer_entries() {
    let (store, api) = storefront(MemorySessionStore::new());
    let customer = store
      .auth
      .login(&Credentials {
        email: "ada@example.com".into(),
        password: "secret".into(),
      })
      .await
      .unwrap()
      .id;
    store.cart.get_summary(Some(&customer));
    idle().await;
    assert!(store.cache.peek(&keys::cart::summary(&customer)).is_some());

    store.auth.logout();
    assert!(store.cache.peek(&keys::cart::summary(&customer)).is_none());
    assert!(store.cache.peek(&keys::wishlist::list(&customer)).is_none());
    assert_eq!(api.calls("cart_summary"), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_catalog_reads_are_shared() {
    let (store, api) = storefront(MemorySessionStore::new());
    let params = ListingParams::default();
    let mut home = store.listing(&params);
    let grid = store.listing(&params);
    idle().await;

    assert_eq!(api.calls("product_listing"), 1);
    let page = home.mark_seen().data::<ListingPage>().unwrap();
    assert_eq!(page.items.len(), 3);
    assert_eq!(grid.current().status, QueryStatus::Success);
  }

  #[tokio::test(start_paused = true)]
  async fn test_teardown_clears_everything() {
    let (store, api) = storefront(MemorySessionStore::new());
    api.set_search("whey", results(&["P1"], &[]));
    store.search.search(Surface::Dropdown, "whey");
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!store.cache.is_empty());

    store.teardown();
    assert!(store.cache.is_empty());
    assert!(store.search.state(Surface::Dropdown).products.is_empty());
  }
}
