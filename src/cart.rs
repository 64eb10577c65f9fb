//! Read-only cart summary for the header and anywhere else that shows it.

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

use crate::api::types::{CartSummary, CustomerId};
use crate::api::StorefrontApi;
use crate::auth::AuthGate;
use crate::error::StoreResult;
use crate::query::{keys, CacheEntry, EntryWatch, QueryCache, QueryKey};

#[derive(Clone)]
pub struct CartSummaryReader {
  api: Arc<dyn StorefrontApi>,
  auth: AuthGate,
  cache: QueryCache,
}

impl CartSummaryReader {
  pub fn new(api: Arc<dyn StorefrontApi>, auth: AuthGate, cache: QueryCache) -> Self {
    Self { api, auth, cache }
  }

  /// Summary entry for `customer`, loading it in the background if stale.
  ///
  /// Without a customer the reader is disabled: the returned entry stays
  /// idle and no request is made. The same applies to a customer that is
  /// not the one signed in, since only their token can read the cart.
  pub fn get_summary(&self, customer: Option<&CustomerId>) -> CacheEntry {
    let Some(customer) = customer else {
      return self.disabled();
    };
    let key = keys::cart::summary(customer);
    if let Some(loader) = self.loader_for(customer) {
      self.cache.prefetch(&key, loader);
    }
    self.cache.get(&key)
  }

  /// Watch the summary of the signed-in customer. `None` for guests.
  pub fn watch(&self) -> Option<EntryWatch> {
    let customer = self.auth.session().customer_id()?.clone();
    let loader = self.loader_for(&customer)?;
    Some(self.cache.observe(&keys::cart::summary(&customer), loader))
  }

  fn loader_for(
    &self,
    customer: &CustomerId,
  ) -> Option<impl Fn() -> BoxFuture<'static, StoreResult<CartSummary>> + Send + Sync + 'static> {
    let principal = self
      .auth
      .principal()
      .filter(|p| &p.customer_id == customer)?;
    let api = Arc::clone(&self.api);
    let auth = self.auth.clone();
    Some(move || {
      let api = Arc::clone(&api);
      let auth = auth.clone();
      let principal = principal.clone();
      async move { auth.check(api.cart_summary(&principal).await) }.boxed()
    })
  }

  fn disabled(&self) -> CacheEntry {
    let key = QueryKey::new(keys::CART, "summary");
    let stale_after = self.cache.policy().stale_for(&key);
    CacheEntry::idle(key, stale_after)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Credentials;
  use crate::auth::MemorySessionStore;
  use crate::query::{CachePolicy, QueryStatus};
  use crate::testing::FakeApi;
  use rust_decimal::Decimal;
  use std::time::Duration;

  fn reader() -> (CartSummaryReader, Arc<FakeApi>, AuthGate) {
    let api = Arc::new(FakeApi::new());
    let auth = AuthGate::new(api.clone(), Arc::new(MemorySessionStore::new()));
    let reader = CartSummaryReader::new(
      api.clone(),
      auth.clone(),
      QueryCache::new(CachePolicy::default()),
    );
    (reader, api, auth)
  }

  async fn sign_in(auth: &AuthGate) -> CustomerId {
    auth
      .login(&Credentials {
        email: "ada@example.com".into(),
        password: "secret".into(),
      })
      .await
      .unwrap()
      .id
  }

  #[tokio::test(start_paused = true)]
  async fn test_guest_never_requests_cart() {
    let (reader, api, _) = reader();
    let entry = reader.get_summary(None);
    assert_eq!(entry.status, QueryStatus::Idle);
    assert!(reader.watch().is_none());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(api.calls("cart_summary"), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_summary_is_cached_for_a_minute() {
    let (reader, api, auth) = reader();
    api.set_cart(3, Decimal::new(5997, 2));
    let customer = sign_in(&auth).await;

    assert_eq!(reader.get_summary(Some(&customer)).status, QueryStatus::Loading);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let entry = reader.get_summary(Some(&customer));
    let summary = entry.data::<CartSummary>().unwrap();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.total, Decimal::new(5997, 2));

    tokio::time::sleep(Duration::from_secs(30)).await;
    reader.get_summary(Some(&customer));
    assert_eq!(api.calls("cart_summary"), 1);

    tokio::time::sleep(Duration::from_secs(31)).await;
    reader.get_summary(Some(&customer));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(api.calls("cart_summary"), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_other_customer_is_not_fetched() {
    let (reader, api, auth) = reader();
    sign_in(&auth).await;
    let entry = reader.get_summary(Some(&CustomerId::new("mallory")));
    assert_eq!(entry.status, QueryStatus::Idle);
    assert_eq!(api.calls("cart_summary"), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_watch_reports_loaded_summary() {
    let (reader, api, auth) = reader();
    api.set_cart(1, Decimal::new(1999, 2));
    sign_in(&auth).await;

    let mut watch = reader.watch().unwrap();
    let entry = loop {
      assert!(watch.changed().await);
      let entry = watch.mark_seen();
      if entry.status == QueryStatus::Success {
        break entry;
      }
    };
    assert_eq!(entry.data::<CartSummary>().unwrap().count, 1);
  }
}
