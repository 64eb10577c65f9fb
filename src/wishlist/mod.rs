//! Wishlist membership with optimistic toggles.

mod state;

pub use state::{ToggleTransaction, WishlistState};

use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::types::{Product, ProductId};
use crate::api::{Principal, StorefrontApi};
use crate::auth::{AuthGate, AuthSession};
use crate::error::{StoreError, StoreResult};
use crate::query::{keys, EntryWatch, QueryCache, QueryStatus, Subscription};

struct CoordinatorInner {
  api: Arc<dyn StorefrontApi>,
  auth: AuthGate,
  cache: QueryCache,
  state: watch::Sender<WishlistState>,
  /// One lock per product with a toggle running or queued
  locks: Mutex<HashMap<ProductId, Arc<tokio::sync::Mutex<()>>>>,
  /// Keeps the signed-in customer's list observed in the cache
  list: Mutex<Option<Subscription>>,
}

/// Owns wishlist membership; views read it and call `toggle`.
#[derive(Clone)]
pub struct WishlistCoordinator {
  inner: Arc<CoordinatorInner>,
}

impl WishlistCoordinator {
  /// Build the coordinator and follow `auth` from now on.
  pub fn new(api: Arc<dyn StorefrontApi>, auth: AuthGate, cache: QueryCache) -> Self {
    let (state, _) = watch::channel(WishlistState::default());
    let coordinator = Self {
      inner: Arc::new(CoordinatorInner {
        api,
        auth: auth.clone(),
        cache,
        state,
        locks: Mutex::new(HashMap::new()),
        list: Mutex::new(None),
      }),
    };

    let weak = Arc::downgrade(&coordinator.inner);
    auth.on_change(move |session: &AuthSession| {
      if let Some(coordinator) = upgrade(&weak) {
        coordinator.follow(session);
      }
    });
    coordinator.follow(&auth.session());
    coordinator
  }

  pub fn is_member(&self, product: &ProductId) -> bool {
    self.inner.state.borrow().contains(product)
  }

  pub fn is_pending(&self, product: &ProductId) -> bool {
    self.inner.state.borrow().is_pending(product)
  }

  pub fn state(&self) -> WishlistState {
    self.inner.state.borrow().clone()
  }

  pub fn subscribe(&self) -> watch::Receiver<WishlistState> {
    self.inner.state.subscribe()
  }

  pub fn dismiss_notice(&self) {
    self.inner.state.send_if_modified(|state| state.notice.take().is_some());
  }

  /// Flip membership of `product`, returning the membership now in effect.
  ///
  /// Guests get `Unauthenticated` and nothing changes. Toggles of the same
  /// product run one at a time, in call order; the local state flips before
  /// the request is sent and flips back if the server rejects it.
  pub async fn toggle(&self, product: &ProductId) -> StoreResult<bool> {
    if !self.inner.auth.is_authenticated() {
      debug!(product = %product, "wishlist toggle needs a session");
      return Err(StoreError::Unauthenticated);
    }

    let lock = self.product_lock(product);
    let result = {
      let _guard = lock.lock().await;
      self.toggle_locked(product).await
    };
    drop(lock);
    self.release_locks();
    result
  }

  async fn toggle_locked(&self, product: &ProductId) -> StoreResult<bool> {
    // The session may have ended while this toggle was queued
    let Some(principal) = self.inner.auth.principal() else {
      return Err(StoreError::Unauthenticated);
    };

    let mut txn = None;
    self.inner.state.send_modify(|state| {
      txn = Some(ToggleTransaction::apply(state, &principal.customer_id, product));
    });
    let Some(txn) = txn else {
      return Err(StoreError::Unauthenticated);
    };
    let target = txn.target();

    let response = if target {
      self.inner.api.wishlist_add(&principal, product).await
    } else {
      self.inner.api.wishlist_remove(&principal, product).await
    };

    match self.inner.auth.check(response) {
      Ok(list) => {
        debug!(product = %product, member = target, "wishlist toggle committed");
        self
          .inner
          .state
          .send_modify(|state| txn.commit(state, list.as_deref()));
        self.inner.cache.invalidate(keys::for_customer(
          keys::WISHLIST,
          principal.customer_id.as_str(),
        ));
        Ok(target)
      }
      Err(e) => {
        warn!(product = %product, error = %e, "wishlist toggle rolled back");
        let notice = match &e {
          StoreError::Unauthenticated => None,
          other => Some(format!("Could not update wishlist: {}", other)),
        };
        self
          .inner
          .state
          .send_modify(|state| txn.rollback(state, notice));
        Err(e)
      }
    }
  }

  /// Observe the signed-in customer's wishlist products. `None` for guests.
  pub fn products(&self) -> Option<EntryWatch> {
    let principal = self.inner.auth.principal()?;
    let key = keys::wishlist::list(&principal.customer_id);
    Some(self.inner.cache.observe(&key, self.list_loader(principal)))
  }

  /// Re-read the signed-in customer's list from the server.
  pub fn refresh(&self) {
    if let Some(customer) = self.inner.auth.session().customer_id() {
      self
        .inner
        .cache
        .invalidate(keys::for_customer(keys::WISHLIST, customer.as_str()));
    }
  }

  /// Point membership at the session's customer.
  fn follow(&self, session: &AuthSession) {
    let customer = session.customer_id().cloned();
    if self.inner.state.borrow().customer() == customer.as_ref() {
      return;
    }

    drop(self.list_slot().take());
    self
      .inner
      .state
      .send_replace(WishlistState::for_customer(customer));

    let Some(principal) = session.principal() else {
      return;
    };
    let key = keys::wishlist::list(&principal.customer_id);
    let weak = Arc::downgrade(&self.inner);
    let subscription = self.inner.cache.subscribe(&key, move |entry| {
      if entry.status != QueryStatus::Success {
        return;
      }
      let (Some(coordinator), Some(list)) = (upgrade(&weak), entry.data::<Vec<Product>>()) else {
        return;
      };
      coordinator.reconcile(&list);
    });
    *self.list_slot() = Some(subscription);

    info!(customer = %principal.customer_id, "loading wishlist");
    // Wishlist entries are always stale, so this reloads even a cached list
    self.inner.cache.prefetch(&key, self.list_loader(principal));
  }

  fn list_loader(
    &self,
    principal: Principal,
  ) -> impl Fn() -> BoxFuture<'static, StoreResult<Vec<Product>>> + Send + Sync + 'static {
    let api = Arc::clone(&self.inner.api);
    let auth = self.inner.auth.clone();
    move || {
      let api = Arc::clone(&api);
      let auth = auth.clone();
      let principal = principal.clone();
      async move { auth.check(api.wishlist_list(&principal).await) }.boxed()
    }
  }

  fn reconcile(&self, list: &[Product]) {
    self.inner.state.send_modify(|state| state.reconcile(list));
  }

  fn product_lock(&self, product: &ProductId) -> Arc<tokio::sync::Mutex<()>> {
    Arc::clone(self.locks().entry(product.clone()).or_default())
  }

  /// Forget locks nobody is holding or waiting on.
  fn release_locks(&self) {
    self.locks().retain(|_, lock| Arc::strong_count(lock) > 1);
  }

  fn locks(&self) -> MutexGuard<'_, HashMap<ProductId, Arc<tokio::sync::Mutex<()>>>> {
    self
      .inner
      .locks
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  fn list_slot(&self) -> MutexGuard<'_, Option<Subscription>> {
    self.inner.list.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

fn upgrade(inner: &Weak<CoordinatorInner>) -> Option<WishlistCoordinator> {
  inner.upgrade().map(|inner| WishlistCoordinator { inner })
}
