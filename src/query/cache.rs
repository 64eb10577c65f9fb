//! Process-wide keyed cache of in-flight and completed reads.
//!
//! Inspired by TanStack Query: one entry per [`QueryKey`], at most one load
//! in flight per key, listeners notified on every transition, stale data
//! kept visible when a refetch fails.
//!
//! # Example
//!
//! ```ignore
//! let key = keys::products::detail(&id);
//! let product = cache
//!   .ensure(key.clone(), move || {
//!     let api = api.clone();
//!     let id = id.clone();
//!     async move { api.product_detail(&id).await }
//!   })
//!   .await?;
//!
//! // After a mutation
//! cache.invalidate(keys::in_namespace(keys::WISHLIST));
//! ```

use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::entry::{CacheEntry, QueryData};
use super::key::QueryKey;
use super::policy::CachePolicy;
use crate::error::{StoreError, StoreResult};

type LoadFuture = BoxFuture<'static, StoreResult<QueryData>>;
type Loader = Arc<dyn Fn() -> LoadFuture + Send + Sync>;
type SharedLoad = Shared<LoadFuture>;

/// Called with a fresh snapshot on every entry transition.
pub type Listener = Arc<dyn Fn(&CacheEntry) + Send + Sync>;

struct Slot {
  entry: CacheEntry,
  /// The load currently in flight, shared by every concurrent caller
  in_flight: Option<(u64, SharedLoad)>,
  /// Last loader used for this key, kept for invalidation refetches
  loader: Option<Loader>,
  listeners: Vec<(u64, Listener)>,
  /// Invalidated while a load was in flight; reload once it settles
  refetch_on_settle: bool,
  /// Identifies the armed collection timer, if any
  gc_token: Option<u64>,
}

impl Slot {
  fn new(entry: CacheEntry) -> Self {
    Self {
      entry,
      in_flight: None,
      loader: None,
      listeners: Vec::new(),
      refetch_on_settle: false,
      gc_token: None,
    }
  }

  fn listeners(&self) -> Vec<Listener> {
    self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
  }
}

#[derive(Default)]
struct Inner {
  slots: HashMap<QueryKey, Slot>,
  next_id: u64,
}

impl Inner {
  fn next_id(&mut self) -> u64 {
    self.next_id += 1;
    self.next_id
  }

  fn slot_mut(&mut self, key: &QueryKey, policy: &CachePolicy) -> &mut Slot {
    self
      .slots
      .entry(key.clone())
      .or_insert_with(|| Slot::new(CacheEntry::idle(key.clone(), policy.stale_for(key))))
  }
}

/// Shared keyed cache. Cheap to clone; all clones see the same entries.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Mutex<Inner>>,
  policy: Arc<CachePolicy>,
}

impl QueryCache {
  pub fn new(policy: CachePolicy) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner::default())),
      policy: Arc::new(policy),
    }
  }

  pub fn policy(&self) -> &CachePolicy {
    &self.policy
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    // Entries are plain data; a panicking listener must not wedge the cache
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Snapshot of the entry for `key`, creating an idle one if absent.
  pub fn get(&self, key: &QueryKey) -> CacheEntry {
    let mut inner = self.lock();
    inner.slot_mut(key, &self.policy).entry.clone()
  }

  /// Snapshot of the entry for `key` without creating it.
  #[cfg(test)]
  pub fn peek(&self, key: &QueryKey) -> Option<CacheEntry> {
    self.lock().slots.get(key).map(|slot| slot.entry.clone())
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.lock().slots.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.lock().slots.is_empty()
  }

  /// Load `key` through `loader`, joining the in-flight load if there is one.
  ///
  /// A failed load is retried per the policy before the error reaches the
  /// entry. The load runs on its own task, so dropping the returned future
  /// does not leave the entry stuck in `Loading`.
  pub async fn fetch<T, F, Fut>(&self, key: QueryKey, loader: F) -> StoreResult<Arc<T>>
  where
    T: Any + Send + Sync,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StoreResult<T>> + Send + 'static,
  {
    let shared = self.start(key.clone(), erase(loader));
    downcast(&key, shared.await?)
  }

  /// Cache-first read: fresh data is returned without calling `loader`.
  pub async fn ensure<T, F, Fut>(&self, key: QueryKey, loader: F) -> StoreResult<Arc<T>>
  where
    T: Any + Send + Sync,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StoreResult<T>> + Send + 'static,
  {
    let fresh = {
      let inner = self.lock();
      inner
        .slots
        .get(&key)
        .and_then(|slot| slot.entry.fresh_data(Instant::now()).cloned())
    };

    match fresh {
      Some(data) => {
        debug!(key = %key, "cache hit");
        downcast(&key, data)
      }
      None => self.fetch(key, loader).await,
    }
  }

  /// Start a background load unless the entry is fresh or already loading.
  ///
  /// The entry is `Loading` by the time this returns.
  pub fn prefetch<T, F, Fut>(&self, key: &QueryKey, loader: F)
  where
    T: Any + Send + Sync,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StoreResult<T>> + Send + 'static,
  {
    let entry = self.get(key);
    if entry.is_loading() || !entry.is_stale() {
      return;
    }
    drop(self.start(key.clone(), erase(loader)));
  }

  /// Watch `key` and load it in the background if needed.
  pub fn observe<T, F, Fut>(&self, key: &QueryKey, loader: F) -> EntryWatch
  where
    T: Any + Send + Sync,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StoreResult<T>> + Send + 'static,
  {
    let watch = self.watch(key);
    self.prefetch(key, loader);
    watch
  }

  /// Mark matching entries stale and refetch the observed ones.
  ///
  /// Returns how many entries matched.
  pub fn invalidate<P>(&self, predicate: P) -> usize
  where
    P: Fn(&QueryKey) -> bool,
  {
    let mut refetch = Vec::new();
    let mut matched = 0;
    {
      let mut inner = self.lock();
      for (key, slot) in inner.slots.iter_mut() {
        if !predicate(key) {
          continue;
        }
        matched += 1;
        slot.entry.invalidated = true;
        if slot.listeners.is_empty() {
          continue;
        }
        if slot.in_flight.is_some() {
          // The running load may predate the mutation
          slot.refetch_on_settle = true;
        } else if let Some(loader) = &slot.loader {
          refetch.push((key.clone(), Arc::clone(loader)));
        }
      }
    }

    for (key, loader) in refetch {
      debug!(key = %key, "refetching invalidated entry");
      drop(self.start(key, loader));
    }
    matched
  }

  /// Drop matching entries outright. In-flight loads for them are ignored when they settle.
  pub fn remove<P>(&self, predicate: P) -> usize
  where
    P: Fn(&QueryKey) -> bool,
  {
    let mut inner = self.lock();
    let before = inner.slots.len();
    inner.slots.retain(|key, _| !predicate(key));
    before - inner.slots.len()
  }

  pub fn clear(&self) {
    self.lock().slots.clear();
  }

  /// Register `listener` for transitions of `key`.
  ///
  /// The returned handle unsubscribes when dropped. Once the last listener
  /// of a key is gone, the entry is collected after the policy's GC delay.
  pub fn subscribe<F>(&self, key: &QueryKey, listener: F) -> Subscription
  where
    F: Fn(&CacheEntry) + Send + Sync + 'static,
  {
    let mut inner = self.lock();
    let id = inner.next_id();
    let slot = inner.slot_mut(key, &self.policy);
    slot.listeners.push((id, Arc::new(listener)));
    slot.gc_token = None;

    Subscription {
      cache: Arc::downgrade(&self.inner),
      policy: Arc::clone(&self.policy),
      key: key.clone(),
      id,
    }
  }

  /// Subscribe through a watch channel, for views that poll on tick.
  pub fn watch(&self, key: &QueryKey) -> EntryWatch {
    let (tx, rx) = watch::channel(self.get(key));
    let subscription = self.subscribe(key, move |entry| {
      tx.send_replace(entry.clone());
    });
    EntryWatch {
      rx,
      _subscription: subscription,
    }
  }

  /// Start (or join) a load for `key`.
  fn start(&self, key: QueryKey, loader: Loader) -> SharedLoad {
    let (shared, snapshot, listeners) = {
      let mut inner = self.lock();
      let fetch_id = inner.next_id();
      let slot = inner.slot_mut(&key, &self.policy);
      slot.loader = Some(Arc::clone(&loader));

      if let Some((_, in_flight)) = &slot.in_flight {
        debug!(key = %key, "joining in-flight load");
        return in_flight.clone();
      }

      let shared = self
        .clone()
        .run(key.clone(), loader, fetch_id)
        .boxed()
        .shared();
      slot.in_flight = Some((fetch_id, shared.clone()));
      slot.entry.set_loading();
      (shared, slot.entry.clone(), slot.listeners())
    };

    notify(&listeners, &snapshot);
    tokio::spawn(shared.clone());
    shared
  }

  async fn run(self, key: QueryKey, loader: Loader, fetch_id: u64) -> StoreResult<QueryData> {
    let mut attempt = 0;
    let result = loop {
      match loader().await {
        Ok(data) => break Ok(data),
        Err(e) if is_retryable(&e) && attempt < self.policy.retries() => {
          attempt += 1;
          debug!(key = %key, error = %e, attempt, "retrying failed load");
        }
        Err(e) => break Err(e),
      }
    };

    if let Err(e) = &result {
      warn!(key = %key, error = %e, "load failed");
    }
    self.settle(&key, fetch_id, &result);
    result
  }

  /// Apply a finished load to its entry, if the entry still expects it.
  fn settle(&self, key: &QueryKey, fetch_id: u64, result: &StoreResult<QueryData>) {
    let (snapshot, listeners, reload) = {
      let mut inner = self.lock();
      let Some(slot) = inner.slots.get_mut(key) else {
        return;
      };
      if slot.in_flight.as_ref().map(|(id, _)| *id) != Some(fetch_id) {
        return;
      }
      slot.in_flight = None;

      match result {
        Ok(data) => slot.entry.set_success(Arc::clone(data), Instant::now()),
        Err(e) => slot.entry.set_error(e.clone()),
      }

      let reload = if std::mem::take(&mut slot.refetch_on_settle) {
        slot.entry.invalidated = true;
        slot.loader.clone()
      } else {
        None
      };
      (slot.entry.clone(), slot.listeners(), reload)
    };

    notify(&listeners, &snapshot);
    if let Some(loader) = reload {
      drop(self.start(key.clone(), loader));
    }
  }
}

fn notify(listeners: &[Listener], entry: &CacheEntry) {
  for listener in listeners {
    listener(entry);
  }
}

/// Only transport failures are worth an automatic second attempt.
fn is_retryable(error: &StoreError) -> bool {
  matches!(error, StoreError::Network { .. })
}

fn erase<T, F, Fut>(loader: F) -> Loader
where
  T: Any + Send + Sync,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = StoreResult<T>> + Send + 'static,
{
  Arc::new(move || {
    let fut = loader();
    async move { fut.await.map(|value| Arc::new(value) as QueryData) }.boxed()
  })
}

fn downcast<T: Any + Send + Sync>(key: &QueryKey, data: QueryData) -> StoreResult<Arc<T>> {
  data.downcast::<T>().map_err(|_| {
    StoreError::Decode(format!(
      "cache entry {} holds a different type than {}",
      key,
      std::any::type_name::<T>()
    ))
  })
}

/// Listener registration; unsubscribes on drop.
pub struct Subscription {
  cache: Weak<Mutex<Inner>>,
  policy: Arc<CachePolicy>,
  key: QueryKey,
  id: u64,
}

impl Drop for Subscription {
  fn drop(&mut self) {
    let Some(inner) = self.cache.upgrade() else {
      return;
    };
    let token = {
      let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
      let token = guard.next_id();
      let Some(slot) = guard.slots.get_mut(&self.key) else {
        return;
      };
      slot.listeners.retain(|(id, _)| *id != self.id);
      if !slot.listeners.is_empty() {
        return;
      }
      slot.gc_token = Some(token);
      token
    };

    // Collection needs a runtime; without one the entry simply lives on
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
      return;
    };
    let weak = Arc::downgrade(&inner);
    let key = self.key.clone();
    let delay = self.policy.gc_delay();
    handle.spawn(async move {
      tokio::time::sleep(delay).await;
      let Some(inner) = weak.upgrade() else {
        return;
      };
      let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
      let collectable = guard.slots.get(&key).is_some_and(|slot| {
        slot.gc_token == Some(token) && slot.listeners.is_empty() && slot.in_flight.is_none()
      });
      if collectable {
        debug!(key = %key, "collecting unobserved entry");
        guard.slots.remove(&key);
      }
    });
  }
}

/// A subscription whose snapshots land in a watch channel.
pub struct EntryWatch {
  rx: watch::Receiver<CacheEntry>,
  _subscription: Subscription,
}

impl EntryWatch {
  /// Latest snapshot.
  pub fn current(&self) -> CacheEntry {
    self.rx.borrow().clone()
  }

  /// Whether a transition arrived since the last `mark_seen`.
  pub fn has_changed(&self) -> bool {
    self.rx.has_changed().unwrap_or(false)
  }

  pub fn mark_seen(&mut self) -> CacheEntry {
    self.rx.borrow_and_update().clone()
  }

  pub async fn changed(&mut self) -> bool {
    self.rx.changed().await.is_ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::entry::QueryStatus;
  use crate::query::key::keys;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;
  use tokio::sync::Notify;

  fn key(id: &str) -> QueryKey {
    QueryKey::new("products", "detail").param("id", id)
  }

  fn counting_loader(
    calls: Arc<AtomicU32>,
  ) -> impl Fn() -> BoxFuture<'static, StoreResult<u32>> + Send + Sync + 'static {
    move || {
      let calls = calls.clone();
      async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) }.boxed()
    }
  }

  #[tokio::test]
  async fn test_get_creates_idle_entry() {
    let cache = QueryCache::new(CachePolicy::default());
    let entry = cache.get(&key("P1"));
    assert_eq!(entry.status, QueryStatus::Idle);
    assert!(!entry.has_data());
    assert_eq!(cache.len(), 1);
  }

  #[tokio::test]
  async fn test_fetch_stores_success() {
    let cache = QueryCache::new(CachePolicy::default());
    let calls = Arc::new(AtomicU32::new(0));

    let value = cache.fetch(key("P1"), counting_loader(calls.clone())).await.unwrap();
    assert_eq!(*value, 1);

    let entry = cache.get(&key("P1"));
    assert_eq!(entry.status, QueryStatus::Success);
    assert_eq!(entry.data::<u32>().as_deref(), Some(&1));
    assert!(entry.fetched_at.is_some());
  }

  #[tokio::test]
  async fn test_concurrent_fetches_share_one_load() {
    let cache = QueryCache::new(CachePolicy::default());
    let calls = Arc::new(AtomicU32::new(0));
    let gate = Arc::new(Notify::new());

    let loader = {
      let calls = calls.clone();
      let gate = gate.clone();
      move || {
        let calls = calls.clone();
        let gate = gate.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          gate.notified().await;
          Ok::<_, StoreError>("done".to_string())
        }
      }
    };

    let first = tokio::spawn({
      let cache = cache.clone();
      let loader = loader.clone();
      async move { cache.fetch(key("P1"), loader).await }
    });
    let second = tokio::spawn({
      let cache = cache.clone();
      let loader = loader.clone();
      async move { cache.fetch(key("P1"), loader).await }
    });

    // Let both callers reach the cache
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    assert!(cache.get(&key("P1")).is_loading());

    gate.notify_one();
    let a = first.await.unwrap().unwrap();
    let b = second.await.unwrap().unwrap();
    assert_eq!(*a, "done");
    assert_eq!(*b, "done");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_ensure_serves_fresh_data_without_loading() {
    let cache = QueryCache::new(CachePolicy::default());
    let calls = Arc::new(AtomicU32::new(0));

    cache.ensure(key("P1"), counting_loader(calls.clone())).await.unwrap();
    let again = cache.ensure(key("P1"), counting_loader(calls.clone())).await.unwrap();

    assert_eq!(*again, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_ensure_reloads_after_stale_window() {
    let cache = QueryCache::new(CachePolicy::default().with_default_stale(Duration::from_secs(60)));
    let calls = Arc::new(AtomicU32::new(0));

    cache.ensure(key("P1"), counting_loader(calls.clone())).await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    let value = cache.ensure(key("P1"), counting_loader(calls.clone())).await.unwrap();

    assert_eq!(*value, 2);
  }

  #[tokio::test]
  async fn test_failure_is_retried_once() {
    let cache = QueryCache::new(CachePolicy::default());
    let calls = Arc::new(AtomicU32::new(0));
    let loader = {
      let calls = calls.clone();
      move || {
        let calls = calls.clone();
        async move {
          if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(StoreError::network("blip"))
          } else {
            Ok(5u32)
          }
        }
      }
    };

    let value = cache.fetch(key("P1"), loader).await.unwrap();
    assert_eq!(*value, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_second_failure_keeps_stale_data() {
    let cache = QueryCache::new(CachePolicy::default());
    let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let calls = Arc::new(AtomicU32::new(0));
    let loader = {
      let fail = fail.clone();
      let calls = calls.clone();
      move || {
        let fail = fail.clone();
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          if fail.load(Ordering::SeqCst) {
            Err(StoreError::http(500, "Internal Server Error"))
          } else {
            Ok("v1".to_string())
          }
        }
      }
    };

    cache.fetch(key("P1"), loader.clone()).await.unwrap();
    fail.store(true, Ordering::SeqCst);
    let err = cache.fetch(key("P1"), loader).await.unwrap_err();

    assert_eq!(err, StoreError::http(500, "Internal Server Error"));
    // one success, then the failure and its retry
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let entry = cache.get(&key("P1"));
    assert_eq!(entry.status, QueryStatus::Error);
    assert_eq!(entry.data::<String>().as_deref().map(String::as_str), Some("v1"));
  }

  #[tokio::test]
  async fn test_unauthenticated_is_not_retried() {
    let cache = QueryCache::new(CachePolicy::default());
    let calls = Arc::new(AtomicU32::new(0));
    let loader = {
      let calls = calls.clone();
      move || {
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          Err::<u32, _>(StoreError::Unauthenticated)
        }
      }
    };

    let err = cache.fetch(key("P1"), loader).await.unwrap_err();
    assert!(err.is_unauthenticated());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_listeners_see_every_transition() {
    let cache = QueryCache::new(CachePolicy::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let _sub = cache.subscribe(&key("P1"), {
      let seen = seen.clone();
      move |entry: &CacheEntry| seen.lock().unwrap().push(entry.status)
    });

    cache.fetch(key("P1"), || async { Ok(1u8) }).await.unwrap();

    assert_eq!(
      *seen.lock().unwrap(),
      vec![QueryStatus::Loading, QueryStatus::Success]
    );
  }

  #[tokio::test]
  async fn test_invalidate_refetches_observed_entries_only() {
    let cache = QueryCache::new(CachePolicy::default());
    let calls = Arc::new(AtomicU32::new(0));

    cache.fetch(key("P1"), counting_loader(calls.clone())).await.unwrap();
    cache.fetch(key("P2"), counting_loader(calls.clone())).await.unwrap();
    let mut watch = cache.watch(&key("P1"));
    watch.mark_seen();

    let matched = cache.invalidate(keys::in_namespace(keys::PRODUCTS));
    assert_eq!(matched, 2);

    // P1 is observed and reloads; P2 is only marked stale
    while watch.changed().await {
      if watch.mark_seen().status == QueryStatus::Success {
        break;
      }
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(!cache.get(&key("P1")).invalidated);
    assert!(cache.get(&key("P2")).invalidated);
  }

  #[tokio::test]
  async fn test_invalidate_during_load_reloads_after_settle() {
    let cache = QueryCache::new(CachePolicy::default());
    let calls = Arc::new(AtomicU32::new(0));
    let gate = Arc::new(Notify::new());
    let loader = {
      let calls = calls.clone();
      let gate = gate.clone();
      move || {
        let calls = calls.clone();
        let gate = gate.clone();
        async move {
          let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
          if n == 1 {
            gate.notified().await;
          }
          Ok::<_, StoreError>(n)
        }
      }
    };

    let mut watch = cache.watch(&key("P1"));
    let first = tokio::spawn({
      let cache = cache.clone();
      async move { cache.fetch(key("P1"), loader).await }
    });
    tokio::task::yield_now().await;

    cache.invalidate(|k: &QueryKey| k == &key("P1"));
    gate.notify_one();
    assert_eq!(*first.await.unwrap().unwrap(), 1);

    loop {
      assert!(watch.changed().await);
      let entry = watch.mark_seen();
      if entry.status == QueryStatus::Success && entry.data::<u32>().as_deref() == Some(&2) {
        break;
      }
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_unobserved_entry_is_collected_after_delay() {
    let cache = QueryCache::new(CachePolicy::default().with_gc_delay(Duration::from_secs(30)));
    cache.fetch(key("P1"), || async { Ok(1u8) }).await.unwrap();

    let sub = cache.subscribe(&key("P1"), |_| {});
    drop(sub);

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(cache.peek(&key("P1")).is_some());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(cache.peek(&key("P1")).is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_resubscribe_cancels_collection() {
    let cache = QueryCache::new(CachePolicy::default().with_gc_delay(Duration::from_secs(30)));
    cache.fetch(key("P1"), || async { Ok(1u8) }).await.unwrap();

    drop(cache.subscribe(&key("P1"), |_| {}));
    let _again = cache.subscribe(&key("P1"), |_| {});

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(cache.peek(&key("P1")).is_some());
  }

  #[tokio::test]
  async fn test_observe_loads_once_and_reports_through_watch() {
    let cache = QueryCache::new(CachePolicy::default());
    let calls = Arc::new(AtomicU32::new(0));

    let mut watch = cache.observe(&key("P1"), counting_loader(calls.clone()));
    assert!(watch.current().is_loading());
    // a second observer joins instead of loading again
    let _other = cache.observe(&key("P1"), counting_loader(calls.clone()));

    while watch.changed().await {
      if watch.mark_seen().status == QueryStatus::Success {
        break;
      }
    }
    assert_eq!(watch.current().data::<u32>().as_deref(), Some(&1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_remove_drops_customer_scoped_entries() {
    let cache = QueryCache::new(CachePolicy::default());
    let customer = crate::api::types::CustomerId::new("c1");
    cache.get(&keys::wishlist::list(&customer));
    cache.get(&keys::cart::summary(&customer));
    cache.get(&key("P1"));

    assert_eq!(cache.remove(keys::customer_scoped), 2);
    assert_eq!(cache.len(), 1);
  }

  #[tokio::test]
  async fn test_type_mismatch_is_decode_error() {
    let cache = QueryCache::new(CachePolicy::default());
    cache.fetch(key("P1"), || async { Ok(1u8) }).await.unwrap();
    let err = cache
      .ensure(key("P1"), || async { Ok("text".to_string()) })
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::Decode(_)));
  }
}
