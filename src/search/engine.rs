use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::state::{SearchState, Surface, SurfacePhase};
use crate::api::types::SearchResults;
use crate::api::StorefrontApi;
use crate::error::StoreResult;
use crate::query::{keys, QueryCache};

/// Timing and sizing for search surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
  /// Input inactivity required before a query is sent
  pub debounce: Duration,
  pub dropdown_limit: u32,
  pub page_size: u32,
}

impl Default for SearchSettings {
  fn default() -> Self {
    Self {
      debounce: Duration::from_millis(300),
      dropdown_limit: 5,
      page_size: 20,
    }
  }
}

struct SurfaceSlot {
  phase: SurfacePhase,
  timer: Option<JoinHandle<()>>,
  /// Only a response for this request may touch `state`
  latest_request: u64,
  state: watch::Sender<SearchState>,
}

impl SurfaceSlot {
  fn new() -> Self {
    let (state, _) = watch::channel(SearchState::default());
    Self {
      phase: SurfacePhase::Idle,
      timer: None,
      latest_request: 0,
      state,
    }
  }

  fn cancel_timer(&mut self) {
    if let Some(timer) = self.timer.take() {
      timer.abort();
    }
  }

  fn reset(&mut self, superseded_by: u64) {
    self.cancel_timer();
    self.latest_request = superseded_by;
    self.phase = SurfacePhase::Idle;
    self.state.send_replace(SearchState::default());
  }
}

struct EngineInner {
  api: Arc<dyn StorefrontApi>,
  cache: QueryCache,
  settings: SearchSettings,
  surfaces: Mutex<HashMap<Surface, SurfaceSlot>>,
  next_id: AtomicU64,
}

/// Debounced search with per-surface stale-response suppression.
///
/// Every surface runs its own `Idle -> Pending -> InFlight -> Settled`
/// machine. Superseded timers are aborted; superseded HTTP calls are left to
/// finish and their responses are dropped.
#[derive(Clone)]
pub struct SearchEngine {
  inner: Arc<EngineInner>,
}

impl SearchEngine {
  pub fn new(api: Arc<dyn StorefrontApi>, cache: QueryCache, settings: SearchSettings) -> Self {
    Self {
      inner: Arc::new(EngineInner {
        api,
        cache,
        settings,
        surfaces: Mutex::new(HashMap::new()),
        next_id: AtomicU64::new(1),
      }),
    }
  }

  /// Schedule a search for `raw` on `surface` after the debounce delay.
  ///
  /// Blank input clears the surface immediately without touching the network.
  pub fn search(&self, surface: Surface, raw: &str) {
    self.schedule(surface, raw, 1);
  }

  /// Jump to another page of the current query, skipping the debounce.
  ///
  /// Returns false when there is no query or the page is out of range.
  pub fn goto_page(&self, surface: Surface, page: u32) -> bool {
    let current = self.state(surface);
    if current.query.is_empty() || page == 0 || (current.total_pages > 0 && page > current.total_pages) {
      return false;
    }

    let timer = {
      let mut surfaces = self.lock();
      let slot = surfaces.entry(surface).or_insert_with(SurfaceSlot::new);
      slot.cancel_timer();
      let timer = self.next_id();
      slot.latest_request = timer;
      slot.phase = SurfacePhase::Pending { timer };
      timer
    };
    self.fire(surface, timer, current.query, page);
    true
  }

  /// Stop all updates to `surface` and clear it. In-flight responses are ignored.
  pub fn teardown(&self, surface: Surface) {
    let superseded_by = self.next_id();
    if let Some(slot) = self.lock().get_mut(&surface) {
      debug!(surface = %surface, "tearing down search surface");
      slot.reset(superseded_by);
    }
  }

  pub fn teardown_all(&self) {
    let superseded_by = self.next_id();
    for slot in self.lock().values_mut() {
      slot.reset(superseded_by);
    }
  }

  pub fn subscribe(&self, surface: Surface) -> watch::Receiver<SearchState> {
    self
      .lock()
      .entry(surface)
      .or_insert_with(SurfaceSlot::new)
      .state
      .subscribe()
  }

  pub fn state(&self, surface: Surface) -> SearchState {
    self
      .lock()
      .get(&surface)
      .map(|slot| slot.state.borrow().clone())
      .unwrap_or_default()
  }

  #[cfg(test)]
  pub fn phase(&self, surface: Surface) -> SurfacePhase {
    self
      .lock()
      .get(&surface)
      .map(|slot| slot.phase)
      .unwrap_or(SurfacePhase::Idle)
  }

  fn schedule(&self, surface: Surface, raw: &str, page: u32) {
    let query = raw.trim();
    let id = self.next_id();
    let mut surfaces = self.lock();
    let slot = surfaces.entry(surface).or_insert_with(SurfaceSlot::new);

    if query.is_empty() {
      slot.reset(id);
      return;
    }

    slot.cancel_timer();
    slot.latest_request = id;
    slot.phase = SurfacePhase::Pending { timer: id };

    let engine = Arc::downgrade(&self.inner);
    let query = query.to_string();
    let delay = self.inner.settings.debounce;
    slot.timer = Some(tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      if let Some(engine) = upgrade(&engine) {
        engine.fire(surface, id, query, page);
      }
    }));
  }

  /// Debounce elapsed: issue the request if `timer` is still the pending one.
  fn fire(&self, surface: Surface, timer: u64, query: String, page: u32) {
    let request_id = {
      let mut surfaces = self.lock();
      let Some(slot) = surfaces.get_mut(&surface) else {
        return;
      };
      if slot.phase != (SurfacePhase::Pending { timer }) {
        return;
      }

      let request_id = self.next_id();
      slot.timer = None;
      slot.latest_request = request_id;
      slot.phase = SurfacePhase::InFlight { request_id };
      let next = {
        let current = slot.state.borrow();
        SearchState::searching(&current, &query, page, request_id)
      };
      slot.state.send_replace(next);
      request_id
    };

    debug!(surface = %surface, query = %query, page, request_id, "searching");
    let engine = self.clone();
    tokio::spawn(async move {
      let result = engine.load(surface, &query, page).await;
      engine.apply(surface, request_id, &query, page, result);
    });
  }

  async fn load(&self, surface: Surface, query: &str, page: u32) -> StoreResult<Arc<SearchResults>> {
    let limit = match surface {
      Surface::Dropdown => self.inner.settings.dropdown_limit,
      Surface::Page => self.inner.settings.page_size,
    };
    let key = keys::products::search(query, surface.as_str(), page, limit);
    let api = Arc::clone(&self.inner.api);
    let query = query.to_string();
    self
      .inner
      .cache
      .ensure(key, move || {
        let api = Arc::clone(&api);
        let query = query.clone();
        async move { api.search(&query, page, limit).await }
      })
      .await
  }

  fn apply(
    &self,
    surface: Surface,
    request_id: u64,
    query: &str,
    page: u32,
    result: StoreResult<Arc<SearchResults>>,
  ) {
    let mut surfaces = self.lock();
    let Some(slot) = surfaces.get_mut(&surface) else {
      return;
    };
    // A keystroke since this request was issued supersedes it.
    if slot.latest_request != request_id || matches!(slot.phase, SurfacePhase::Pending { .. }) {
      debug!(surface = %surface, query = %query, request_id, "discarding superseded response");
      return;
    }

    slot.phase = SurfacePhase::Settled { request_id };
    let next = match result {
      Ok(results) => SearchState::from_results(query, request_id, &results),
      Err(e) => {
        warn!(surface = %surface, query = %query, error = %e, "search failed");
        SearchState::failed(query, page, request_id, &e)
      }
    };
    slot.state.send_replace(next);
  }

  fn next_id(&self) -> u64 {
    self.inner.next_id.fetch_add(1, Ordering::Relaxed)
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<Surface, SurfaceSlot>> {
    self
      .inner
      .surfaces
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }
}

fn upgrade(inner: &Weak<EngineInner>) -> Option<SearchEngine> {
  inner.upgrade().map(|inner| SearchEngine { inner })
}
