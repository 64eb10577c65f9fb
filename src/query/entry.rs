//! Cache entries and their lifecycle state.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::key::QueryKey;
use crate::error::StoreError;

/// Type-erased payload of a cache entry.
pub type QueryData = Arc<dyn Any + Send + Sync>;

/// The lifecycle status of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// Created, nothing requested yet
  Idle,
  /// A load is in flight
  Loading,
  /// Last load succeeded
  Success,
  /// Last load failed (data from an earlier success may still be present)
  Error,
}

/// Read-only snapshot of one cached read.
///
/// Views only ever hold snapshots; the live entry belongs to the cache.
#[derive(Clone)]
pub struct CacheEntry {
  pub key: QueryKey,
  pub status: QueryStatus,
  data: Option<QueryData>,
  pub error: Option<StoreError>,
  pub fetched_at: Option<Instant>,
  pub stale_after: Duration,
  /// Set by invalidation; cleared by the next successful load
  pub invalidated: bool,
}

impl CacheEntry {
  pub(crate) fn idle(key: QueryKey, stale_after: Duration) -> Self {
    Self {
      key,
      status: QueryStatus::Idle,
      data: None,
      error: None,
      fetched_at: None,
      stale_after,
      invalidated: false,
    }
  }

  pub(crate) fn set_loading(&mut self) {
    self.status = QueryStatus::Loading;
  }

  pub(crate) fn set_success(&mut self, data: QueryData, now: Instant) {
    self.status = QueryStatus::Success;
    self.data = Some(data);
    self.error = None;
    self.fetched_at = Some(now);
    self.invalidated = false;
  }

  /// Stale-while-error: keep whatever data we had.
  pub(crate) fn set_error(&mut self, error: StoreError) {
    self.status = QueryStatus::Error;
    self.error = Some(error);
  }

  /// Typed view of the payload. `None` if absent or stored under another type.
  pub fn data<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.data.clone()?.downcast::<T>().ok()
  }

  pub fn has_data(&self) -> bool {
    self.data.is_some()
  }

  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Loading
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }

  /// Eligible for a background refetch.
  pub fn is_stale_at(&self, now: Instant) -> bool {
    if self.invalidated {
      return true;
    }
    match self.fetched_at {
      Some(at) => now.saturating_duration_since(at) >= self.stale_after,
      None => true,
    }
  }

  pub fn is_stale(&self) -> bool {
    self.is_stale_at(Instant::now())
  }

  /// Fresh data that can be served without calling the loader.
  pub(crate) fn fresh_data(&self, now: Instant) -> Option<&QueryData> {
    if self.status == QueryStatus::Success && !self.is_stale_at(now) {
      self.data.as_ref()
    } else {
      None
    }
  }
}

impl fmt::Debug for CacheEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheEntry")
      .field("key", &self.key)
      .field("status", &self.status)
      .field("has_data", &self.data.is_some())
      .field("error", &self.error)
      .field("fetched_at", &self.fetched_at)
      .field("stale_after", &self.stale_after)
      .field("invalidated", &self.invalidated)
      .finish()
  }
}
