use std::collections::HashMap;
use std::time::Duration;

use super::key::{keys, QueryKey};

/// Staleness, retry and collection rules for the query cache.
#[derive(Debug, Clone)]
pub struct CachePolicy {
  default_stale: Duration,
  namespace_stale: HashMap<&'static str, Duration>,
  gc_delay: Duration,
  retries: u32,
}

impl Default for CachePolicy {
  fn default() -> Self {
    let mut namespace_stale = HashMap::new();
    // Membership must always revalidate after a mutation
    namespace_stale.insert(keys::WISHLIST, Duration::ZERO);

    Self {
      default_stale: Duration::from_secs(60),
      namespace_stale,
      gc_delay: Duration::from_secs(5 * 60),
      retries: 1,
    }
  }
}

impl CachePolicy {
  pub fn with_default_stale(mut self, stale: Duration) -> Self {
    self.default_stale = stale;
    self
  }

  pub fn with_gc_delay(mut self, delay: Duration) -> Self {
    self.gc_delay = delay;
    self
  }

  pub fn with_retries(mut self, retries: u32) -> Self {
    self.retries = retries;
    self
  }

  pub fn stale_for(&self, key: &QueryKey) -> Duration {
    self
      .namespace_stale
      .get(key.namespace())
      .copied()
      .unwrap_or(self.default_stale)
  }

  pub fn gc_delay(&self) -> Duration {
    self.gc_delay
  }

  pub fn retries(&self) -> u32 {
    self.retries
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::CustomerId;

  #[test]
  fn test_defaults() {
    let policy = CachePolicy::default();
    let customer = CustomerId::new("c1");
    assert_eq!(
      policy.stale_for(&keys::cart::summary(&customer)),
      Duration::from_secs(60)
    );
    assert_eq!(policy.stale_for(&keys::wishlist::list(&customer)), Duration::ZERO);
    assert_eq!(policy.retries(), 1);
  }

  #[test]
  fn test_override_keeps_namespace_rules() {
    let policy = CachePolicy::default().with_default_stale(Duration::from_secs(5));
    let customer = CustomerId::new("c1");
    assert_eq!(
      policy.stale_for(&keys::cart::summary(&customer)),
      Duration::from_secs(5)
    );
    assert_eq!(policy.stale_for(&keys::wishlist::list(&customer)), Duration::ZERO);
  }
}
