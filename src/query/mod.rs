//! Keyed query cache shared by every view.
//!
//! - [`QueryKey`]: structured `(namespace, operation, params)` identity
//! - [`QueryCache`]: de-duplicated loads, staleness, invalidation, GC
//! - [`CacheEntry`]: the read-only snapshot subscribers receive

mod cache;
mod entry;
mod key;
mod policy;

pub use cache::{EntryWatch, QueryCache, Subscription};
pub use entry::{CacheEntry, QueryStatus};
pub use key::{keys, QueryKey};
pub use policy::CachePolicy;
