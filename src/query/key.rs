//! Structured query keys and the namespace builders views use to name reads.

use std::collections::BTreeMap;
use std::fmt;

/// A single named parameter value in a query key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamValue {
  Str(String),
  Int(i64),
  Bool(bool),
  List(Vec<ParamValue>),
}

impl fmt::Display for ParamValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ParamValue::Str(s) => write!(f, "{:?}", s),
      ParamValue::Int(i) => write!(f, "{}", i),
      ParamValue::Bool(b) => write!(f, "{}", b),
      ParamValue::List(items) => {
        f.write_str("[")?;
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            f.write_str(",")?;
          }
          write!(f, "{}", item)?;
        }
        f.write_str("]")
      }
    }
  }
}

impl From<&str> for ParamValue {
  fn from(v: &str) -> Self {
    ParamValue::Str(v.to_string())
  }
}

impl From<String> for ParamValue {
  fn from(v: String) -> Self {
    ParamValue::Str(v)
  }
}

impl From<i64> for ParamValue {
  fn from(v: i64) -> Self {
    ParamValue::Int(v)
  }
}

impl From<u32> for ParamValue {
  fn from(v: u32) -> Self {
    ParamValue::Int(i64::from(v))
  }
}

impl From<bool> for ParamValue {
  fn from(v: bool) -> Self {
    ParamValue::Bool(v)
  }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
  fn from(v: Vec<T>) -> Self {
    ParamValue::List(v.into_iter().map(Into::into).collect())
  }
}

/// `(namespace, operation, params)` identifying one cacheable read.
///
/// Params are kept in a sorted map, so keys built from the same named
/// params in any insertion order compare and hash equal. List values keep
/// their order: `[a, b]` and `[b, a]` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
  namespace: &'static str,
  operation: &'static str,
  params: BTreeMap<String, ParamValue>,
}

impl QueryKey {
  pub fn new(namespace: &'static str, operation: &'static str) -> Self {
    Self {
      namespace,
      operation,
      params: BTreeMap::new(),
    }
  }

  /// Add a named param. `None`-like absence is expressed by not calling this.
  pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
    self.params.insert(name.to_string(), value.into());
    self
  }

  /// Add a param only when a value is present.
  pub fn param_opt(self, name: &str, value: Option<impl Into<ParamValue>>) -> Self {
    match value {
      Some(v) => self.param(name, v),
      None => self,
    }
  }

  pub fn namespace(&self) -> &'static str {
    self.namespace
  }

  pub fn operation(&self) -> &'static str {
    self.operation
  }

  pub fn get(&self, name: &str) -> Option<&ParamValue> {
    self.params.get(name)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.namespace, self.operation)?;
    if !self.params.is_empty() {
      f.write_str("{")?;
      for (i, (name, value)) in self.params.iter().enumerate() {
        if i > 0 {
          f.write_str(",")?;
        }
        write!(f, "{}={}", name, value)?;
      }
      f.write_str("}")?;
    }
    Ok(())
  }
}

// ============================================================================
// Namespace builders
// ============================================================================

/// Canonical keys for every read the client caches.
pub mod keys {
  use super::{ParamValue, QueryKey};

  pub const PRODUCTS: &str = "products";
  pub const REVIEWS: &str = "reviews";
  pub const SHIPMENTS: &str = "shipments";
  pub const WISHLIST: &str = "wishlist";
  pub const CART: &str = "cart";

  /// Name of the param that scopes a key to one customer.
  pub const CUSTOMER: &str = "customer";

  pub mod products {
    use super::super::QueryKey;
    use crate::api::types::{ListingParams, ProductId};

    pub fn listing(params: &ListingParams) -> QueryKey {
      QueryKey::new(super::PRODUCTS, "listing")
        .param("page", params.page)
        .param("limit", params.limit)
        .param_opt("category", params.category.clone())
        .param_opt("sort", params.sort.clone())
    }

    pub fn detail(id: &ProductId) -> QueryKey {
      QueryKey::new(super::PRODUCTS, "detail").param("id", id.as_str())
    }

    /// Search results for one surface. `query` must already be trimmed.
    pub fn search(query: &str, surface: &str, page: u32, limit: u32) -> QueryKey {
      QueryKey::new(super::PRODUCTS, "search")
        .param("q", query)
        .param("surface", surface)
        .param("page", page)
        .param("limit", limit)
    }
  }

  pub mod reviews {
    use super::super::QueryKey;
    use crate::api::types::ProductId;

    pub fn for_product(id: &ProductId) -> QueryKey {
      QueryKey::new(super::REVIEWS, "for_product").param("product", id.as_str())
    }
  }

  pub mod shipments {
    use super::super::QueryKey;

    pub fn for_order(order_id: &str) -> QueryKey {
      QueryKey::new(super::SHIPMENTS, "for_order").param("order", order_id)
    }
  }

  pub mod wishlist {
    use super::super::QueryKey;
    use crate::api::types::CustomerId;

    pub fn list(customer: &CustomerId) -> QueryKey {
      QueryKey::new(super::WISHLIST, "list").param(super::CUSTOMER, customer.as_str())
    }
  }

  pub mod cart {
    use super::super::QueryKey;
    use crate::api::types::CustomerId;

    pub fn summary(customer: &CustomerId) -> QueryKey {
      QueryKey::new(super::CART, "summary").param(super::CUSTOMER, customer.as_str())
    }
  }

  /// Predicate matching every key in a namespace.
  pub fn in_namespace(namespace: &'static str) -> impl Fn(&QueryKey) -> bool {
    move |key: &QueryKey| key.namespace() == namespace
  }

  /// Predicate matching a namespace's keys for one customer.
  pub fn for_customer(namespace: &'static str, customer: &str) -> impl Fn(&QueryKey) -> bool {
    let customer = ParamValue::Str(customer.to_string());
    move |key: &QueryKey| key.namespace() == namespace && key.get(CUSTOMER) == Some(&customer)
  }

  /// Predicate matching every key scoped to one customer.
  pub fn of_customer(customer: &str) -> impl Fn(&QueryKey) -> bool {
    let customer = ParamValue::Str(customer.to_string());
    move |key: &QueryKey| key.get(CUSTOMER) == Some(&customer)
  }

  /// Predicate matching any customer-scoped key, whatever its namespace.
  pub fn customer_scoped(key: &QueryKey) -> bool {
    key.get(CUSTOMER).is_some()
  }
}
