//! Domain types shared by the core and the views.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
  ($name:ident) => {
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct $name(pub String);

    impl $name {
      pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
      }

      pub fn as_str(&self) -> &str {
        &self.0
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }

    impl From<&str> for $name {
      fn from(id: &str) -> Self {
        Self(id.to_string())
      }
    }
  };
}

string_id!(ProductId);
string_id!(CustomerId);

/// Product as shown on cards, rows and the detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: ProductId,
  pub name: String,
  #[serde(default)]
  pub slug: Option<String>,
  pub price: Decimal,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default = "default_true")]
  pub in_stock: bool,
}

fn default_true() -> bool {
  true
}

/// Category hit returned alongside products by search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub slug: Option<String>,
  #[serde(default)]
  pub product_count: Option<u32>,
}

/// Signed-in customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
  pub id: CustomerId,
  pub name: String,
  pub email: String,
}

/// Read-only cart aggregate shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartSummary {
  pub count: u32,
  pub total: Decimal,
}

/// Merged search response: both result sets plus paging counters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResults {
  pub products: Vec<Product>,
  pub categories: Vec<Category>,
  pub total_products: u32,
  pub total_categories: u32,
  pub page: u32,
  pub limit: u32,
  pub total_pages: u32,
}

impl SearchResults {
  pub fn is_empty(&self) -> bool {
    self.products.is_empty() && self.categories.is_empty()
  }
}

/// A page of products from the catalog listing endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub page: u32,
  pub limit: u32,
  pub total_pages: u32,
}

/// Catalog listing parameters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingParams {
  pub page: u32,
  pub limit: u32,
  pub category: Option<String>,
  pub sort: Option<String>,
}

#[derive(Clone)]
pub struct Credentials {
  pub email: String,
  pub password: String,
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("email", &self.email)
      .finish_non_exhaustive()
  }
}

/// Token and profile handed out by a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGrant {
  pub token: String,
  pub customer: CustomerProfile,
}
