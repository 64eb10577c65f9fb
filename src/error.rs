//! Error taxonomy for the storefront core.
//!
//! Errors here are never fatal to the process. The worst outcome of any of
//! them is a visible stale or empty state, an inline notice, or a redirect
//! to the sign-in view.

use thiserror::Error;

/// Where the client sends a customer who needs a session.
pub const SIGN_IN_PATH: &str = "/sign_in";

/// Errors produced by the core (cache, search, wishlist, cart, auth).
///
/// `Clone` so that a single in-flight result can be handed to every waiter
/// of a de-duplicated fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
  /// Transport failure or a non-2xx response.
  #[error("{}", network_message(*status, message))]
  Network {
    status: Option<u16>,
    message: String,
  },

  /// The action needs a session that does not exist (or has expired).
  #[error("sign in required")]
  Unauthenticated,

  /// Malformed local input, rejected before it reaches the network.
  #[error("invalid input: {0}")]
  Validation(String),

  /// The server rejected an optimistic mutation.
  #[error("rejected by server: {0}")]
  Conflict(String),

  /// Session persistence failed.
  #[error("session storage error: {0}")]
  Storage(String),

  /// A response body could not be decoded.
  #[error("unexpected response: {0}")]
  Decode(String),
}

fn network_message(status: Option<u16>, message: &str) -> String {
  match status {
    Some(code) => format!("HTTP {}: {}", code, message),
    None => format!("network error: {}", message),
  }
}

impl StoreError {
  pub fn network(message: impl Into<String>) -> Self {
    Self::Network {
      status: None,
      message: message.into(),
    }
  }

  pub fn http(status: u16, message: impl Into<String>) -> Self {
    Self::Network {
      status: Some(status),
      message: message.into(),
    }
  }

  /// Navigation side-effect the caller should perform, if any.
  pub fn redirect(&self) -> Option<&'static str> {
    match self {
      Self::Unauthenticated => Some(SIGN_IN_PATH),
      _ => None,
    }
  }

  pub fn is_unauthenticated(&self) -> bool {
    matches!(self, Self::Unauthenticated)
  }
}

impl From<reqwest::Error> for StoreError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      return Self::Decode(err.to_string());
    }
    match err.status() {
      Some(status) => Self::http(status.as_u16(), err.to_string()),
      None => Self::network(err.to_string()),
    }
  }
}

impl From<rusqlite::Error> for StoreError {
  fn from(err: rusqlite::Error) -> Self {
    Self::Storage(err.to_string())
  }
}

impl From<serde_json::Error> for StoreError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_http_status_is_embedded_in_message() {
    let err = StoreError::http(503, "Service Unavailable");
    assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
  }

  #[test]
  fn test_transport_error_message() {
    let err = StoreError::network("connection refused");
    assert_eq!(err.to_string(), "network error: connection refused");
  }

  #[test]
  fn test_only_unauthenticated_redirects() {
    assert_eq!(StoreError::Unauthenticated.redirect(), Some("/sign_in"));
    assert_eq!(StoreError::Conflict("x".into()).redirect(), None);
    assert_eq!(StoreError::network("x").redirect(), None);
  }
}
