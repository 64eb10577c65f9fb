//! Authentication state: the single source of truth for who is signed in.

mod store;

pub use store::{MemorySessionStore, PersistedSession, SessionStore, SqliteSessionStore};

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::types::{CustomerId, CustomerProfile, Credentials, SessionGrant};
use crate::api::{Principal, StorefrontApi};
use crate::error::{StoreError, StoreResult};

/// Current session. Either both customer and token are present or neither is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
  customer: Option<CustomerProfile>,
  token: Option<String>,
}

impl AuthSession {
  pub fn anonymous() -> Self {
    Self::default()
  }

  pub fn authenticated(grant: SessionGrant) -> Self {
    Self {
      customer: Some(grant.customer),
      token: Some(grant.token),
    }
  }

  /// Derived, never stored.
  pub fn is_authenticated(&self) -> bool {
    self.customer.is_some() && self.token.is_some()
  }

  pub fn customer(&self) -> Option<&CustomerProfile> {
    self.customer.as_ref()
  }

  pub fn customer_id(&self) -> Option<&CustomerId> {
    self.customer.as_ref().map(|c| &c.id)
  }

  /// Identity for customer-scoped API calls.
  pub fn principal(&self) -> Option<Principal> {
    match (&self.customer, &self.token) {
      (Some(customer), Some(token)) => Some(Principal {
        customer_id: customer.id.clone(),
        token: token.clone(),
      }),
      _ => None,
    }
  }
}

/// Called synchronously inside every session transition.
pub type SessionListener = Arc<dyn Fn(&AuthSession) + Send + Sync>;

struct GateInner {
  api: Arc<dyn StorefrontApi>,
  store: Arc<dyn SessionStore>,
  session: watch::Sender<AuthSession>,
  listeners: Mutex<Vec<SessionListener>>,
}

/// Owns the session; everyone else reads it.
#[derive(Clone)]
pub struct AuthGate {
  inner: Arc<GateInner>,
}

impl AuthGate {
  pub fn new(api: Arc<dyn StorefrontApi>, store: Arc<dyn SessionStore>) -> Self {
    let (session, _) = watch::channel(AuthSession::anonymous());
    Self {
      inner: Arc::new(GateInner {
        api,
        store,
        session,
        listeners: Mutex::new(Vec::new()),
      }),
    }
  }

  /// The session as of right now.
  pub fn session(&self) -> AuthSession {
    self.inner.session.borrow().clone()
  }

  pub fn is_authenticated(&self) -> bool {
    self.inner.session.borrow().is_authenticated()
  }

  pub fn principal(&self) -> Option<Principal> {
    self.inner.session.borrow().principal()
  }

  /// Receiver for views that redraw on session changes.
  pub fn subscribe(&self) -> watch::Receiver<AuthSession> {
    self.inner.session.subscribe()
  }

  /// Register a dependent that must observe transitions as they happen.
  pub fn on_change<F>(&self, listener: F)
  where
    F: Fn(&AuthSession) + Send + Sync + 'static,
  {
    self
      .inner
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(Arc::new(listener));
  }

  /// Read the persisted session at process start.
  ///
  /// Only a token together with a profile counts as signed in; anything
  /// partial is cleared from storage.
  pub fn restore(&self) {
    let persisted = match self.inner.store.load() {
      Ok(p) => p,
      Err(e) => {
        warn!(error = %e, "could not read persisted session");
        PersistedSession::default()
      }
    };

    match persisted {
      PersistedSession {
        token: Some(token),
        customer: Some(customer),
      } if !token.trim().is_empty() => {
        info!(customer = %customer.id, "restored session");
        self.transition(AuthSession::authenticated(SessionGrant { token, customer }));
      }
      PersistedSession {
        token: None,
        customer: None,
      } => self.transition(AuthSession::anonymous()),
      _ => {
        warn!("discarding partial persisted session");
        self.clear_store();
        self.transition(AuthSession::anonymous());
      }
    }
  }

  /// Sign in and persist the session.
  pub async fn login(&self, credentials: &Credentials) -> StoreResult<CustomerProfile> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
      return Err(StoreError::Validation(
        "email and password are required".to_string(),
      ));
    }

    let grant = self.inner.api.login(credentials).await?;
    if grant.token.trim().is_empty() {
      return Err(StoreError::Decode("login returned an empty token".to_string()));
    }

    if let Err(e) = self.inner.store.save(&grant) {
      // Still signed in for this run
      warn!(error = %e, "could not persist session");
    }

    let customer = grant.customer.clone();
    info!(customer = %customer.id, "signed in");
    self.transition(AuthSession::authenticated(grant));
    Ok(customer)
  }

  pub fn logout(&self) {
    if !self.is_authenticated() {
      return;
    }
    info!("signed out");
    self.clear_store();
    self.transition(AuthSession::anonymous());
  }

  /// The server rejected our token; drop the session.
  pub fn expire(&self) {
    if !self.is_authenticated() {
      return;
    }
    warn!("session expired");
    self.clear_store();
    self.transition(AuthSession::anonymous());
  }

  /// Feed an API result through the gate, expiring the session on 401.
  pub fn check<T>(&self, result: StoreResult<T>) -> StoreResult<T> {
    if matches!(&result, Err(e) if e.is_unauthenticated()) {
      self.expire();
    }
    result
  }

  fn clear_store(&self) {
    if let Err(e) = self.inner.store.clear() {
      warn!(error = %e, "could not clear persisted session");
    }
  }

  fn transition(&self, next: AuthSession) {
    self.inner.session.send_replace(next.clone());
    let listeners: Vec<SessionListener> = self
      .inner
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();
    for listener in listeners {
      listener(&next);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{customer, FakeApi};

  fn gate_with(store: Arc<dyn SessionStore>) -> (AuthGate, Arc<FakeApi>) {
    let api = Arc::new(FakeApi::new());
    (AuthGate::new(api.clone(), store), api)
  }

  fn creds() -> Credentials {
    Credentials {
      email: "ada@example.com".into(),
      password: "secret".into(),
    }
  }

  #[test]
  fn test_is_authenticated_needs_both_halves() {
    assert!(!AuthSession::anonymous().is_authenticated());
    let session = AuthSession::authenticated(SessionGrant {
      token: "t".into(),
      customer: customer("c1"),
    });
    assert!(session.is_authenticated());
    assert_eq!(session.principal().unwrap().token, "t");
  }

  #[test]
  fn test_restore_full_session() {
    let store = Arc::new(MemorySessionStore::with(PersistedSession {
      token: Some("tok".into()),
      customer: Some(customer("c1")),
    }));
    let (gate, _) = gate_with(store);
    gate.restore();
    assert!(gate.is_authenticated());
    assert_eq!(gate.session().customer_id(), Some(&CustomerId::new("c1")));
  }

  #[test]
  fn test_restore_partial_session_clears_it() {
    let store = Arc::new(MemorySessionStore::with(PersistedSession {
      token: Some("tok".into()),
      customer: None,
    }));
    let (gate, _) = gate_with(store.clone());
    gate.restore();
    assert!(!gate.is_authenticated());
    assert_eq!(store.load().unwrap(), PersistedSession::default());
  }

  #[test]
  fn test_restore_profile_without_token_clears_it() {
    let store = Arc::new(MemorySessionStore::with(PersistedSession {
      token: None,
      customer: Some(customer("c1")),
    }));
    let (gate, _) = gate_with(store.clone());
    gate.restore();
    assert!(!gate.is_authenticated());
    assert_eq!(store.load().unwrap(), PersistedSession::default());
  }

  #[tokio::test]
  async fn test_login_persists_and_notifies() {
    let store = Arc::new(MemorySessionStore::new());
    let (gate, _) = gate_with(store.clone());
    let seen = Arc::new(Mutex::new(Vec::new()));
    gate.on_change({
      let seen = seen.clone();
      move |s: &AuthSession| seen.lock().unwrap().push(s.is_authenticated())
    });

    let profile = gate.login(&creds()).await.unwrap();
    assert_eq!(profile.email, "ada@example.com");
    assert!(gate.is_authenticated());
    assert!(store.load().unwrap().token.is_some());

    gate.logout();
    assert!(!gate.is_authenticated());
    assert_eq!(store.load().unwrap(), PersistedSession::default());
    assert_eq!(*seen.lock().unwrap(), vec![true, false]);
  }

  #[tokio::test]
  async fn test_listener_sees_new_session_already_in_place() {
    let (gate, _) = gate_with(Arc::new(MemorySessionStore::new()));
    let observed = Arc::new(Mutex::new(None));
    gate.on_change({
      let gate = gate.clone();
      let observed = observed.clone();
      move |_: &AuthSession| *observed.lock().unwrap() = Some(gate.is_authenticated())
    });

    gate.login(&creds()).await.unwrap();
    assert_eq!(*observed.lock().unwrap(), Some(true));
  }

  #[tokio::test]
  async fn test_login_rejects_blank_credentials_locally() {
    let (gate, api) = gate_with(Arc::new(MemorySessionStore::new()));
    let err = gate
      .login(&Credentials {
        email: "  ".into(),
        password: "x".into(),
      })
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(api.calls("login"), 0);
  }

  #[tokio::test]
  async fn test_failed_login_stays_signed_out() {
    let (gate, api) = gate_with(Arc::new(MemorySessionStore::new()));
    api.fail_login(StoreError::Unauthenticated);
    assert!(gate.login(&creds()).await.is_err());
    assert!(!gate.is_authenticated());
  }

  #[tokio::test]
  async fn test_check_expires_on_unauthenticated() {
    let (gate, _) = gate_with(Arc::new(MemorySessionStore::new()));
    gate.login(&creds()).await.unwrap();

    let result: StoreResult<()> = gate.check(Err(StoreError::Unauthenticated));
    assert!(result.is_err());
    assert!(!gate.is_authenticated());
  }
}
