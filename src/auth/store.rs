//! Session persistence across restarts.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::api::types::{CustomerProfile, SessionGrant};
use crate::error::{StoreError, StoreResult};

/// Whatever was found on disk. Either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSession {
  pub token: Option<String>,
  pub customer: Option<CustomerProfile>,
}

/// Backend that remembers the signed-in customer between runs.
pub trait SessionStore: Send + Sync {
  fn load(&self) -> StoreResult<PersistedSession>;

  fn save(&self, grant: &SessionGrant) -> StoreResult<()>;

  fn clear(&self) -> StoreResult<()>;
}

/// Schema for the session table. A single row, id fixed at 1.
const SESSION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS auth_session (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    token TEXT,
    customer_json TEXT,
    saved_at TEXT NOT NULL
);
"#;

/// SQLite-backed session store.
pub struct SqliteSessionStore {
  conn: Mutex<Connection>,
}

impl SqliteSessionStore {
  /// Open or create the session database at `path`.
  pub fn open(path: &Path) -> StoreResult<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| {
        StoreError::Storage(format!("Failed to create session directory: {}", e))
      })?;
    }

    Self::with_connection(Connection::open(path)?)
  }

  #[cfg(test)]
  pub fn open_in_memory() -> StoreResult<Self> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> StoreResult<Self> {
    conn.execute_batch(SESSION_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn conn(&self) -> MutexGuard<'_, Connection> {
    self.conn.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl SessionStore for SqliteSessionStore {
  fn load(&self) -> StoreResult<PersistedSession> {
    let conn = self.conn();
    let row: Option<(Option<String>, Option<String>)> = conn
      .query_row(
        "SELECT token, customer_json FROM auth_session WHERE id = 1",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    let Some((token, customer_json)) = row else {
      return Ok(PersistedSession::default());
    };

    // An unreadable profile counts as a missing one
    let customer = customer_json.and_then(|json| serde_json::from_str(&json).ok());

    Ok(PersistedSession { token, customer })
  }

  fn save(&self, grant: &SessionGrant) -> StoreResult<()> {
    let customer_json = serde_json::to_string(&grant.customer)?;
    self.conn().execute(
      "INSERT INTO auth_session (id, token, customer_json, saved_at)
       VALUES (1, ?1, ?2, ?3)
       ON CONFLICT(id) DO UPDATE SET
         token = excluded.token,
         customer_json = excluded.customer_json,
         saved_at = excluded.saved_at",
      params![grant.token, customer_json, Utc::now().to_rfc3339()],
    )?;
    Ok(())
  }

  fn clear(&self) -> StoreResult<()> {
    self.conn().execute("DELETE FROM auth_session", [])?;
    Ok(())
  }
}

/// In-process store used with `--ephemeral` and in tests.
#[derive(Default)]
pub struct MemorySessionStore {
  state: Mutex<PersistedSession>,
}

impl MemorySessionStore {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn with(persisted: PersistedSession) -> Self {
    Self {
      state: Mutex::new(persisted),
    }
  }

  fn state(&self) -> MutexGuard<'_, PersistedSession> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl SessionStore for MemorySessionStore {
  fn load(&self) -> StoreResult<PersistedSession> {
    Ok(self.state().clone())
  }

  fn save(&self, grant: &SessionGrant) -> StoreResult<()> {
    *self.state() = PersistedSession {
      token: Some(grant.token.clone()),
      customer: Some(grant.customer.clone()),
    };
    Ok(())
  }

  fn clear(&self) -> StoreResult<()> {
    *self.state() = PersistedSession::default();
    Ok(())
  }
}
