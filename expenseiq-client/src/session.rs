//! Signed-in session: the bearer token plus the profile returned at login.
//!
//! The session is persisted to a JSON file so the CLI stays signed in between
//! runs, and published over a `watch` channel so the alert poller can follow
//! login and logout.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl UserProfile {
    /// Administrators have no personal budget alerts.
    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .map(str::trim)
            .is_some_and(|r| r.eq_ignore_ascii_case("ADMIN") || r.eq_ignore_ascii_case("ROLE_ADMIN"))
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means signed out. A corrupt file is removed and treated the same way.
    pub fn load(&self) -> Result<Option<Session>> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&s) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable session file");
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let s = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, s)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// What the session channel carries. `epoch` moves on every sign-in and every
/// sign-out, so a logout immediately followed by a login still reads as a new
/// session even after the channel has coalesced both updates into one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub epoch: u64,
    pub session: Option<Session>,
}

/// Shared, observable session state. Cloning yields another handle to the same session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<SessionState>>,
    store: Option<SessionStore>,
}

impl SessionHandle {
    /// In-memory only; nothing is persisted.
    pub fn new(initial: Option<Session>) -> Self {
        let (tx, _rx) = watch::channel(SessionState {
            epoch: 0,
            session: initial,
        });
        Self {
            tx: Arc::new(tx),
            store: None,
        }
    }

    /// Restore any persisted session and keep the file in sync from now on.
    pub fn with_store(store: SessionStore) -> Result<Self> {
        let initial = store.load()?;
        let (tx, _rx) = watch::channel(SessionState {
            epoch: 0,
            session: initial,
        });
        Ok(Self {
            tx: Arc::new(tx),
            store: Some(store),
        })
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().session.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().session.as_ref().map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().session.is_some()
    }

    pub fn epoch(&self) -> u64 {
        self.tx.borrow().epoch
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Every sign-in starts a new epoch, including a repeat login as the same user.
    pub fn sign_in(&self, session: Session) -> Result<()> {
        if let Some(store) = &self.store {
            store.save(&session)?;
        }
        tracing::info!(email = %session.user.email, "signed in");
        self.tx.send_modify(|state| {
            state.epoch += 1;
            state.session = Some(session);
        });
        Ok(())
    }

    pub fn sign_out(&self) -> Result<()> {
        let cleared = match &self.store {
            Some(store) => store.clear(),
            None => Ok(()),
        };
        // Observers are told even if the file could not be removed.
        let was_signed_in = self.tx.send_if_modified(|state| {
            if state.session.take().is_none() {
                return false;
            }
            state.epoch += 1;
            true
        });
        if was_signed_in {
            tracing::info!("signed out");
        }
        cleared
    }

    /// The backend rejected our credential: forget it locally.
    pub fn invalidate(&self) {
        tracing::warn!("backend rejected credentials; clearing session");
        if let Err(e) = self.sign_out() {
            tracing::warn!(error = %e, "failed to remove persisted session");
        }
    }
}
