//! Explicit session context: the signed-in user plus the bearer credential.
//!
//! The credential is the only value that outlives the process. It is read
//! from a [`CredentialStore`] when the handle is opened and cleared from it
//! on logout or failed rehydration. The user is never persisted.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::types::User;

/// Credential storage failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to read credential from {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to write credential to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// The one durable key holding the bearer credential.
pub trait CredentialStore: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the backing storage exists but cannot be read.
    fn load(&self) -> Result<Option<SecretString>, SessionError>;

    /// # Errors
    ///
    /// Returns an error if the credential cannot be persisted.
    fn save(&self, credential: &SecretString) -> Result<(), SessionError>;

    /// # Errors
    ///
    /// Returns an error if the stored credential cannot be removed.
    fn clear(&self) -> Result<(), SessionError>;
}

// =============================================================================
// Credential stores
// =============================================================================

/// Credential persisted as a single file, owner-readable only on Unix.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<SecretString>, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| SecretString::from(token.to_string())))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SessionError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, credential: &SecretString) -> Result<(), SessionError> {
        let write_err = |source| SessionError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(write_err)?;
        file.write_all(credential.expose_secret().as_bytes())
            .map_err(write_err)
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Process-local credential storage.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    value: Mutex<Option<SecretString>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a credential already stored.
    #[must_use]
    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(SecretString::from(credential.into()))),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<SecretString>, SessionError> {
        Ok(self.value.lock().clone())
    }

    fn save(&self, credential: &SecretString) -> Result<(), SessionError> {
        *self.value.lock() = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.value.lock() = None;
        Ok(())
    }
}

// =============================================================================
// Session
// =============================================================================

/// Snapshot of the session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<User>,
    pub credential: Option<SecretString>,
}

/// Shared handle to the session, injected into the API client and stores.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: RwLock<Session>,
    store: Box<dyn CredentialStore>,
    signed_in: watch::Sender<bool>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("SessionHandle")
            .field("user", &state.user.as_ref().map(|u| &u.id))
            .field("has_credential", &state.credential.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    /// Open a session, reading any stored credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be read.
    pub fn open(store: impl CredentialStore + 'static) -> Result<Self, SessionError> {
        let credential = store.load()?;
        debug!(has_credential = credential.is_some(), "Session opened");
        let (signed_in, _) = watch::channel(credential.is_some());
        Ok(Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(Session {
                    user: None,
                    credential,
                }),
                store: Box::new(store),
                signed_in,
            }),
        })
    }

    /// An empty session backed by memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        let (signed_in, _) = watch::channel(false);
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(Session::default()),
                store: Box::new(MemoryCredentialStore::new()),
                signed_in,
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.read().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.read().user.clone()
    }

    #[must_use]
    pub fn credential(&self) -> Option<SecretString> {
        self.inner.state.read().credential.clone()
    }

    /// A credential is present. The user may not be rehydrated yet.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.inner.state.read().credential.is_some()
    }

    /// Fires whenever the session gains or loses its credential.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.signed_in.subscribe()
    }

    /// Record a fresh sign-in: persist the credential, then hold both values.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be persisted; the in-memory
    /// session is still established so the current process works.
    pub fn establish(&self, user: User, credential: SecretString) -> Result<(), SessionError> {
        let saved = self.inner.store.save(&credential);
        {
            let mut state = self.inner.state.write();
            state.user = Some(user);
            state.credential = Some(credential);
        }
        self.inner.signed_in.send_replace(true);
        saved
    }

    /// Replace the cached user (profile load or update).
    pub fn set_user(&self, user: User) {
        self.inner.state.write().user = Some(user);
    }

    /// Drop both user and credential, in memory and in storage.
    ///
    /// Memory is cleared even if the store fails, so the process is logged
    /// out regardless.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored credential could not be removed.
    pub fn clear(&self) -> Result<(), SessionError> {
        {
            let mut state = self.inner.state.write();
            state.user = None;
            state.credential = None;
        }
        self.inner.signed_in.send_replace(false);
        let result = self.inner.store.clear();
        if let Err(e) = &result {
            warn!(error = %e, "Failed to remove stored credential");
        }
        result
    }
}
