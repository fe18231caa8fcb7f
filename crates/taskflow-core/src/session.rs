//! Who is logged in.
//!
//! `SessionState` is created once per process, handed by reference to the
//! components that need it, and populated from the credential store by
//! [`SessionState::initialize`]. Until that completes the status is
//! [`SessionStatus::Unknown`], which callers must not confuse with "logged
//! out".

use std::sync::Arc;

use taskflow_types::{Session, User};
use tokio::sync::{Mutex, OnceCell, watch};

use crate::error::StorageError;
use crate::store::CredentialStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Initial load from the store has not finished.
    Unknown,
    Anonymous,
    Authenticated(Session),
}

impl SessionStatus {
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.session().map(|s| &s.user)
    }
}

pub struct SessionState<S> {
    store: Arc<S>,
    status: watch::Sender<SessionStatus>,
    loaded: OnceCell<()>,
    // Keeps login/logout from interleaving their memory and disk updates.
    write_lock: Mutex<()>,
}

impl<S: CredentialStore> SessionState<S> {
    pub fn new(store: Arc<S>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Unknown);
        Self {
            store,
            status,
            loaded: OnceCell::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Loads the persisted session. Only the first call reads the store.
    ///
    /// An unreadable store resolves to `Anonymous`. Holds the write lock so a
    /// concurrent login or logout is either seen by the load or applied after.
    pub async fn initialize(&self) -> SessionStatus {
        self.loaded
            .get_or_init(|| async {
                let _guard = self.write_lock.lock().await;
                let status = match self.store.load().await {
                    Ok(Some(session)) => SessionStatus::Authenticated(session),
                    Ok(None) => SessionStatus::Anonymous,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to load stored session");
                        SessionStatus::Anonymous
                    }
                };
                self.status.send_replace(status);
            })
            .await;
        self.status()
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn current(&self) -> Option<Session> {
        self.status.borrow().session().cloned()
    }

    /// Receives every status change, starting with the current one.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Waits until the initial load has resolved the status.
    pub async fn wait_until_known(&self) -> SessionStatus {
        let mut rx = self.subscribe();
        match rx.wait_for(SessionStatus::is_known).await {
            Ok(status) => status.clone(),
            // The sender lives in `self`, so it cannot be dropped while we borrow it.
            Err(_) => self.status(),
        }
    }

    /// Sets the in-memory session, then persists it.
    ///
    /// # Errors
    /// On a storage failure the previous in-memory state is restored and the
    /// error returned.
    pub async fn login_user(
        &self,
        user: User,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<(), StorageError> {
        let session = Session::new(user, access_token, refresh_token);
        let _guard = self.write_lock.lock().await;

        let previous = self
            .status
            .send_replace(SessionStatus::Authenticated(session.clone()));
        if let Err(e) = self.store.save(&session).await {
            self.status.send_replace(previous);
            return Err(e);
        }
        tracing::info!(user = %session.user.email, "Logged in");
        Ok(())
    }

    /// Picks up tokens a refresh wrote to the store since the last login.
    pub async fn sync_from_store(&self) {
        let _guard = self.write_lock.lock().await;
        if self.status.borrow().session().is_none() {
            return;
        }
        match self.store.load().await {
            Ok(Some(stored)) => {
                self.status.send_if_modified(|status| match status {
                    SessionStatus::Authenticated(current) if *current != stored => {
                        *current = stored;
                        true
                    }
                    _ => false,
                });
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to re-read stored session"),
        }
    }

    /// Clears the in-memory session, then the store.
    ///
    /// # Errors
    /// On a storage failure the previous in-memory state is restored and the
    /// error returned.
    pub async fn logout_user(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let previous = self.status.send_replace(SessionStatus::Anonymous);
        if let Err(e) = self.store.clear().await {
            self.status.send_replace(previous);
            return Err(e);
        }
        if previous.session().is_some() {
            tracing::info!("Logged out");
        }
        Ok(())
    }
}
