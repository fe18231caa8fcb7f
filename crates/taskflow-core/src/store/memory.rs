use std::sync::{Mutex, MutexGuard, PoisonError};

use taskflow_types::Session;

use super::{CredentialRecord, CredentialStore};
use crate::error::StorageError;

/// Process-local store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    record: Mutex<CredentialRecord>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a session.
    pub fn with_session(session: Session) -> Self {
        Self {
            record: Mutex::new(CredentialRecord {
                session: Some(session),
                pending_signup_email: None,
            }),
        }
    }

    fn record(&self) -> MutexGuard<'_, CredentialRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Session>, StorageError> {
        Ok(self.record().session.clone())
    }

    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        self.record().session = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.record().session = None;
        Ok(())
    }

    async fn update_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<bool, StorageError> {
        Ok(self.record().update_tokens(access_token, refresh_token))
    }

    async fn pending_signup_email(&self) -> Result<Option<String>, StorageError> {
        Ok(self.record().pending_signup_email.clone())
    }

    async fn set_pending_signup_email(&self, email: Option<&str>) -> Result<(), StorageError> {
        self.record().pending_signup_email = email.map(str::to_string);
        Ok(())
    }
}
