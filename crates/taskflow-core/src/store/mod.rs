//! Credential storage.
//!
//! The store is the single shared source of the access token. Nothing else
//! keeps a private copy across an `.await`, so a token replaced by a
//! concurrent refresh is never reused.

use std::future::Future;

use serde::{Deserialize, Serialize};
use taskflow_types::Session;

use crate::error::StorageError;

mod file;
mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

/// Durable home of the session triple and the pending signup email.
///
/// `save` and `clear` are all-or-nothing: either every session field changes
/// or none does. On error the caller must assume nothing changed.
pub trait CredentialStore: Send + Sync + 'static {
    /// Last saved session, `None` when absent or unreadable.
    fn load(&self) -> impl Future<Output = Result<Option<Session>, StorageError>> + Send;

    fn save(&self, session: &Session) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn clear(&self) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Replaces the access token (and the refresh token when rotated).
    ///
    /// Returns `false` without writing when no session is stored.
    fn update_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> impl Future<Output = Result<bool, StorageError>> + Send;

    fn pending_signup_email(
        &self,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    fn set_pending_signup_email(
        &self,
        email: Option<&str>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn access_token(&self) -> impl Future<Output = Result<Option<String>, StorageError>> + Send {
        async move { Ok(self.load().await?.map(|s| s.access_token)) }
    }

    fn refresh_token(&self) -> impl Future<Output = Result<Option<String>, StorageError>> + Send {
        async move { Ok(self.load().await?.map(|s| s.refresh_token)) }
    }
}

/// On-disk / in-memory document shared by both stores.
///
/// Nesting the triple in one `Option<Session>` makes a half-written session
/// unrepresentable: a record missing any of the three fields fails to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_signup_email: Option<String>,
}

impl CredentialRecord {
    fn update_tokens(&mut self, access_token: &str, refresh_token: Option<&str>) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.access_token = access_token.to_string();
        if let Some(refresh) = refresh_token {
            session.refresh_token = refresh.to_string();
        }
        true
    }
}
