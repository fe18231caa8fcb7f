//! Application facade: the flows the UI drives.
//!
//! Owns the API client and the session state that shares its credential
//! store, so login and logout keep memory and disk in step, and an
//! unrecoverable auth failure on any task call ends the session.

use std::sync::Arc;

use anyhow::Result;
use taskflow_types::{NewTask, Receipt, Session, Task};

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::{ApiError, ValidationError};
use crate::session::{SessionState, SessionStatus};
use crate::store::{CredentialStore, FileCredentialStore};
use crate::validation::{self, Registration};

pub struct Taskflow<S> {
    client: ApiClient<S>,
    session: SessionState<S>,
}

impl Taskflow<FileCredentialStore> {
    /// Facade over the credential file in `$TASKFLOW_HOME`.
    ///
    /// # Errors
    /// Returns an error if the client cannot be built from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(FileCredentialStore::at_default_path());
        Ok(Self::new(ApiClient::from_config(config, store)?))
    }
}

impl<S: CredentialStore> Taskflow<S> {
    pub fn new(client: ApiClient<S>) -> Self {
        let session = SessionState::new(Arc::clone(client.store()));
        Self { client, session }
    }

    /// Loads the persisted session; call once at startup.
    pub async fn start(&self) -> SessionStatus {
        self.session.initialize().await
    }

    pub fn client(&self) -> &ApiClient<S> {
        &self.client
    }

    pub fn session(&self) -> &SessionState<S> {
        &self.session
    }

    /// Registers and remembers the email until the code is confirmed.
    ///
    /// # Errors
    /// Validation, request or storage failure.
    pub async fn sign_up(&self, registration: &Registration) -> Result<Receipt, ApiError> {
        let receipt = self.client.register(registration).await?;
        self.client
            .store()
            .set_pending_signup_email(Some(registration.email.trim()))
            .await?;
        Ok(receipt)
    }

    /// # Errors
    /// Storage failure.
    pub async fn pending_signup_email(&self) -> Result<Option<String>, ApiError> {
        Ok(self.client.store().pending_signup_email().await?)
    }

    /// Verifies the pending sign-up and logs the new user in.
    ///
    /// # Errors
    /// [`ValidationError::NoPendingSignup`] without a prior [`Self::sign_up`],
    /// otherwise validation, request or storage failure.
    pub async fn confirm_sign_up(&self, otp: &str) -> Result<Session, ApiError> {
        validation::validate_otp(otp.trim())?;
        let email = self
            .pending_signup_email()
            .await?
            .ok_or(ValidationError::NoPendingSignup)?;

        let session = self.client.verify_otp(&email, otp).await?;
        self.establish(&session).await?;
        self.client.store().set_pending_signup_email(None).await?;
        Ok(session)
    }

    /// # Errors
    /// Validation, request or storage failure.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let session = self.client.login(email, password).await?;
        self.establish(&session).await?;
        Ok(session)
    }

    /// # Errors
    /// Storage failure; the session is then still in place.
    pub async fn sign_out(&self) -> Result<(), ApiError> {
        Ok(self.session.logout_user().await?)
    }

    /// # Errors
    /// Request failure; [`ApiError::Auth`] also ends the session.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let result = self.client.list_tasks().await;
        self.settle(result).await
    }

    /// # Errors
    /// Validation or request failure; [`ApiError::Auth`] also ends the session.
    pub async fn add_task(&self, task: NewTask) -> Result<Task, ApiError> {
        let result = self.client.add_task(task).await;
        self.settle(result).await
    }

    /// # Errors
    /// Request failure; [`ApiError::Auth`] also ends the session.
    pub async fn toggle_task(&self, id: &str) -> Result<Task, ApiError> {
        let result = self.client.toggle_task_status(id).await;
        self.settle(result).await
    }

    /// # Errors
    /// Request failure; [`ApiError::Auth`] also ends the session.
    pub async fn delete_task(&self, id: &str) -> Result<Receipt, ApiError> {
        let result = self.client.delete_task(id).await;
        self.settle(result).await
    }

    async fn establish(&self, session: &Session) -> Result<(), ApiError> {
        self.session
            .login_user(
                session.user.clone(),
                session.access_token.clone(),
                session.refresh_token.clone(),
            )
            .await?;
        Ok(())
    }

    /// Keeps the session in line with how a task call ended.
    async fn settle<T>(
        &self,
        result: Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        match &result {
            Ok(_) => self.session.sync_from_store().await,
            Err(err) if err.is_auth() => {
                tracing::warn!(error = %err, "Session expired, logging out");
                if let Err(e) = self.session.logout_user().await {
                    tracing::warn!(error = %e, "Failed to clear expired session");
                }
            }
            Err(_) => {}
        }
        result
    }
}
