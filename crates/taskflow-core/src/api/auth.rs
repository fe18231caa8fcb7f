//! Account endpoints. None of them carry a bearer token.

use reqwest::Method;
use taskflow_types::{LoginRequest, Receipt, RegisterRequest, Session, VerifyOtpRequest};

use super::{ApiClient, ApiRequest, decode, decode_receipt};
use crate::error::ApiError;
use crate::store::CredentialStore;
use crate::validation::{self, Registration};

impl<S: CredentialStore> ApiClient<S> {
    /// Starts sign-up; the server emails a one-time code.
    ///
    /// Does not establish a session.
    ///
    /// # Errors
    /// [`ApiError::Validation`] before any request if the form is invalid,
    /// otherwise the request error.
    pub async fn register(&self, registration: &Registration) -> Result<Receipt, ApiError> {
        registration.validate()?;

        let request = ApiRequest::new(Method::POST, "/auth/register").json(&RegisterRequest {
            name: registration.name.trim(),
            email: registration.email.trim(),
            password: &registration.password,
        })?;
        let response = self.send_public(&request).await?;
        decode_receipt(response).await
    }

    /// Confirms sign-up with the emailed code and returns the new session.
    ///
    /// The caller hands the session to [`crate::session::SessionState`].
    ///
    /// # Errors
    /// [`ApiError::Validation`] for a malformed code, [`ApiError::Auth`] if the
    /// server rejects it, otherwise the request error.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<Session, ApiError> {
        let otp = otp.trim();
        validation::validate_email(email)?;
        validation::validate_otp(otp)?;

        let request = ApiRequest::new(Method::POST, "/auth/verify").json(&VerifyOtpRequest {
            email: email.trim(),
            otp,
        })?;
        let response = self.send_public(&request).await?;
        decode(response).await
    }

    /// Exchanges email and password for a session.
    ///
    /// # Errors
    /// [`ApiError::Validation`] if either field is blank, [`ApiError::Auth`]
    /// for wrong credentials, otherwise the request error.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        validation::validate_login(email, password)?;

        let request = ApiRequest::new(Method::POST, "/auth/login").json(&LoginRequest {
            email: email.trim(),
            password,
        })?;
        let response = self.send_public(&request).await?;
        decode(response).await
    }
}
