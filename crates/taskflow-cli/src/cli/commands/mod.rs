//! CLI command handlers.

use taskflow_core::ApiError;

pub mod auth;
pub mod config;
pub mod tasks;

/// Adds a re-login hint to errors that ended the session.
pub(crate) fn explain(err: ApiError) -> anyhow::Error {
    if err.is_auth() {
        anyhow::Error::new(err).context("Session expired, please log in again")
    } else {
        err.into()
    }
}
