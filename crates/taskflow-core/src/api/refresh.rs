//! Single-flight access token refresh.
//!
//! Concurrent 401s share one refresh call. The in-flight call is a
//! [`Shared`] future kept in a slot: the first caller creates it, later
//! callers clone and await it, and whoever observes completion empties the
//! slot. Because any clone drives the shared future, dropping one waiter
//! does not cancel the refresh for the others.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use taskflow_types::{RefreshRequest, RefreshResponse};
use tokio::sync::Mutex;

use super::mask_token;
use crate::error::{ApiError, server_message};
use crate::store::CredentialStore;

pub(crate) const REFRESH_PATH: &str = "/auth/refresh";

type RefreshFuture = Shared<BoxFuture<'static, Result<String, ApiError>>>;

pub(crate) struct RefreshCoordinator<S> {
    http: reqwest::Client,
    url: String,
    store: Arc<S>,
    in_flight: Mutex<Option<RefreshFuture>>,
}

impl<S: CredentialStore> RefreshCoordinator<S> {
    pub(crate) fn new(http: reqwest::Client, base_url: &str, store: Arc<S>) -> Self {
        Self {
            http,
            url: format!("{base_url}{REFRESH_PATH}"),
            store,
            in_flight: Mutex::new(None),
        }
    }

    /// Returns a fresh access token to replace `stale`.
    ///
    /// Joins the in-flight refresh if there is one. If the store already
    /// holds a token different from `stale`, another request refreshed in
    /// the meantime and that token is returned without a network call.
    pub(crate) async fn refresh(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let shared = {
            let mut slot = self.in_flight.lock().await;
            if let Some(pending) = slot.as_ref() {
                tracing::debug!("Joining in-flight token refresh");
                pending.clone()
            } else {
                if let Some(current) = self.store.access_token().await?
                    && Some(current.as_str()) != stale
                {
                    tracing::debug!("Access token already refreshed");
                    return Ok(current);
                }
                let fut = refresh_tokens(self.http.clone(), self.url.clone(), Arc::clone(&self.store))
                    .boxed()
                    .shared();
                *slot = Some(fut.clone());
                fut
            }
        };

        let outcome = shared.clone().await;

        let mut slot = self.in_flight.lock().await;
        if slot.as_ref().is_some_and(|pending| pending.ptr_eq(&shared)) {
            *slot = None;
        }
        outcome
    }
}

async fn refresh_tokens<S: CredentialStore>(
    http: reqwest::Client,
    url: String,
    store: Arc<S>,
) -> Result<String, ApiError> {
    let Some(refresh_token) = store.refresh_token().await? else {
        return Err(ApiError::Auth(
            "no refresh token stored; please log in again".to_string(),
        ));
    };

    tracing::debug!(refresh_token = %mask_token(&refresh_token), "Refreshing access token");
    let response = http
        .post(&url)
        .json(&RefreshRequest {
            refresh_token: &refresh_token,
        })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = server_message(status, &body);
        tracing::warn!(status = status.as_u16(), "Token refresh rejected");
        return Err(if status.is_client_error() {
            ApiError::Auth(format!("token refresh rejected: {message}"))
        } else {
            ApiError::Server {
                status: status.as_u16(),
                message,
            }
        });
    }

    let tokens: RefreshResponse = response.json().await?;
    let rotated = tokens.refresh_token.is_some();
    if !store
        .update_tokens(&tokens.access_token, tokens.refresh_token.as_deref())
        .await?
    {
        return Err(ApiError::Auth(
            "session ended during token refresh".to_string(),
        ));
    }

    tracing::info!(
        access_token = %mask_token(&tokens.access_token),
        rotated,
        "Access token refreshed"
    );
    Ok(tokens.access_token)
}
