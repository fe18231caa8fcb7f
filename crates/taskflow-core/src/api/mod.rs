//! HTTP client core.
//!
//! Every authenticated request reads the access token from the credential
//! store, sends it as `Authorization: Bearer <token>`, and on a 401 refreshes
//! the token (single-flight, see [`refresh`]) and replays the request once.
//! Callers never see a 401 that a refresh could have fixed.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use taskflow_types::Receipt;
use url::Url;

use crate::config::Config;
use crate::error::{ApiError, server_message};
use crate::store::CredentialStore;

mod auth;
mod refresh;
mod tasks;

use refresh::RefreshCoordinator;

/// Standard User-Agent header for Taskflow API requests.
pub const USER_AGENT: &str = concat!("taskflow/", env!("CARGO_PKG_VERSION"));

/// A request that received 401 is replayed at most this many times.
const MAX_AUTH_REPLAYS: u32 = 1;

/// Returns a masked version of a token for logs and display.
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 12 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}

/// Method, path and body of one logical request.
///
/// Kept separately from `reqwest::RequestBuilder` so the request can be
/// rebuilt with a new token on replay.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    method: Method,
    path: String,
    /// Raw path segments appended after `path`, percent-encoded on send.
    segments: Vec<String>,
    body: Option<Value>,
}

impl ApiRequest {
    pub(crate) fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            segments: Vec::new(),
            body: None,
        }
    }

    /// Appends one path segment; `/`, spaces and the like are escaped.
    pub(crate) fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub(crate) fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value =
            serde_json::to_value(body).map_err(|e| ApiError::Decode(format!("encode body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// Authenticated client for the Taskflow API.
pub struct ApiClient<S> {
    base_url: String,
    http: reqwest::Client,
    store: Arc<S>,
    refresher: RefreshCoordinator<S>,
}

impl<S: CredentialStore> ApiClient<S> {
    /// Creates a client with a default HTTP client.
    pub fn new(base_url: impl Into<String>, store: Arc<S>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::new();
        let refresher = RefreshCoordinator::new(http.clone(), &base_url, Arc::clone(&store));
        Self {
            base_url,
            http,
            store,
            refresher,
        }
    }

    /// Creates a client from configuration (base URL, timeout, User-Agent).
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &Config, store: Arc<S>) -> Result<Self> {
        let base_url = config.effective_base_url()?;
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self::new(base_url, store).with_http_client(http))
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.refresher = RefreshCoordinator::new(http.clone(), &self.base_url, Arc::clone(&self.store));
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn url(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.base_url, request.path);
        let mut url =
            Url::parse(&raw).map_err(|e| ApiError::Network(format!("invalid URL {raw}: {e}")))?;
        if !request.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|()| ApiError::Network(format!("URL {raw} cannot take a path")))?
                .extend(&request.segments);
        }
        Ok(url)
    }

    /// Sends a request without credentials (login, registration).
    ///
    /// A 401 here means the submitted credentials were rejected.
    pub(crate) async fn send_public(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let response = self.dispatch(request, None).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Auth(server_message(StatusCode::UNAUTHORIZED, &body)));
        }
        Self::ensure_success(response).await
    }

    /// Sends a request with the stored bearer token, refreshing on 401.
    pub(crate) async fn send_authorized(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let mut token = self.store.access_token().await?;
        let mut attempt = 0;

        loop {
            let response = self.dispatch(request, token.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Self::ensure_success(response).await;
            }

            if attempt >= MAX_AUTH_REPLAYS {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    "Request still unauthorized after token refresh"
                );
                return Err(ApiError::Auth(format!(
                    "session expired: {}",
                    server_message(StatusCode::UNAUTHORIZED, &body)
                )));
            }
            attempt += 1;

            tracing::debug!(
                method = %request.method,
                path = %request.path,
                attempt,
                "Unauthorized, refreshing access token"
            );
            token = Some(self.refresher.refresh(token.as_deref()).await?);
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = self.url(request)?;
        let mut builder = self.http.request(request.method.clone(), url.clone());
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        tracing::debug!(
            method = %request.method,
            path = url.path(),
            status = response.status().as_u16(),
            "API response"
        );
        Ok(response)
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response.json::<T>().await.map_err(Into::into)
}

/// Accepts an empty body, JSON with an optional `message`, or plain text.
pub(crate) async fn decode_receipt(response: Response) -> Result<Receipt, ApiError> {
    let body = response.text().await?;
    let body = body.trim();
    if body.is_empty() {
        return Ok(Receipt::default());
    }
    Ok(serde_json::from_str(body).unwrap_or_else(|_| Receipt {
        message: Some(body.to_string()),
    }))
}
