//! REST client for the marketplace backend.
//!
//! The backend owns persistence, auth validation and order transitions; this
//! module only attaches the bearer token, moves JSON and turns failures into
//! a uniform `ApiError`.

pub mod catalog;
pub mod orders;
pub mod storage;

pub use catalog::{CatalogApi, ImageScope, NewImage};
pub use orders::OrdersApi;
pub use storage::{HttpStorage, LocalFile, ObjectStorage};

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use crate::config::ClientConfig;

/// Shown when the server gives no usable message.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{}", .message.as_deref().unwrap_or(GENERIC_FAILURE))]
    Server { status: u16, message: Option<String> },

    /// 304 from a server we never sent validators to; the data must be refetched.
    #[error("Cached response expired; reload and try again")]
    NotModified,

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Record {0} has not been saved yet")]
    Unsaved(String),
}

impl ApiError {
    /// Text safe to put in front of a user: the server's own message when it
    /// sent one, otherwise the generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { message: Some(m), .. } => m.clone(),
            Self::NotModified => self.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Source of the bearer token attached to every request.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed token, mostly for scripts and tests.
pub struct StaticToken(pub Option<String>);

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> { self.0.clone() }
}

/// One page of a list endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Paginated<T> {
    pub fn total_pages(&self) -> u32 { total_pages(self.total, self.limit) }
}

pub fn total_pages(total: u64, limit: u32) -> u32 {
    if limit == 0 { return 0; }
    total.div_ceil(limit as u64) as u32
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    cache_retry_delay: Duration,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("marketplace-client/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, base_url: config.api_base_url.trim_end_matches('/').to_string(), tokens, cache_retry_delay: config.cache_retry_delay })
    }

    pub fn base_url(&self) -> &str { &self.base_url }
    pub fn http(&self) -> &reqwest::Client { &self.http }
    pub fn tokens(&self) -> Arc<dyn TokenProvider> { self.tokens.clone() }

    pub fn is_authenticated(&self) -> bool { self.tokens.bearer_token().is_some() }

    /// Mutating calls check this before touching the network.
    pub fn require_auth(&self) -> crate::Result<()> {
        if self.is_authenticated() { Ok(()) } else { Err(crate::StoreError::NotAuthenticated) }
    }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let url = self.url(path);
        self.execute(|| self.http.get(&url).query(query)).await
    }

    pub(crate) async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        self.execute(|| self.http.request(method.clone(), &url).json(body)).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        self.execute(|| self.http.delete(&url)).await
    }

    /// Runs a request; a 304 is retried exactly once after a short delay.
    async fn execute<T, F>(&self, build: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        match self.execute_once(build()).await {
            Err(ApiError::NotModified) => {
                warn!(delay_ms = self.cache_retry_delay.as_millis() as u64, "Server answered 304, retrying once");
                tokio::time::sleep(self.cache_retry_delay).await;
                self.execute_once(build()).await
            }
            other => other,
        }
    }

    async fn execute_once<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let request = match self.tokens.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "API response");

        if status == StatusCode::NOT_MODIFIED { return Err(ApiError::NotModified); }
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(ApiError::Server { status: status.as_u16(), message: extract_message(&bytes) });
        }
        if bytes.is_empty() {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorField { Text(String), Nested { message: String } }

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<ErrorField>,
}

/// Pulls a human message out of an error payload: `{"message": ..}`,
/// `{"error": ".."}` or `{"error": {"message": ..}}`.
pub(crate) fn extract_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    let message = parsed.message.or(match parsed.error {
        Some(ErrorField::Text(t)) => Some(t),
        Some(ErrorField::Nested { message }) => Some(message),
        None => None,
    })?;
    let message = message.trim().to_string();
    (!message.is_empty()).then_some(message)
}
