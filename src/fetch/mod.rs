//! HTTP transport.
//!
//! Thin wrapper over a configured reqwest client. Each source owns one
//! [`HttpClient`] built at construction with its tier's timeout and
//! default headers; the wrapper hands back status + body and maps
//! transport faults into a small taxonomy the sources can translate into
//! their own failure modes.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Errors that can occur during a fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A completed HTTP exchange. Non-2xx statuses are returned here, not as
/// errors; callers decide what a 404 means for their tier.
#[derive(Debug)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Configuration for an [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout for this tier.
    pub timeout: Duration,

    /// User agent sent with every request.
    pub user_agent: String,

    /// Bearer token, for sources that require one.
    pub bearer_token: Option<String>,

    /// Whether to follow redirects (the community site redirects tag URLs).
    pub follow_redirects: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: concat!("warlog-agent/", env!("CARGO_PKG_VERSION")).to_string(),
            bearer_token: None,
            follow_redirects: false,
        }
    }
}

/// HTTP client bound to one source's transport settings.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build a client with the given configuration.
    pub fn new(config: HttpConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("warlog-agent")),
        );
        if let Some(token) = &config.bearer_token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        let redirect = if config.follow_redirects {
            Policy::limited(5)
        } else {
            Policy::none()
        };

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .redirect(redirect)
            .build()?;

        Ok(Self { client })
    }

    /// Issue a single GET and read the body as text. One attempt, no
    /// retries; retry policy lives with the caller's fallback chain.
    pub async fn get_text(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(FetchResponse { status, body })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(e)
    }
}
