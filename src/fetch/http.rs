//! HTTP client shared by authentication and fetching.
//!
//! All requests go through one `reqwest::Client` whose cookie jar is the
//! process-wide [`SessionHandle`]. When a fresh token is held it is attached
//! as headers on every request.

use crate::auth::SessionHandle;
use crate::backoff::{Backoff, BackoffConfig};
use crate::config::PacerConfig;
use bytes::Bytes;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Too many redirects")]
    TooManyRedirects,
}

impl HttpError {
    /// Errors that may go away on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, HttpError::Timeout | HttpError::Connect(_))
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_connect() {
            HttpError::Connect(e.to_string())
        } else if e.is_redirect() {
            HttpError::TooManyRedirects
        } else if e.is_builder() {
            HttpError::InvalidUrl(e.to_string())
        } else {
            HttpError::RequestFailed(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub user_agent: String,
    pub token_ttl: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::from_pacer(&PacerConfig::default())
    }
}

impl HttpConfig {
    pub fn from_pacer(pacer: &PacerConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(pacer.connect_timeout_secs),
            request_timeout: Duration::from_secs(pacer.request_timeout_secs),
            max_retries: pacer.max_fetch_retries.max(1),
            user_agent: pacer.user_agent.clone(),
            token_ttl: pacer.token_ttl(),
        }
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: StatusCode,
    /// Url after redirects
    pub final_url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl PageResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone)]
pub struct PacerHttp {
    client: Client,
    session: SessionHandle,
    config: HttpConfig,
    backoff: BackoffConfig,
}

impl PacerHttp {
    pub fn new(config: HttpConfig, backoff: BackoffConfig, session: SessionHandle) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .cookie_provider(session.jar())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| HttpError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            session,
            config,
            backoff,
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub async fn get(&self, url: &str) -> Result<PageResponse> {
        self.get_with_headers(url, &[]).await
    }

    pub async fn get_with_headers(&self, url: &str, headers: &[(&str, String)]) -> Result<PageResponse> {
        let url = parse_url(url)?;
        self.send_with_retry(|client| with_headers(client.get(url.clone()), headers))
            .await
    }

    pub async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
        headers: &[(&str, String)],
    ) -> Result<PageResponse> {
        let url = parse_url(url)?;
        self.send_with_retry(|client| with_headers(client.post(url.clone()).form(fields), headers))
            .await
    }

    pub async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<PageResponse> {
        let url = parse_url(url)?;
        self.send_with_retry(|client| client.post(url.clone()).json(body))
            .await
    }

    /// Retries transport failures and 5xx responses; other statuses are
    /// returned to the caller as-is.
    async fn send_with_retry<F>(&self, build: F) -> Result<PageResponse>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut backoff = Backoff::new(self.backoff.clone());
        let mut attempts = 0;

        loop {
            attempts += 1;
            let request = self.attach_token(build(&self.client));

            match self.send_once(request).await {
                Ok(page) if page.status.is_server_error() && attempts < self.config.max_retries => {
                    let delay = backoff.wait().await;
                    warn!(url = %page.final_url, status = page.status.as_u16(), attempts, ?delay, "Server error, retrying");
                }
                Ok(page) => {
                    if attempts > 1 {
                        debug!(url = %page.final_url, attempts, "Request succeeded after retry");
                    }
                    return Ok(page);
                }
                Err(e) if e.is_transient() && attempts < self.config.max_retries => {
                    let delay = backoff.wait().await;
                    warn!(attempts, error = %e, ?delay, "Request failed, retrying");
                }
                Err(e) => {
                    warn!(attempts, error = %e, "Request failed");
                    return Err(e);
                }
            }
        }
    }

    async fn send_once(&self, request: RequestBuilder) -> Result<PageResponse> {
        let response = request.send().await?;
        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        debug!(url = %final_url, status = status.as_u16(), size = body.len(), "Response received");

        Ok(PageResponse {
            status,
            final_url,
            headers,
            body,
        })
    }

    fn attach_token(&self, request: RequestBuilder) -> RequestBuilder {
        let ttl = chrono::Duration::from_std(self.config.token_ttl).unwrap_or(chrono::Duration::zero());
        let Some(token) = self.session.fresh_token(ttl, Utc::now()) else {
            return request;
        };
        let Ok(value) = HeaderValue::from_str(&token) else {
            return request;
        };
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"));

        let mut request = request
            .header("nextGenCSO", value.clone())
            .header("X-NextGenCSO", value);
        if let Ok(bearer) = bearer {
            request = request.header(AUTHORIZATION, bearer);
        }
        request
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| HttpError::InvalidUrl(format!("{url}: {e}")))
}

fn with_headers(mut request: RequestBuilder, headers: &[(&str, String)]) -> RequestBuilder {
    for (name, value) in headers {
        request = request.header(*name, value);
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::HeaderMap as AxumHeaders;
    use axum::routing::get;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            initial_secs: 0.0,
            max_secs: 0.0,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 3);
        assert!(config.user_agent.starts_with("courtfetch/"));
        assert_eq!(config.token_ttl, Duration::from_secs(1800));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/flaky",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::SERVICE_UNAVAILABLE, "busy")
                    } else {
                        (StatusCode::OK, "ok")
                    }
                }
            }),
        );
        let base = spawn(router).await;

        let http = PacerHttp::new(HttpConfig::default(), fast_backoff(), SessionHandle::default()).unwrap();
        let page = http.get(&format!("{base}/flaky")).await.unwrap();
        assert_eq!(page.status, StatusCode::OK);
        assert_eq!(page.text(), "ok");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fresh_token_is_attached() {
        let router = Router::new().route(
            "/echo",
            get(|headers: AxumHeaders| async move {
                headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string()
            }),
        );
        let base = spawn(router).await;

        let session = SessionHandle::default();
        let http = PacerHttp::new(HttpConfig::default(), fast_backoff(), session.clone()).unwrap();
        assert_eq!(http.get(&format!("{base}/echo")).await.unwrap().text(), "none");

        session.set_token("abc".into(), Utc::now());
        assert_eq!(http.get(&format!("{base}/echo")).await.unwrap().text(), "Bearer abc");

        session.set_token("abc".into(), Utc::now() - chrono::Duration::hours(1));
        assert_eq!(http.get(&format!("{base}/echo")).await.unwrap().text(), "none");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let mut config = HttpConfig::default();
        config.max_retries = 1;
        let http = PacerHttp::new(config, fast_backoff(), SessionHandle::default()).unwrap();
        let err = http.get("http://127.0.0.1:1/").await.unwrap_err();
        assert!(err.is_transient(), "{err:?}");
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let http = PacerHttp::new(HttpConfig::default(), fast_backoff(), SessionHandle::default()).unwrap();
        assert!(matches!(http.get("not a url").await, Err(HttpError::InvalidUrl(_))));
    }
}
