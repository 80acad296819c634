//! # Target Client
//!
//! Timed HTTP access to the service under test. Every call produces a
//! well-formed [`RequestOutcome`]: transport failures (refused connections,
//! timeouts, DNS errors, broken bodies) are folded into a failed outcome with
//! status code 0 and an error description instead of being returned as errors.
//! This lets every measurement phase continue with degraded data.
//!
//! Elapsed time is taken immediately before the request is issued and
//! immediately after the body has been read or the request has failed, so it
//! always includes connection setup.

use reqwest::Url;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

/// Classified transport-level failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid target url: {0}")]
    InvalidUrl(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Other(String),
}

impl TransportError {
    fn classify(err: &reqwest::Error, timeout: Duration) -> Self {
        let detail = error_chain(err);
        if err.is_timeout() {
            TransportError::Timeout(timeout)
        } else if err.is_connect() {
            TransportError::Connect(detail)
        } else if err.is_builder() {
            TransportError::InvalidUrl(detail)
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(detail)
        } else {
            TransportError::Other(detail)
        }
    }
}

/// Flatten an error and its sources into one line.
///
/// reqwest's top-level message only names the URL; the useful part
/// ("Connection refused", "dns error") lives in the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Base URL of the service under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    base: Url,
}

impl Target {
    /// Parse and validate a base URL (http or https only)
    pub fn parse(base: &str) -> Result<Self, TransportError> {
        let url = Url::parse(base.trim())
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", base, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(TransportError::InvalidUrl(format!(
                    "unsupported scheme '{}' in {}",
                    other, base
                )))
            }
        }

        if url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(base.to_string()));
        }

        // Endpoint paths are appended to the base, so it must end at the path.
        if url.query().is_some() || url.fragment().is_some() {
            return Err(TransportError::InvalidUrl(format!(
                "query or fragment not allowed in base url {}",
                base
            )));
        }

        Ok(Self { base: url })
    }

    /// Full URL for an endpoint path
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base.as_str().trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base.as_str().trim_end_matches('/'))
    }
}

/// Result of one HTTP call
///
/// Created once per issued request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    /// HTTP status, or 0 when no response was received
    pub status_code: u16,
    /// Wall-clock cost of the call, including connection setup
    pub elapsed: Duration,
    /// True only for a 200 response
    pub success: bool,
    /// Transport failure description
    pub error: Option<String>,
}

impl RequestOutcome {
    /// Outcome of a request that produced an HTTP response
    pub fn from_status(status_code: u16, elapsed: Duration) -> Self {
        Self {
            status_code,
            elapsed,
            success: status_code == 200,
            error: None,
        }
    }

    /// Outcome of a request that never produced a usable response
    pub fn failed(elapsed: Duration, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error = "unknown transport failure".to_string();
        }
        Self {
            status_code: 0,
            elapsed,
            success: false,
            error: Some(error),
        }
    }
}

/// A request outcome together with the response body, if any
#[derive(Debug, Clone)]
pub struct TargetResponse {
    pub outcome: RequestOutcome,
    body: Option<Vec<u8>>,
}

impl TargetResponse {
    fn completed(status_code: u16, elapsed: Duration, body: Vec<u8>) -> Self {
        Self {
            outcome: RequestOutcome::from_status(status_code, elapsed),
            body: Some(body),
        }
    }

    fn failed(elapsed: Duration, error: &TransportError) -> Self {
        Self {
            outcome: RequestOutcome::failed(elapsed, error.to_string()),
            body: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.success
    }

    /// Parsed JSON body of a successful response.
    ///
    /// Returns `None` for failed requests, non-200 responses and bodies that
    /// are not valid JSON.
    pub fn json(&self) -> Option<Value> {
        if !self.outcome.success {
            return None;
        }
        let body = self.body.as_deref()?;
        match serde_json::from_slice(body) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Response body is not valid JSON: {}", e);
                None
            }
        }
    }
}

/// HTTP client bound to one target
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct TargetClient {
    http: reqwest::Client,
    target: Target,
}

impl TargetClient {
    pub fn new(target: Target) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("workload-bench/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(error_chain(&e)))?;

        Ok(Self { http, target })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Issue a single timed GET against `path`.
    ///
    /// The timeout covers the whole exchange, from connecting until the body
    /// has been read.
    pub async fn get(&self, path: &str, timeout: Duration) -> TargetResponse {
        let url = self.target.url_for(path);

        let started = Instant::now();
        let result = self.fetch(&url, timeout).await;
        let elapsed = started.elapsed();

        match result {
            Ok((status_code, body)) => {
                trace!("GET {} -> {} in {:?}", url, status_code, elapsed);
                TargetResponse::completed(status_code, elapsed, body)
            }
            Err(err) => {
                debug!("GET {} failed after {:?}: {}", url, elapsed, err);
                TargetResponse::failed(elapsed, &err)
            }
        }
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<(u16, Vec<u8>), TransportError> {
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError::classify(&e, timeout))?;

        let status_code = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::classify(&e, timeout))?;

        Ok((status_code, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> TargetClient {
        TargetClient::new(Target::parse(&server.uri()).unwrap()).unwrap()
    }

    #[test]
    fn test_target_url_joining() {
        let target = Target::parse("http://localhost:5000").unwrap();
        assert_eq!(target.url_for("/health"), "http://localhost:5000/health");
        assert_eq!(target.url_for("health"), "http://localhost:5000/health");
        assert_eq!(target.url_for("/"), "http://localhost:5000/");
        assert_eq!(target.to_string(), "http://localhost:5000");

        let prefixed = Target::parse("http://svc.internal/api/").unwrap();
        assert_eq!(prefixed.url_for("/cpu"), "http://svc.internal/api/cpu");
    }

    #[test]
    fn test_target_rejects_bad_urls() {
        assert!(matches!(
            Target::parse("not a url"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(matches!(
            Target::parse("ftp://localhost:21"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(matches!(
            Target::parse("http://h/api?x=1"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(matches!(
            Target::parse("http://h/api#top"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_failed_outcome_always_has_error_text() {
        let outcome = RequestOutcome::failed(Duration::from_millis(3), "");
        assert_eq!(outcome.status_code, 0);
        assert!(!outcome.success);
        assert!(!outcome.error.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_get_exposes_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "healthy", "memory_usage": 41.5})),
            )
            .mount(&server)
            .await;

        let response = client_for(&server)
            .get("/health", Duration::from_secs(5))
            .await;

        assert!(response.is_success());
        assert_eq!(response.outcome.status_code, 200);
        assert!(response.outcome.error.is_none());
        assert!(response.outcome.elapsed > Duration::ZERO);
        let body = response.json().unwrap();
        assert_eq!(body["memory_usage"], json!(41.5));
    }

    #[tokio::test]
    async fn test_non_200_is_failed_but_well_formed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cpu-intensive"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"cpu_usage": 99.0})))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .get("/cpu-intensive", Duration::from_secs(5))
            .await;

        assert!(!response.is_success());
        assert_eq!(response.outcome.status_code, 503);
        assert!(response.outcome.error.is_none());
        assert!(response.json().is_none());
    }

    #[tokio::test]
    async fn test_timeout_becomes_failed_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let timeout = Duration::from_millis(50);
        let response = client_for(&server).get("/slow", timeout).await;

        assert_eq!(response.outcome.status_code, 0);
        assert!(!response.outcome.success);
        assert!(response.outcome.error.as_deref().unwrap().contains("timed out"));
        assert!(response.outcome.elapsed >= timeout);
        assert!(response.outcome.elapsed < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_connection_refused_becomes_failed_outcome() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let target = Target::parse(&format!("http://127.0.0.1:{}", port)).unwrap();
        let client = TargetClient::new(target).unwrap();
        let response = client.get("/health", Duration::from_secs(2)).await;

        assert_eq!(response.outcome.status_code, 0);
        assert!(!response.outcome.success);
        assert!(!response.outcome.error.as_deref().unwrap().is_empty());
        assert!(response.json().is_none());
    }
}
