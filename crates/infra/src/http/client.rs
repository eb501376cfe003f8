//! JSON poster for webhook endpoints
//!
//! Every webhook call is a POST with a JSON body. Transient failures (5xx,
//! timeouts, refused connections) are retried with exponential backoff, but
//! only for requests whose [`Delivery`] allows a replay.

use std::time::Duration;

use crmbatch_domain::CrmError;
use reqwest::{Client as ReqwestClient, Response};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::errors::InfraError;

/// How many times a request may reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Replaying is harmless: reads, and groups whose commands run
    /// independently of each other.
    Retry,
    /// Sent once. A halting write group may already have been applied when
    /// the response is lost; a replay would report those commands as failed.
    AtMostOnce,
}

impl Delivery {
    fn attempts(self, configured: usize) -> usize {
        match self {
            Self::Retry => configured.max(1),
            Self::AtMostOnce => 1,
        }
    }
}

/// Delay before retry `n` is `base * 2^(n-1)`, doubling at most eight times.
#[derive(Debug, Clone, Copy)]
struct Backoff {
    base: Duration,
}

impl Backoff {
    fn delay(self, retry: usize) -> Duration {
        let doublings = u32::try_from(retry.saturating_sub(1).min(8)).unwrap_or(8);
        self.base.saturating_mul(1 << doublings)
    }
}

/// HTTP client posting JSON bodies with bounded retries.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    backoff: Backoff,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client with default timeout and retry settings.
    pub fn new() -> Result<Self, CrmError> {
        Self::builder().build()
    }

    /// POST `body` as JSON to `url`.
    ///
    /// Any HTTP status is returned as a response once attempts allowed by
    /// `delivery` are used up; 5xx answers are retried before that.
    ///
    /// # Errors
    /// The transport failure of the last attempt, with the URL stripped.
    pub async fn post_json(&self, url: &Url, body: &Value, delivery: Delivery) -> Result<Response, CrmError> {
        let attempts = delivery.attempts(self.max_attempts);
        let host = url.host_str().unwrap_or_default();

        let mut attempt = 1;
        loop {
            let outcome = self.client.post(url.clone()).json(body).send().await;
            let may_retry = attempt < attempts;

            match outcome {
                Ok(response) if may_retry && response.status().is_server_error() => {
                    debug!(attempt, host, status = %response.status(), ?delivery, "webhook_post_retrying");
                }
                Ok(response) => {
                    debug!(attempt, host, status = %response.status(), "webhook_post_answered");
                    return Ok(response);
                }
                Err(err) => {
                    let err = err.without_url();
                    if !(may_retry && is_transient(&err)) {
                        debug!(attempt, host, error = %err, ?delivery, "webhook_post_failed");
                        return Err(InfraError::from(err).into());
                    }
                    debug!(attempt, host, error = %err, ?delivery, "webhook_post_retrying");
                }
            }

            tokio::time::sleep(self.backoff.delay(attempt)).await;
            attempt += 1;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    /// Per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attempts for replayable requests, the first one included.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry.
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// `User-Agent` header sent with every request.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn build(self) -> Result<HttpClient, CrmError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder.build().map_err(InfraError::from)?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts,
            backoff: Backoff { base: self.base_backoff },
        })
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::errors::HTTP_LAYER;

    fn client(max_attempts: usize) -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(max_attempts)
            .build()
            .expect("http client")
    }

    fn url(server: &MockServer) -> Url {
        Url::parse(&server.uri()).expect("mock server url")
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        let backoff = Backoff { base: Duration::from_millis(10) };
        assert_eq!(backoff.delay(1), Duration::from_millis(10));
        assert_eq!(backoff.delay(3), Duration::from_millis(40));
        assert_eq!(backoff.delay(50), Duration::from_millis(2_560));
    }

    #[test]
    fn at_most_once_ignores_configured_attempts() {
        assert_eq!(Delivery::AtMostOnce.attempts(5), 1);
        assert_eq!(Delivery::Retry.attempts(5), 5);
        assert_eq!(Delivery::Retry.attempts(0), 1);
    }

    #[tokio::test]
    async fn posts_json_body_once_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(3).post_json(&url(&server), &json!({"id": 1}), Delivery::Retry).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let requests = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent, json!({"id": 1}));
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let server = MockServer::start().await;
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        Mock::given(method("POST"))
            .respond_with(move |_: &wiremock::Request| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(500)
                } else {
                    ResponseTemplate::new(200)
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let response = client(3).post_json(&url(&server), &json!({}), Delivery::Retry).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn server_error_is_returned_after_last_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let response = client(3).post_json(&url(&server), &json!({}), Delivery::Retry).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn at_most_once_does_not_replay_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(3).post_json(&url(&server), &json!({}), Delivery::AtMostOnce).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "INVALID_REQUEST"})))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(3).post_json(&url(&server), &json!({}), Delivery::Retry).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refused_connection_is_an_http_layer_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/rest/1/s3cr3t/profile.json")).unwrap();

        match client(2).post_json(&url, &json!({}), Delivery::Retry).await {
            Err(CrmError::RemoteCall { method, message }) => {
                assert_eq!(method, HTTP_LAYER);
                assert!(!message.contains("s3cr3t"));
            }
            other => panic!("expected remote call error, got {other:?}"),
        }
    }
}
