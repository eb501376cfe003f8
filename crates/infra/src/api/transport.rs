//! Webhook transport for the CRM REST API
//!
//! Direct calls are posted as JSON to `{webhook}{method}.json`; grouped calls
//! go to `{webhook}batch.json` with every command encoded as a
//! `method?query` line.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use crmbatch_core::{ErrorMode, GroupedTransport};
use crmbatch_domain::constants::BATCH_METHOD;
use crmbatch_domain::{ClientConfig, Command, CommandResponse, CrmError, GroupedResponse, Params, Result};
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};
use url::Url;

use super::encoder::command_line;
use super::errors::ApiError;
use super::wire;
use crate::errors::InfraError;
use crate::http::{Delivery, HttpClient};

/// [`GroupedTransport`] over an inbound webhook URL.
#[derive(Clone)]
pub struct WebhookTransport {
    http: HttpClient,
    base_url: Url,
}

impl std::fmt::Debug for WebhookTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The webhook path embeds the access secret.
        f.debug_struct("WebhookTransport").field("host", &self.base_url.host_str()).finish()
    }
}

impl WebhookTransport {
    /// Build a transport with timeout and retry settings from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CrmError::Config`] if the configuration is invalid or the
    /// webhook URL does not parse.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(config.max_attempts)
            .user_agent(concat!("crmbatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_http_client(&config.webhook_url, http)
    }

    /// Build a transport around an existing HTTP client.
    pub fn with_http_client(webhook_url: &str, http: HttpClient) -> Result<Self> {
        let mut raw = webhook_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw).map_err(|err| CrmError::from(InfraError::from(err)))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(CrmError::Config("webhook URL must be an absolute http(s) URL".into()));
        }
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, method: &str) -> Result<Url> {
        self.base_url
            .join(&format!("{method}.json"))
            .map_err(|err| CrmError::from(InfraError::from(err)))
    }

    async fn post(&self, method: &str, body: &Value, delivery: Delivery) -> Result<Value> {
        let url = self.endpoint(method)?;
        let started = Instant::now();

        let response = self
            .http
            .post_json(&url, body, delivery)
            .await
            .map_err(|err| Self::failed(method, ApiError::from_crm(err)))?;

        let status = response.status();
        let text = response.text().await.map_err(|err| {
            let infra: InfraError = err.into();
            Self::failed(method, ApiError::from_crm(infra.into()))
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| wire::envelope_error(&body))
                .map_or_else(|| text.trim().to_string(), |failure| failure.to_string());
            return Err(Self::failed(method, ApiError::from_status(status, method, &detail)));
        }

        let body: Value =
            serde_json::from_str(&text).map_err(|err| CrmError::from(InfraError::from(err)))?;
        debug!(
            method,
            %status,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "webhook_call_completed"
        );
        Ok(body)
    }

    fn failed(method: &str, err: ApiError) -> CrmError {
        let category = err.category().as_str();
        if err.is_transient() {
            warn!(method, category, error = %err, "webhook_call_failed");
        } else {
            error!(method, category, error = %err, "webhook_call_failed");
        }
        err.into_crm(method)
    }
}

#[async_trait]
impl GroupedTransport for WebhookTransport {
    async fn call(&self, method: &str, params: &Params) -> Result<CommandResponse> {
        let body = self.post(method, &Value::Object(params.clone()), Delivery::Retry).await?;
        wire::direct_response(method, body)
    }

    async fn execute(&self, commands: &[Command], mode: ErrorMode) -> Result<GroupedResponse> {
        if commands.is_empty() {
            return Ok(GroupedResponse::default());
        }

        let cmd: Map<String, Value> = commands
            .iter()
            .map(|command| (command.id().to_string(), Value::String(command_line(command))))
            .collect();
        let body = json!({
            "halt": u8::from(mode.halts()),
            "cmd": cmd,
        });

        // A halting group stops at its first failure, so a replay after a lost
        // response would fail on the commands the first attempt applied.
        let delivery = if mode.halts() { Delivery::AtMostOnce } else { Delivery::Retry };
        let response = self.post(BATCH_METHOD, &body, delivery).await?;
        wire::grouped_response(&response, commands)
    }
}
