//! Resilient outbound HTTP client
//!
//! Bounded exponential-backoff retry around JSON-speaking upstreams. Retries
//! are invisible to the protocol layer; a caller only ever sees the final
//! outcome.

#[cfg(test)]
mod tests;

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 500;

/// Status codes worth retrying: rate limiting and transient gateway
/// failures. Any other 4xx/5xx fails immediately.
const RETRYABLE_STATUS: [u16; 4] = [429, 502, 503, 504];

/// Message fragments marking a transport error as transient.
const TRANSIENT_SIGNATURES: [&str; 4] = ["timeout", "connection", "network", "temporarily"];

#[derive(Debug, Clone)]
pub struct ExternalCallClient {
    http: reqwest::Client,
    max_retries: u32,
    initial_delay: Duration,
}

impl ExternalCallClient {
    #[inline]
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
        })
    }

    #[inline]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[inline]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Perform an outbound call, retrying transient failures up to
    /// `max_retries` times (so `max_retries + 1` attempts total).
    ///
    /// An inbound bearer token is forwarded unmodified when present. The
    /// response body is parsed as JSON; a non-JSON body is wrapped as
    /// `{"text": ...}` and an empty body becomes
    /// `{"success": true, "status": code}`.
    #[inline]
    pub async fn call(
        &self,
        method: &str,
        url: &str,
        body: Option<&Value>,
        bearer: Option<&str>,
    ) -> Result<Value> {
        let method = reqwest::Method::from_str(&method.to_uppercase())
            .map_err(|_| anyhow!("Invalid HTTP method: {method}"))?;

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            debug!("Outbound {method} {url}, attempt {}/{}", attempt + 1, self.max_retries + 1);

            let mut request = self
                .http
                .request(method.clone(), url)
                .header("Accept", "application/json");
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return parse_success_body(status, response).await;
                    }

                    let retryable = RETRYABLE_STATUS.contains(&status.as_u16());
                    let text = response.text().await.unwrap_or_default();
                    let error = anyhow!("Upstream returned HTTP {status}: {text}");

                    if !retryable {
                        warn!("Outbound call failed with HTTP {status}, not retrying");
                        return Err(error);
                    }
                    warn!(
                        "Outbound call got HTTP {status}, attempt {}/{}",
                        attempt + 1,
                        self.max_retries + 1
                    );
                    last_error = Some(error);
                }
                Err(e) => {
                    if !is_transient(&e) {
                        warn!("Outbound transport error, not retrying: {e}");
                        return Err(anyhow!("Outbound call failed: {e}"));
                    }
                    warn!(
                        "Transient outbound error, attempt {}/{}: {e}",
                        attempt + 1,
                        self.max_retries + 1
                    );
                    last_error = Some(anyhow!("Outbound call failed: {e}"));
                }
            }

            if attempt < self.max_retries {
                let delay = self.initial_delay * 2u32.pow(attempt);
                debug!("Backing off {delay:?} before retry");
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Outbound call failed after retries")))
    }
}

async fn parse_success_body(status: StatusCode, response: reqwest::Response) -> Result<Value> {
    let text = response
        .text()
        .await
        .context("Failed to read upstream response body")?;

    if text.trim().is_empty() {
        return Ok(json!({"success": true, "status": status.as_u16()}));
    }

    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(_) => Ok(json!({"text": text})),
    }
}

/// Whether a transport-level error looks transient enough to retry.
/// Timeout and connect errors qualify directly; anything else only when its
/// message carries a transient signature.
fn is_transient(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    let message = error.to_string().to_lowercase();
    TRANSIENT_SIGNATURES
        .iter()
        .any(|signature| message.contains(signature))
}
