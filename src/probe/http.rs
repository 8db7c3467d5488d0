//! HTTP probe implementation.

use super::{ProbeError, ProbeResult, Target};

use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use std::time::{Duration, Instant};

/// Issues health requests against targets.
///
/// Holds one pooled client; each call to [`Prober::probe`] carries its own
/// deadline, so one slow target never holds up another.
#[derive(Debug, Clone)]
pub struct Prober {
    client: reqwest::Client,
    timeout: Duration,
}

impl Prober {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe a single target. Never fails; errors land in the result.
    pub async fn probe(&self, target: &Target) -> ProbeResult {
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.timeout;
        let url = target.health_url();

        let request = self
            .client
            .get(&url)
            .header("apikey", &target.credential)
            .header(AUTHORIZATION, format!("Bearer {}", target.credential))
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache");

        let response = match tokio::time::timeout_at(deadline, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let err = ProbeError::Network(e.to_string());
                tracing::debug!("Probe failed for {}: {}", url, err);
                return ProbeResult::transport_failure(target, elapsed_ms(start), &err);
            }
            Err(_) => {
                let err = ProbeError::Timeout(self.timeout);
                tracing::debug!("Probe aborted for {}: {}", url, err);
                return ProbeResult::transport_failure(target, elapsed_ms(start), &err);
            }
        };

        let status = response.status();
        let declares_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);

        let payload_verified = if declares_json {
            // The body shares the probe's deadline; a stalled body only
            // costs verification, the status is already known.
            match tokio::time::timeout_at(deadline, response.bytes()).await {
                Ok(Ok(body)) => verify_payload(&body),
                Ok(Err(e)) => {
                    tracing::debug!("Failed to read body from {}: {}", url, e);
                    false
                }
                Err(_) => {
                    tracing::debug!("Body read from {} exceeded {:?}", url, self.timeout);
                    false
                }
            }
        } else {
            false
        };

        ProbeResult {
            display_name: target.display_name.clone(),
            endpoint_base: target.endpoint_base.clone(),
            succeeded: status.is_success(),
            status_code: status.as_u16(),
            elapsed_ms: elapsed_ms(start),
            payload_verified,
            error_message: None,
        }
    }
}

/// True when the body parses as JSON and is not `null`.
fn verify_payload(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(body)
        .map(|v| !v.is_null())
        .unwrap_or(false)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
