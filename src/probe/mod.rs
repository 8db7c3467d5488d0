//! Probe module for endpoint health checks.
//!
//! A probe is a single bounded GET against a target's health path. Every
//! outcome, including transport failure, is folded into a [`ProbeResult`].

mod http;
#[cfg(test)]
pub(crate) mod testutil;

pub use http::*;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default hard deadline for one probe, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

/// Path appended to a target's endpoint base.
pub const HEALTH_PATH: &str = "/auth/v1/settings";

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// A probe destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "url")]
    pub endpoint_base: String,
    #[serde(rename = "key")]
    pub credential: String,
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Target {
    pub fn new(
        endpoint_base: impl Into<String>,
        credential: impl Into<String>,
        display_name: Option<String>,
    ) -> Self {
        Self {
            endpoint_base: endpoint_base.into(),
            credential: credential.into(),
            display_name,
        }
    }

    /// Strip backticks, surrounding whitespace and trailing slashes from the
    /// endpoint base, and trim the credential.
    pub fn normalized(self) -> Self {
        let stripped: String = self.endpoint_base.chars().filter(|c| *c != '`').collect();
        let endpoint_base = stripped.trim().trim_end_matches('/').to_string();
        let credential = self.credential.trim().to_string();
        let display_name = self.display_name.filter(|n| !n.is_empty());

        Self {
            endpoint_base,
            credential,
            display_name,
        }
    }

    /// Both the endpoint base and the credential must be non-blank.
    pub fn is_valid(&self) -> bool {
        !self.endpoint_base.trim().is_empty() && !self.credential.trim().is_empty()
    }

    /// Full URL of the health endpoint for this target.
    pub fn health_url(&self) -> String {
        format!("{}{}", self.endpoint_base.trim_end_matches('/'), HEALTH_PATH)
    }
}

/// Outcome of one probe attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "url", default)]
    pub endpoint_base: String,
    #[serde(rename = "ok", default)]
    pub succeeded: bool,
    /// HTTP status, or 0 when the transport itself failed
    #[serde(rename = "status", default)]
    pub status_code: u16,
    #[serde(rename = "ms", default)]
    pub elapsed_ms: u64,
    #[serde(rename = "verified", default)]
    pub payload_verified: bool,
    /// Present only on transport failure
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ProbeResult {
    /// A result for a probe whose transport never completed.
    pub fn transport_failure(target: &Target, elapsed_ms: u64, error: &ProbeError) -> Self {
        Self {
            display_name: target.display_name.clone(),
            endpoint_base: target.endpoint_base.clone(),
            succeeded: false,
            status_code: 0,
            elapsed_ms,
            payload_verified: false,
            error_message: Some(error.to_string()),
        }
    }
}
