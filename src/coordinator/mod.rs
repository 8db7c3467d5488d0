//! Round coordinator: fans a probe out to every target and merges the outcomes.

mod sources;

pub use sources::*;

use crate::probe::{ProbeResult, Prober, Target};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of one coordinated batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    #[serde(rename = "count", default)]
    pub result_count: usize,
    #[serde(rename = "success", default)]
    pub success_count: usize,
    #[serde(rename = "failed", default)]
    pub failure_count: usize,
    /// In the same order as the targets that were probed
    #[serde(default)]
    pub results: Vec<ProbeResult>,
}

impl RoundSummary {
    pub fn from_results(results: Vec<ProbeResult>) -> Self {
        let result_count = results.len();
        let success_count = results.iter().filter(|r| r.succeeded).count();

        Self {
            result_count,
            success_count,
            failure_count: result_count - success_count,
            results,
        }
    }

    /// True when at least one probe failed.
    pub fn is_partial(&self) -> bool {
        self.failure_count > 0
    }
}

/// Normalize candidates and drop the ones missing a field, keeping order.
pub fn normalize_targets<I>(candidates: I) -> Vec<Target>
where
    I: IntoIterator<Item = Target>,
{
    candidates
        .into_iter()
        .map(Target::normalized)
        .filter(|t| {
            let valid = t.is_valid();
            if !valid {
                tracing::debug!("Dropping incomplete target {:?}", t.endpoint_base);
            }
            valid
        })
        .collect()
}

/// Probe every valid target concurrently and wait for all of them.
///
/// Each probe runs in its own task with its own deadline. Handles are awaited
/// in input order, so the output order matches the filtered input no matter
/// which probe finishes first.
pub async fn run_round(prober: Arc<Prober>, targets: Vec<Target>) -> RoundSummary {
    let targets = normalize_targets(targets);

    if targets.is_empty() {
        tracing::info!("Round skipped: no targets configured");
        return RoundSummary::default();
    }

    let mut handles = Vec::with_capacity(targets.len());
    for target in &targets {
        let prober = prober.clone();
        let target = target.clone();
        handles.push(tokio::spawn(async move { prober.probe(&target).await }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (handle, target) in handles.into_iter().zip(&targets) {
        match handle.await {
            Ok(result) => {
                if !result.succeeded {
                    tracing::warn!(
                        "Probe failed for {} (status {}, {}ms)",
                        target.endpoint_base,
                        result.status_code,
                        result.elapsed_ms
                    );
                }
                results.push(result);
            }
            Err(e) => {
                tracing::error!("Probe task for {} did not complete: {}", target.endpoint_base, e);
                results.push(ProbeResult {
                    display_name: target.display_name.clone(),
                    endpoint_base: target.endpoint_base.clone(),
                    succeeded: false,
                    status_code: 0,
                    elapsed_ms: 0,
                    payload_verified: false,
                    error_message: Some(format!("probe task failed: {}", e)),
                });
            }
        }
    }

    let summary = RoundSummary::from_results(results);
    tracing::info!(
        "Round complete: {} probed, {} ok, {} failed",
        summary.result_count,
        summary.success_count,
        summary.failure_count
    );
    summary
}
