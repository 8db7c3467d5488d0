//! History model types.

use crate::probe::ProbeResult;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of rounds retained in the log.
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// Milliseconds in one day.
pub const DAY_MS: i64 = 86_400_000;

/// A retained round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Milliseconds since the Unix epoch
    #[serde(rename = "ts")]
    pub timestamp: i64,
    #[serde(default)]
    pub results: Vec<ProbeResult>,
}

/// Per-endpoint rollup over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStat {
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "url")]
    pub endpoint_base: String,
    pub sample_count: u64,
    pub success_count: u64,
    pub average_latency_ms: f64,
}

/// Supported history windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsWindow {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl StatsWindow {
    pub fn days(self) -> i64 {
        match self {
            StatsWindow::Daily => 1,
            StatsWindow::Weekly => 7,
            StatsWindow::Monthly => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatsWindow::Daily => "daily",
            StatsWindow::Weekly => "weekly",
            StatsWindow::Monthly => "monthly",
        }
    }
}

impl fmt::Display for StatsWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatsWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(StatsWindow::Daily),
            "weekly" => Ok(StatsWindow::Weekly),
            "monthly" => Ok(StatsWindow::Monthly),
            other => Err(format!("unknown window: {}", other)),
        }
    }
}
