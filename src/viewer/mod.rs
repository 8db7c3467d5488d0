//! Stats viewer.
//!
//! Consumes the keepalive endpoint over HTTP the way a dashboard would: keeps
//! the latest round, records every successful fetch in the history log, and
//! optionally re-fetches on a timer.

use crate::coordinator::RoundSummary;
use crate::history::{aggregate, filter_recent, AggregateStat, HistoryStore, StatsWindow};
use crate::probe::ProbeResult;

use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Failure to reach or read the keepalive endpoint itself.
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Default bound on one fetch of the keepalive endpoint.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// What the viewer last saw.
#[derive(Debug, Clone, Default)]
pub struct ViewerState {
    pub results: Vec<ProbeResult>,
    pub last_updated: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Stats page payload.
#[derive(Debug, Clone, Serialize)]
pub struct StatsView {
    pub window: StatsWindow,
    pub active: usize,
    pub total: usize,
    pub results: Vec<ProbeResult>,
    pub last_updated: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub auto_refresh: bool,
    pub history_entries: usize,
    pub aggregated: Vec<AggregateStat>,
}

pub struct StatsViewer {
    client: reqwest::Client,
    source: String,
    history: HistoryStore,
    refresh_interval: Duration,
    fetch_timeout: Duration,
    state: RwLock<ViewerState>,
    refresher: Mutex<Option<broadcast::Sender<()>>>,
}

impl StatsViewer {
    pub fn new(source: impl Into<String>, history: HistoryStore, refresh_interval: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            source: source.into(),
            history,
            refresh_interval,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            state: RwLock::new(ViewerState::default()),
            refresher: Mutex::new(None),
        }
    }

    /// Bound each fetch by `timeout` instead of [`DEFAULT_FETCH_TIMEOUT`].
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    async fn fetch_round(&self) -> Result<RoundSummary, ViewerError> {
        let response = self
            .client
            .get(&self.source)
            .header(ACCEPT, "application/json")
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| ViewerError::Request(e.to_string()))?;

        response
            .json::<RoundSummary>()
            .await
            .map_err(|e| ViewerError::Decode(e.to_string()))
    }

    /// Fetch one round now.
    ///
    /// A successful fetch replaces the current results and is appended to
    /// history. A failed fetch only records the error; the previous results
    /// stay visible. History is written before the state lock is taken.
    pub async fn refresh(&self) -> ViewerState {
        let outcome = self.fetch_round().await;

        if let Ok(round) = &outcome {
            if let Err(e) = self.history.append_round(round) {
                tracing::warn!("Failed to save history: {}", e);
            }
        }

        let mut state = self.state.write().await;
        match outcome {
            Ok(round) => {
                state.results = round.results;
                state.last_updated = Some(Utc::now());
                state.error = None;
            }
            Err(e) => {
                tracing::error!("Stats refresh from {} failed: {}", self.source, e);
                state.error = Some(e.to_string());
            }
        }

        state.clone()
    }

    /// Current state plus the aggregate over `window`.
    pub async fn stats(&self, window: StatsWindow) -> StatsView {
        let state = self.state.read().await.clone();
        let log = self.history.load();
        let recent = filter_recent(&log, window);

        StatsView {
            window,
            active: state.results.iter().filter(|r| r.succeeded).count(),
            total: state.results.len(),
            results: state.results,
            last_updated: state.last_updated,
            error: state.error,
            auto_refresh: self.auto_refresh_enabled().await,
            history_entries: log.len(),
            aggregated: aggregate(&recent),
        }
    }

    pub async fn auto_refresh_enabled(&self) -> bool {
        self.refresher.lock().await.is_some()
    }

    /// Start or stop the refresh timer. Repeated calls with the same value
    /// are no-ops.
    pub async fn set_auto_refresh(self: &Arc<Self>, enabled: bool) {
        let mut refresher = self.refresher.lock().await;

        if !enabled {
            if let Some(stop_tx) = refresher.take() {
                let _ = stop_tx.send(());
                tracing::info!("Auto refresh stopped");
            }
            return;
        }

        if refresher.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = broadcast::channel(1);
        *refresher = Some(stop_tx);

        tracing::info!("Auto refresh every {:?} from {}", self.refresh_interval, self.source);
        tokio::spawn(run_refresh_loop(self.clone(), stop_rx));
    }
}

async fn run_refresh_loop(viewer: Arc<StatsViewer>, mut stop_rx: broadcast::Receiver<()>) {
    let mut interval = tokio::time::interval(viewer.refresh_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.recv() => break,
            _ = interval.tick() => {
                // A stop request abandons an in-flight fetch.
                tokio::select! {
                    biased;
                    _ = stop_rx.recv() => break,
                    _ = viewer.refresh() => {}
                }
            }
        }
    }
}
