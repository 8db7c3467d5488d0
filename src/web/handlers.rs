//! HTTP request handlers.

use super::AppState;
use crate::coordinator::{run_round, select_targets, RoundSummary};
use crate::history::StatsWindow;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

const NO_STORE: &str = "no-store, max-age=0";

// ============================================================================
// API: Keepalive
// ============================================================================

pub async fn handle_keepalive_get(State(state): State<AppState>) -> Response {
    let summary = run_round(state.prober.clone(), state.config.targets.clone()).await;
    keepalive_response(summary)
}

pub async fn handle_keepalive_post(State(state): State<AppState>, body: Bytes) -> Response {
    let (targets, source) = select_targets(&body, &state.config.targets);
    tracing::debug!("Keepalive round with {} targets from {:?}", targets.len(), source);

    let summary = run_round(state.prober.clone(), targets).await;
    keepalive_response(summary)
}

/// 200 when every probe succeeded, 207 otherwise. Never cacheable.
fn keepalive_response(summary: RoundSummary) -> Response {
    let status = if summary.is_partial() {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::OK
    };

    (status, [(header::CACHE_CONTROL, NO_STORE)], Json(summary)).into_response()
}

// ============================================================================
// API: Stats
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub window: Option<String>,
}

impl StatsQuery {
    /// Unknown or missing windows fall back to daily.
    fn window(&self) -> StatsWindow {
        self.window
            .as_deref()
            .and_then(|w| w.parse().ok())
            .unwrap_or_default()
    }
}

pub async fn handle_get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> impl IntoResponse {
    let view = state.viewer.stats(query.window()).await;
    ([(header::CACHE_CONTROL, NO_STORE)], Json(view))
}

pub async fn handle_refresh_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> impl IntoResponse {
    state.viewer.refresh().await;
    let view = state.viewer.stats(query.window()).await;
    ([(header::CACHE_CONTROL, NO_STORE)], Json(view))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AutoRefreshRequest {
    pub enabled: bool,
}

pub async fn handle_set_auto_refresh(
    State(state): State<AppState>,
    Json(req): Json<AutoRefreshRequest>,
) -> impl IntoResponse {
    state.viewer.set_auto_refresh(req.enabled).await;
    Json(AutoRefreshRequest {
        enabled: state.viewer.auto_refresh_enabled().await,
    })
}
