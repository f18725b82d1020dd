//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! exporter health statistics as a plain-text table.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::atomic::Ordering;
use tracing::{debug, instrument};

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = "uwsgi-stats-exporter: Prometheus exporter for uWSGI stats servers";

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");
    state.health_stats.record_http_request();

    let stats = &state.health_stats;
    let scrapes = stats.total_scrapes.load(Ordering::Relaxed);
    let failed = stats.failed_scrapes.load(Ordering::Relaxed);

    // Failed runs are reported in the message; the status stays 200.
    let message = if scrapes == 0 {
        "OK - No scrapes yet"
    } else if failed > 0 {
        "OK - Some collection runs failed"
    } else {
        "OK"
    };

    let uptime_seconds = stats.get_uptime_seconds();
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    let uptime_str = if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    };

    let table = stats.render_table();
    let source = state.collector.descriptor();

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "{message}\n\nUptime: {uptime_str}\nStats source: {source}\n\n{table}\n{FOOTER_TEXT}"
        ),
    )
}
