//! Metrics endpoint handler for Prometheus scraping.
//!
//! Every request runs one full collection over the configured stats source.
//! Per-source failures still produce a 200 response carrying a read-error
//! sample; only a failure of the whole run returns 500.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::time::Instant;
use tracing::{debug, error, instrument};
use uwsgi_stats_exporter::{exposition, ExporterError};

use crate::state::SharedState;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    CollectionFailed(ExporterError),
    EncodingFailed(prometheus::Error),
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        let body = match self {
            MetricsError::CollectionFailed(e) => format!("Collection failed: {e}"),
            MetricsError::EncodingFailed(e) => format!("Failed to encode metrics: {e}"),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<String, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");
    state.health_stats.record_http_request();

    let run = match state.collector.run().await {
        Ok(run) => run,
        Err(e) => {
            error!("Collection run failed: {}", e);
            state.health_stats.record_failed_scrape();
            state.scrape_duration.set(start.elapsed().as_secs_f64());
            state.sources.set(0.0);
            return Err(MetricsError::CollectionFailed(e));
        }
    };

    for &kind in &run.failures {
        state.health_stats.record_source_failure(kind);
        state
            .source_errors
            .with_label_values(&[kind.as_str()])
            .inc();
    }
    state.health_stats.record_scrape(
        run.sources as u64,
        run.samples.len() as u64,
        run.duration.as_secs_f64(),
    );

    let mut families = Vec::new();
    if state.telemetry_enabled() {
        state.scrape_duration.set(run.duration.as_secs_f64());
        state.sources.set(run.sources as f64);
        families.extend(state.registry.gather());
    }
    families.extend(exposition::gather(&run.samples).map_err(|e| {
        error!("Failed to build metric families: {}", e);
        MetricsError::EncodingFailed(e)
    })?);

    let body = exposition::encode_text(&families).map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        MetricsError::EncodingFailed(e)
    })?;

    state
        .health_stats
        .record_metrics_response_size_kb(body.len() as f64 / 1024.0);

    debug!(
        "Served {} samples from {} source(s) in {:.2}ms",
        run.samples.len(),
        run.sources,
        run.duration.as_secs_f64() * 1000.0
    );

    Ok(body)
}
