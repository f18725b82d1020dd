//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use prometheus::{CounterVec, Gauge, Opts, Registry};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use uwsgi_stats_exporter::{HealthStats, StatsCollector};

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    /// Registry for the exporter's own `uwsgi_exporter_*` metrics.
    pub registry: Registry,
    pub scrape_duration: Gauge,
    pub sources: Gauge,
    pub source_errors: CounterVec,
    pub collector: StatsCollector,
    pub config: Arc<Config>,
    pub health_stats: Arc<HealthStats>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Builds the state and registers the telemetry metrics.
    pub fn new(collector: StatsCollector, config: Config) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let scrape_duration = Gauge::new(
            "uwsgi_exporter_scrape_duration_seconds",
            "Duration of the last collection run in seconds",
        )?;
        let sources = Gauge::new(
            "uwsgi_exporter_sources",
            "Number of stats sources enumerated in the last collection run",
        )?;
        let source_errors = CounterVec::new(
            Opts::new(
                "uwsgi_exporter_source_errors_total",
                "Stats source failures by kind",
            ),
            &["kind"],
        )?;

        registry.register(Box::new(scrape_duration.clone()))?;
        registry.register(Box::new(sources.clone()))?;
        registry.register(Box::new(source_errors.clone()))?;

        Ok(Self {
            registry,
            scrape_duration,
            sources,
            source_errors,
            collector,
            config: Arc::new(config),
            health_stats: Arc::new(HealthStats::new()),
            start_time: Instant::now(),
        })
    }

    pub fn telemetry_enabled(&self) -> bool {
        self.config.enable_telemetry.unwrap_or(true)
    }
}
