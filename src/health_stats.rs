//! Health statistics and monitoring for the exporter.
//!
//! Tracks collection run performance, per-source failures and HTTP activity,
//! and renders them as the plain-text table served on `/health`.

use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Duration, Instant, SystemTime};

use crate::error::FailureKind;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns `(last, avg, max, min, count)`.
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Thread-safe circular buffer for tracking HTTP request timestamps.
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(1024)),
        }
    }
}

impl RequestTimestamps {
    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            let now = Instant::now();
            guard.push_back(now);
            // Keep only the last 10 minutes
            while guard
                .front()
                .is_some_and(|&t| now.duration_since(t) > Duration::from_secs(600))
            {
                guard.pop_front();
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        if let Ok(guard) = self.inner.lock() {
            let now = Instant::now();
            guard
                .iter()
                .filter(|&&t| now.duration_since(t) <= Duration::from_secs(60))
                .count() as u64
        } else {
            0
        }
    }
}

/// Exporter health statistics shared by all requests.
pub struct HealthStats {
    // Collection runs
    pub scrape_duration_seconds: Stat,
    pub sources_per_scrape: Stat,
    pub samples_per_scrape: Stat,
    pub total_scrapes: AtomicU64,
    pub failed_scrapes: AtomicU64,

    // Per-source failures
    pub source_read_errors: AtomicU64,
    pub source_timeouts: AtomicU64,
    pub source_decode_errors: AtomicU64,
    pub source_aborts: AtomicU64,

    // HTTP server stats
    pub http_request_timestamps: RequestTimestamps,
    pub metrics_response_size_kb: Stat,

    // Timing
    pub start_time: Instant,
    pub last_scrape_time: StdRwLock<Option<SystemTime>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            scrape_duration_seconds: Stat::default(),
            sources_per_scrape: Stat::default(),
            samples_per_scrape: Stat::default(),
            total_scrapes: AtomicU64::new(0),
            failed_scrapes: AtomicU64::new(0),
            source_read_errors: AtomicU64::new(0),
            source_timeouts: AtomicU64::new(0),
            source_decode_errors: AtomicU64::new(0),
            source_aborts: AtomicU64::new(0),
            http_request_timestamps: RequestTimestamps::default(),
            metrics_response_size_kb: Stat::default(),
            start_time: Instant::now(),
            last_scrape_time: StdRwLock::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records a completed collection run.
    pub fn record_scrape(&self, sources: u64, samples: u64, duration_seconds: f64) {
        self.sources_per_scrape.add_sample(sources as f64);
        self.samples_per_scrape.add_sample(samples as f64);
        self.scrape_duration_seconds.add_sample(duration_seconds);
        self.total_scrapes.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_scrape_time.write() {
            *guard = Some(SystemTime::now());
        }
    }

    /// Records a collection run that could not enumerate its sources.
    pub fn record_failed_scrape(&self) {
        self.total_scrapes.fetch_add(1, Ordering::Relaxed);
        self.failed_scrapes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one failing source by failure kind.
    pub fn record_source_failure(&self, kind: FailureKind) {
        self.failure_counter(kind).fetch_add(1, Ordering::Relaxed);
    }

    /// Total failures recorded for `kind`.
    pub fn source_failures(&self, kind: FailureKind) -> u64 {
        self.failure_counter(kind).load(Ordering::Relaxed)
    }

    fn failure_counter(&self, kind: FailureKind) -> &AtomicU64 {
        match kind {
            FailureKind::Read => &self.source_read_errors,
            FailureKind::Timeout => &self.source_timeouts,
            FailureKind::Decode => &self.source_decode_errors,
            FailureKind::Aborted => &self.source_aborts,
        }
    }

    pub fn record_http_request(&self) {
        self.http_request_timestamps.record();
    }

    pub fn record_metrics_response_size_kb(&self, size_kb: f64) {
        self.metrics_response_size_kb.add_sample(size_kb);
    }

    pub fn total_source_failures(&self) -> u64 {
        FailureKind::ALL
            .iter()
            .map(|&kind| self.source_failures(kind))
            .sum()
    }

    pub fn get_scrape_success_rate(&self) -> f64 {
        let total = self.total_scrapes.load(Ordering::Relaxed);
        let failed = self.failed_scrapes.load(Ordering::Relaxed);
        if total == 0 {
            100.0
        } else {
            ((total - failed) as f64 / total as f64) * 100.0
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn get_last_scrape_time_str(&self) -> String {
        const SECS_PER_DAY: u64 = 86400;
        const SECS_PER_HOUR: u64 = 3600;
        const SECS_PER_MINUTE: u64 = 60;

        let last = match self.last_scrape_time.read() {
            Ok(guard) => *guard,
            Err(_) => None,
        };

        match last.and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok()) {
            Some(since_epoch) => {
                let secs = since_epoch.as_secs();
                let hours = (secs % SECS_PER_DAY) / SECS_PER_HOUR;
                let minutes = (secs % SECS_PER_HOUR) / SECS_PER_MINUTE;
                let seconds = secs % SECS_PER_MINUTE;
                format!("{:02}:{:02}:{:02} UTC", hours, minutes, seconds)
            }
            None => "N/A".to_string(),
        }
    }

    pub fn render_table(&self) -> String {
        let (sd_cur, sd_avg, sd_max, sd_min, _) = self.scrape_duration_seconds.snapshot();
        let (so_cur, so_avg, so_max, so_min, _) = self.sources_per_scrape.snapshot();
        let (sa_cur, sa_avg, sa_max, sa_min, _) = self.samples_per_scrape.snapshot();
        let (rs_cur, rs_avg, rs_max, rs_min, _) = self.metrics_response_size_kb.snapshot();

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(out, "HEALTH ENDPOINT - EXPORTER INTERNAL STATS").ok();
        writeln!(out, "==========================================").ok();
        writeln!(out).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "COLLECTION RUNS").ok();
        writeln!(out, "---------------").ok();

        let rows = [
            ("scrape_duration (s)", sd_cur, sd_avg, sd_max, sd_min, 3usize),
            ("sources", so_cur, so_avg, so_max, so_min, 0),
            ("samples", sa_cur, sa_avg, sa_max, sa_min, 0),
            ("response_size (KB)", rs_cur, rs_avg, rs_max, rs_min, 1),
        ];
        for (name, cur, avg, max, min, prec) in rows {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                name,
                format!("{:.prec$}", cur, prec = prec),
                format!("{:.prec$}", avg, prec = prec.max(1)),
                format!("{:.prec$}", max, prec = prec),
                format!("{:.prec$}", min, prec = prec),
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "SOURCE FAILURES (total)").ok();
        writeln!(out, "-----------------------").ok();
        for kind in FailureKind::ALL {
            writeln!(
                out,
                "{:left$} | {:>col$}",
                kind.as_str(),
                self.source_failures(kind),
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "SUMMARY").ok();
        writeln!(out, "-------").ok();
        writeln!(
            out,
            "{:left$} | {:>col$}",
            "total_scrapes",
            self.total_scrapes.load(Ordering::Relaxed),
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(
            out,
            "{:left$} | {:>col$.1}",
            "scrape_success_rate (%)",
            self.get_scrape_success_rate(),
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(
            out,
            "{:left$} | {:>col$}",
            "http_requests (1m)",
            self.http_request_timestamps.count_last_minute(),
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(
            out,
            "{:left$} | {:>col$}",
            "last_scrape",
            self.get_last_scrape_time_str(),
            left = left_col,
            col = col_w
        )
        .ok();

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat() {
        let mut s = RunningStat::default();
        s.add(2.0);
        s.add(4.0);
        s.add(0.0);
        assert_eq!(s.avg(), 2.0);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.last, 0.0);
    }

    #[test]
    fn test_source_failure_buckets() {
        let stats = HealthStats::new();
        stats.record_source_failure(FailureKind::Read);
        stats.record_source_failure(FailureKind::Decode);
        stats.record_source_failure(FailureKind::Decode);
        stats.record_source_failure(FailureKind::Aborted);
        assert_eq!(stats.source_read_errors.load(Ordering::Relaxed), 1);
        assert_eq!(stats.source_decode_errors.load(Ordering::Relaxed), 2);
        assert_eq!(stats.source_aborts.load(Ordering::Relaxed), 1);
        assert_eq!(stats.source_failures(FailureKind::Timeout), 0);
        assert_eq!(stats.total_source_failures(), 4);
    }

    #[test]
    fn test_success_rate() {
        let stats = HealthStats::new();
        assert_eq!(stats.get_scrape_success_rate(), 100.0);
        stats.record_scrape(2, 66, 0.01);
        stats.record_failed_scrape();
        assert_eq!(stats.get_scrape_success_rate(), 50.0);
    }

    #[test]
    fn test_render_table_sections() {
        let stats = HealthStats::new();
        stats.record_scrape(3, 99, 0.25);
        let table = stats.render_table();
        assert!(table.contains("COLLECTION RUNS"));
        assert!(table.contains("SOURCE FAILURES"));
        assert!(table.contains("total_scrapes"));
        assert!(!table.contains("N/A"));
    }
}
