//! Integration tests for health stats module.
//!
//! These tests verify that HealthStats tracks collection runs and source
//! failures the way the /metrics handler reports them.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use uwsgi_stats_exporter::health_stats::HealthStats;
use uwsgi_stats_exporter::{FailureKind, SourceError};

#[test]
fn test_health_stats_initialize_empty() {
    let stats = HealthStats::new();

    let (cur, avg, _, _, count) = stats.scrape_duration_seconds.snapshot();
    assert_eq!(count, 0);
    assert_eq!(cur, 0.0);
    assert_eq!(avg, 0.0);

    assert_eq!(stats.total_scrapes.load(Ordering::Relaxed), 0);
    assert_eq!(stats.failed_scrapes.load(Ordering::Relaxed), 0);
    assert_eq!(stats.total_source_failures(), 0);
    assert_eq!(stats.get_last_scrape_time_str(), "N/A");
    assert_eq!(stats.get_scrape_success_rate(), 100.0);
}

#[test]
fn test_record_scrape_updates_stats() {
    let stats = HealthStats::new();
    stats.record_scrape(2, 66, 0.010);
    stats.record_scrape(4, 132, 0.030);

    let (cur, avg, max, min, count) = stats.sources_per_scrape.snapshot();
    assert_eq!(count, 2);
    assert_eq!(cur, 4.0);
    assert_eq!(avg, 3.0);
    assert_eq!(max, 4.0);
    assert_eq!(min, 2.0);

    let (_, _, max, _, _) = stats.samples_per_scrape.snapshot();
    assert_eq!(max, 132.0);

    assert_eq!(stats.total_scrapes.load(Ordering::Relaxed), 2);
    assert_ne!(stats.get_last_scrape_time_str(), "N/A");
}

#[test]
fn test_failed_scrapes_lower_success_rate() {
    let stats = HealthStats::new();
    stats.record_scrape(1, 33, 0.001);
    stats.record_failed_scrape();

    assert_eq!(stats.total_scrapes.load(Ordering::Relaxed), 2);
    assert_eq!(stats.failed_scrapes.load(Ordering::Relaxed), 1);
    assert_eq!(stats.get_scrape_success_rate(), 50.0);
}

#[test]
fn test_source_failures_by_kind() {
    let stats = HealthStats::new();
    for kind in [
        FailureKind::Read,
        FailureKind::Read,
        FailureKind::Timeout,
        FailureKind::Decode,
        FailureKind::Aborted,
    ] {
        stats.record_source_failure(kind);
    }

    assert_eq!(stats.source_read_errors.load(Ordering::Relaxed), 2);
    assert_eq!(stats.source_timeouts.load(Ordering::Relaxed), 1);
    assert_eq!(stats.source_decode_errors.load(Ordering::Relaxed), 1);
    assert_eq!(stats.source_aborts.load(Ordering::Relaxed), 1);
    assert_eq!(stats.total_source_failures(), 5);

    let table = stats.render_table();
    assert!(table.contains("SOURCE FAILURES (total)"));
    assert!(table.contains("timeout"));
}

#[test]
fn test_source_error_lands_in_its_own_bucket() {
    let stats = HealthStats::new();
    let errors = [
        SourceError::Timeout {
            address: "/run/a.sock".into(),
            limit: std::time::Duration::from_millis(100),
        },
        SourceError::Aborted {
            address: "/run/b.sock".into(),
            reason: "cancelled".into(),
        },
    ];
    for e in &errors {
        stats.record_source_failure(e.kind());
    }

    assert_eq!(stats.source_failures(FailureKind::Timeout), 1);
    assert_eq!(stats.source_failures(FailureKind::Aborted), 1);
    assert_eq!(stats.source_failures(FailureKind::Read), 0);
    assert_eq!(stats.source_failures(FailureKind::Decode), 0);
}

#[test]
fn test_health_stats_thread_safety() {
    let stats = Arc::new(HealthStats::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let stats = Arc::clone(&stats);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    stats.record_scrape(1, 10, 0.001);
                    stats.record_source_failure(FailureKind::Read);
                    stats.record_http_request();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(stats.total_scrapes.load(Ordering::Relaxed), 800);
    assert_eq!(stats.source_read_errors.load(Ordering::Relaxed), 800);
    let (_, _, _, _, count) = stats.samples_per_scrape.snapshot();
    assert_eq!(count, 800);
}
