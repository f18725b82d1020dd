//! Collection runs: one full pass over every configured stats source.
//!
//! The address is resolved once when the collector is built. Sources are
//! re-enumerated on every run so glob matches track sockets coming and going.
//! Each source is fetched in its own task, with at most
//! `max_concurrent_fetches` in flight; all tasks are joined before the run
//! returns and results keep enumeration order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, warn};

use crate::address::SourceDescriptor;
use crate::catalog::MetricCatalog;
use crate::error::{ExporterError, FailureKind, SourceError};
use crate::fetch::{read_source, FetchOptions, ReadResult};
use crate::projector::{project_all, MetricSample};
use crate::source::{enumerate, validate_pattern, ConcreteSource};

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorOptions {
    pub fetch: FetchOptions,
    pub max_concurrent_fetches: usize,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            fetch: FetchOptions::default(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

/// Outcome of one collection run.
#[derive(Debug)]
pub struct CollectionRun {
    pub samples: Vec<MetricSample>,
    /// Concrete sources enumerated for this run.
    pub sources: usize,
    /// Failure kind of every source that could not be read.
    pub failures: Vec<FailureKind>,
    pub duration: Duration,
}

pub struct StatsCollector {
    descriptor: SourceDescriptor,
    catalog: MetricCatalog,
    options: CollectorOptions,
}

impl StatsCollector {
    /// Resolves `address` and checks glob syntax up front.
    pub fn new(
        address: &str,
        catalog: MetricCatalog,
        options: CollectorOptions,
    ) -> Result<Self, ExporterError> {
        let descriptor = SourceDescriptor::resolve(address)?;
        if descriptor.kind.is_glob() {
            validate_pattern(&descriptor.location)?;
        }
        Ok(Self {
            descriptor,
            catalog,
            options,
        })
    }

    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn options(&self) -> CollectorOptions {
        self.options
    }

    /// Concrete sources as of now.
    pub fn sources(&self) -> Result<Vec<ConcreteSource>, ExporterError> {
        enumerate(&self.descriptor)
    }

    /// Glob expansion walks the filesystem, so it runs on the blocking pool.
    async fn enumerate_blocking(&self) -> Result<Vec<ConcreteSource>, ExporterError> {
        let descriptor = self.descriptor.clone();
        task::spawn_blocking(move || enumerate(&descriptor))
            .await
            .map_err(|e| ExporterError::EnumerationAborted {
                pattern: self.descriptor.to_string(),
                reason: e.to_string(),
            })?
    }

    /// Fetches and decodes every source. Only enumeration can fail the run;
    /// per-source failures are carried in the individual results.
    pub async fn read_all(&self) -> Result<Vec<ReadResult>, ExporterError> {
        let sources = self.enumerate_blocking().await?;
        let permits = Arc::new(Semaphore::new(self.options.max_concurrent_fetches.max(1)));
        let fetch = self.options.fetch;

        let mut tasks = JoinSet::new();
        for (idx, source) in sources.iter().cloned().enumerate() {
            let permits = permits.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (idx, read_source(source, fetch).await)
            });
        }

        let mut slots: Vec<Option<ReadResult>> = sources.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => error!("Stats fetch task failed: {}", e),
            }
        }

        let results = slots
            .into_iter()
            .zip(sources)
            .map(|(slot, source)| {
                slot.unwrap_or_else(|| ReadResult {
                    outcome: Err(SourceError::Aborted {
                        address: source.address.clone(),
                        reason: "task panicked or was cancelled".to_string(),
                    }),
                    source,
                })
            })
            .collect();

        Ok(results)
    }

    /// Runs one full collection and projects it into samples.
    pub async fn run(&self) -> Result<CollectionRun, ExporterError> {
        let start = Instant::now();
        let results = self.read_all().await?;

        let mut failures = Vec::new();
        for result in &results {
            if let Err(e) = &result.outcome {
                warn!("Stats source {} failed ({}): {}", result.source.address, e.kind(), e);
                failures.push(e.kind());
            }
        }

        let samples = project_all(&self.catalog, &results);
        let duration = start.elapsed();
        debug!(
            "Collected {} samples from {} source(s), {} failed, in {:.2}ms",
            samples.len(),
            results.len(),
            failures.len(),
            duration.as_secs_f64() * 1000.0
        );

        Ok(CollectionRun {
            samples,
            sources: results.len(),
            failures,
            duration,
        })
    }

    /// Runs one full collection and returns only the samples.
    pub async fn collect(&self) -> Result<Vec<MetricSample>, ExporterError> {
        Ok(self.run().await?.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::SourceKind;

    #[test]
    fn test_new_rejects_bad_address() {
        let catalog = MetricCatalog::new().unwrap();
        let err = StatsCollector::new("nowhere", catalog, CollectorOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, ExporterError::AddressParse { .. }));
    }

    #[test]
    fn test_new_rejects_bad_glob() {
        let catalog = MetricCatalog::new().unwrap();
        let err = StatsCollector::new(
            "unixglob:///tmp/[.sock",
            catalog,
            CollectorOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ExporterError::GlobSyntax { .. }));
    }

    #[tokio::test]
    async fn test_read_all_follows_enumeration_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), r#"{"version": "2.0"}"#).unwrap();
        std::fs::write(dir.path().join("b.json"), "{").unwrap();

        let catalog = MetricCatalog::new().unwrap();
        let address = format!("fileglob://{}/*.json", dir.path().display());
        let collector =
            StatsCollector::new(&address, catalog, CollectorOptions::default()).unwrap();

        let results = collector.read_all().await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_success());
        assert_eq!(
            results[1].outcome.as_ref().unwrap_err().kind(),
            FailureKind::Decode
        );
        assert_eq!(
            results.iter().map(|r| &r.source).collect::<Vec<_>>(),
            collector.sources().unwrap().iter().collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_http_fails_the_run() {
        let catalog = MetricCatalog::new().unwrap();
        let collector =
            StatsCollector::new("http://localhost:1717", catalog, CollectorOptions::default())
                .unwrap();
        assert_eq!(collector.descriptor().kind, SourceKind::Http);

        let err = collector.run().await.unwrap_err();
        assert!(matches!(err, ExporterError::UnsupportedSource { .. }));
    }
}
