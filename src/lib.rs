//! uWSGI stats exporter library
//!
//! Reads the JSON documents served by uWSGI stats servers and turns them into
//! flat, labeled Prometheus samples. The HTTP surface lives in the binary;
//! everything needed to run a collection lives here.
//!
//! # Pipeline
//!
//! - [`address`]: parse `scheme://path` into a [`SourceDescriptor`]
//! - [`source`]: expand globs into [`ConcreteSource`]s
//! - [`fetch`]: read bytes from a file or unix socket under a deadline
//! - [`stats`]: decode the document into a [`StatsSnapshot`]
//! - [`catalog`]: the fixed table of exported stats
//! - [`projector`]: walk a snapshot and emit [`MetricSample`]s
//! - [`collector`]: run all of the above for every source of one scrape
//!
//! # Usage
//!
//! ```rust,no_run
//! use uwsgi_stats_exporter::{CollectorOptions, MetricCatalog, StatsCollector};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = MetricCatalog::new()?;
//! let collector = StatsCollector::new(
//!     "unixglob:///run/uwsgi/*.stats.sock",
//!     catalog,
//!     CollectorOptions::default(),
//! )?;
//!
//! let samples = collector.collect().await?;
//! for sample in &samples {
//!     println!("{} {:?} {}", sample.name(), sample.label_values, sample.value);
//! }
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod catalog;
pub mod collector;
pub mod error;
pub mod exposition;
pub mod fetch;
pub mod health_stats;
pub mod projector;
pub mod source;
pub mod stats;

// Re-export main types for convenience
pub use address::{SourceDescriptor, SourceKind};
pub use catalog::{MetricCatalog, MetricDesc, MetricKind};
pub use collector::{CollectionRun, CollectorOptions, StatsCollector};
pub use error::{ExporterError, FailureKind, SourceError};
pub use fetch::{FetchOptions, ReadResult};
pub use health_stats::HealthStats;
pub use projector::MetricSample;
pub use source::{ConcreteKind, ConcreteSource};
pub use stats::StatsSnapshot;
