//! Error types for the stats pipeline.
//!
//! Errors fall into two classes. [`ExporterError`] covers misconfiguration and
//! catalog defects: they abort startup, or the whole scrape when they surface
//! at run time. [`SourceError`] covers everything that can go wrong with a
//! single stats source: it is attached to that source's read result and never
//! affects sibling sources.

use std::fmt;
use std::time::Duration;

/// Fatal errors. The exporter cannot produce meaningful output while one of
/// these is present.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    #[error("Can't parse stats address '{address}': {reason}")]
    AddressParse { address: String, reason: String },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    GlobSyntax {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Metric catalog defect: {0}")]
    CatalogDefect(String),

    #[error("Source scheme '{scheme}' is recognized but not supported: {address}")]
    UnsupportedSource { scheme: String, address: String },

    #[error("Enumerating sources for '{pattern}' did not complete: {reason}")]
    EnumerationAborted { pattern: String, reason: String },
}

/// Per-source failures. Recoverable: the run continues with the other sources
/// and the failing one is reported through its read error counter.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read stats from {address}: {source}")]
    Read {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {limit:?} reading stats from {address}")]
    Timeout { address: String, limit: Duration },

    #[error("Failed to decode stats document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Fetch task for {address} did not complete: {reason}")]
    Aborted { address: String, reason: String },
}

/// Failure class of a [`SourceError`], used for logging and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Read,
    Timeout,
    Decode,
    Aborted,
}

impl FailureKind {
    pub const ALL: [FailureKind; 4] = [
        FailureKind::Read,
        FailureKind::Timeout,
        FailureKind::Decode,
        FailureKind::Aborted,
    ];

    /// Short, stable label for this failure class.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Read => "read",
            FailureKind::Timeout => "timeout",
            FailureKind::Decode => "decode",
            FailureKind::Aborted => "aborted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SourceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SourceError::Read { .. } => FailureKind::Read,
            SourceError::Timeout { .. } => FailureKind::Timeout,
            SourceError::Decode(_) => FailureKind::Decode,
            SourceError::Aborted { .. } => FailureKind::Aborted,
        }
    }
}
