//! Expansion of a resolved address into concrete stats sources.

use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use crate::address::{SourceDescriptor, SourceKind};
use crate::error::ExporterError;

/// Kind of a single, non-glob endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConcreteKind {
    File,
    Socket,
}

impl ConcreteKind {
    /// Value of the `type` label for metrics from this source.
    pub fn label(&self) -> &'static str {
        match self {
            ConcreteKind::File => "file",
            ConcreteKind::Socket => "unix",
        }
    }
}

impl fmt::Display for ConcreteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One real endpoint to read stats from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConcreteSource {
    pub kind: ConcreteKind,
    pub address: String,
    /// Final path segment of `address`.
    pub identifier: String,
}

impl ConcreteSource {
    pub fn new(kind: ConcreteKind, address: impl Into<String>) -> Self {
        let address = address.into();
        let identifier = identifier_for(&address);
        Self {
            kind,
            address,
            identifier,
        }
    }
}

fn identifier_for(address: &str) -> String {
    Path::new(address)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| address.to_string())
}

/// Checks that a glob location compiles, without touching the filesystem.
pub fn validate_pattern(pattern: &str) -> Result<(), ExporterError> {
    glob::Pattern::new(pattern)
        .map(|_| ())
        .map_err(|source| ExporterError::GlobSyntax {
            pattern: pattern.to_string(),
            source,
        })
}

/// Lists the concrete sources behind a descriptor.
///
/// Globs are expanded against the filesystem on every call, so sockets that
/// appear or disappear between scrapes are picked up. A glob with no matches
/// yields an empty list. Matches come back in the sorted order `glob` produces.
pub fn enumerate(descriptor: &SourceDescriptor) -> Result<Vec<ConcreteSource>, ExporterError> {
    match descriptor.kind {
        SourceKind::File => Ok(vec![ConcreteSource::new(
            ConcreteKind::File,
            &descriptor.location,
        )]),
        SourceKind::Socket => Ok(vec![ConcreteSource::new(
            ConcreteKind::Socket,
            &descriptor.location,
        )]),
        SourceKind::FileGlob => expand(&descriptor.location, ConcreteKind::File),
        SourceKind::SocketGlob => expand(&descriptor.location, ConcreteKind::Socket),
        SourceKind::Http => Err(ExporterError::UnsupportedSource {
            scheme: descriptor.kind.scheme().to_string(),
            address: descriptor.location.clone(),
        }),
    }
}

fn expand(pattern: &str, kind: ConcreteKind) -> Result<Vec<ConcreteSource>, ExporterError> {
    let paths = glob::glob(pattern).map_err(|source| ExporterError::GlobSyntax {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut sources = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => sources.push(ConcreteSource::new(kind, path.to_string_lossy())),
            Err(e) => warn!("Skipping unreadable glob match for {}: {}", pattern, e),
        }
    }

    debug!("Glob {} expanded to {} {} source(s)", pattern, sources.len(), kind);
    Ok(sources)
}
