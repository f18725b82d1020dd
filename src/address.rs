//! Stats source address parsing.
//!
//! A configured address has the form `scheme://path`. The scheme picks the
//! fetch strategy; the path is a file, a unix socket, or a glob over either.

use std::fmt;
use std::str::FromStr;

use crate::error::ExporterError;

const SEPARATOR: &str = "://";

/// How a configured address is to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    File,
    FileGlob,
    Socket,
    SocketGlob,
    Http,
}

impl SourceKind {
    /// The address scheme that selects this kind.
    pub fn scheme(&self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::FileGlob => "fileglob",
            SourceKind::Socket => "unix",
            SourceKind::SocketGlob => "unixglob",
            SourceKind::Http => "http",
        }
    }

    pub fn is_glob(&self) -> bool {
        matches!(self, SourceKind::FileGlob | SourceKind::SocketGlob)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// A parsed stats address. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    /// Path portion for file and unix schemes, the full address for `http`.
    pub location: String,
}

impl SourceDescriptor {
    /// Parses `scheme://path` into a descriptor.
    pub fn resolve(address: &str) -> Result<Self, ExporterError> {
        let (scheme, path) = address
            .split_once(SEPARATOR)
            .ok_or_else(|| ExporterError::AddressParse {
                address: address.to_string(),
                reason: format!("missing '{SEPARATOR}' separator"),
            })?;

        let kind = match scheme {
            "file" => SourceKind::File,
            "fileglob" => SourceKind::FileGlob,
            "unix" => SourceKind::Socket,
            "unixglob" => SourceKind::SocketGlob,
            "http" => SourceKind::Http,
            other => {
                return Err(ExporterError::AddressParse {
                    address: address.to_string(),
                    reason: format!(
                        "unknown scheme '{other}', expected one of file, fileglob, unix, unixglob, http"
                    ),
                })
            }
        };

        let location = match kind {
            SourceKind::Http => address.to_string(),
            _ => path.to_string(),
        };

        Ok(Self { kind, location })
    }
}

impl FromStr for SourceDescriptor {
    type Err = ExporterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SourceKind::Http => f.write_str(&self.location),
            kind => write!(f, "{}{}{}", kind.scheme(), SEPARATOR, self.location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_each_scheme() {
        let cases = [
            ("file:///var/run/stats.json", SourceKind::File, "/var/run/stats.json"),
            ("fileglob:///var/run/*.json", SourceKind::FileGlob, "/var/run/*.json"),
            ("unix:///tmp/uwsgi.sock", SourceKind::Socket, "/tmp/uwsgi.sock"),
            ("unixglob:///tmp/*.sock", SourceKind::SocketGlob, "/tmp/*.sock"),
            ("unix://uwsgi.sock", SourceKind::Socket, "uwsgi.sock"),
        ];

        for (address, kind, location) in cases {
            let desc = SourceDescriptor::resolve(address).unwrap();
            assert_eq!(desc.kind, kind, "kind for {address}");
            assert_eq!(desc.location, location, "location for {address}");
        }
    }

    #[test]
    fn test_http_keeps_full_address() {
        let desc = SourceDescriptor::resolve("http://127.0.0.1:1717").unwrap();
        assert_eq!(desc.kind, SourceKind::Http);
        assert_eq!(desc.location, "http://127.0.0.1:1717");
    }

    #[test]
    fn test_missing_separator() {
        let err = SourceDescriptor::resolve("/tmp/uwsgi.sock").unwrap_err();
        assert!(matches!(err, ExporterError::AddressParse { .. }));

        let err = SourceDescriptor::resolve("unix:/tmp/uwsgi.sock").unwrap_err();
        assert!(matches!(err, ExporterError::AddressParse { .. }));
    }

    #[test]
    fn test_unknown_scheme() {
        for address in ["tcp://127.0.0.1:1717", "https://example.com", "://x", "UNIX:///a"] {
            let err = SourceDescriptor::resolve(address).unwrap_err();
            assert!(
                matches!(err, ExporterError::AddressParse { .. }),
                "{address} should fail to parse"
            );
        }
    }

    #[test]
    fn test_only_first_separator_splits() {
        let desc: SourceDescriptor = "file:///odd://name.json".parse().unwrap();
        assert_eq!(desc.location, "/odd://name.json");
    }

    #[test]
    fn test_display_round_trips() {
        let desc = SourceDescriptor::resolve("unixglob:///run/*.sock").unwrap();
        assert_eq!(desc.to_string(), "unixglob:///run/*.sock");
        assert!(desc.kind.is_glob());
    }
}
