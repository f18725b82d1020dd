//! Retrieval of raw stats documents from concrete sources.
//!
//! Files are read whole. Sockets are read until the buffer holds a complete
//! JSON document or the peer closes, whichever comes first. Every fetch runs
//! under a deadline so a stalled peer only costs its own source.

use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::net::UnixStream;
use tracing::{debug, trace};

use crate::error::SourceError;
use crate::source::{ConcreteKind, ConcreteSource};
use crate::stats::{self, StatsSnapshot};

/// Initial buffer reservation for socket reads.
const READ_CHUNK: usize = 16 * 1024;

/// Default per-source fetch deadline.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Outcome of reading one concrete source. Produced fresh on every run.
#[derive(Debug)]
pub struct ReadResult {
    pub source: ConcreteSource,
    pub outcome: Result<StatsSnapshot, SourceError>,
}

impl ReadResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Fetches and decodes one source. Never fails: errors end up in the outcome.
pub async fn read_source(source: ConcreteSource, options: FetchOptions) -> ReadResult {
    let start = Instant::now();
    let outcome = match fetch(&source, options).await {
        Ok(bytes) => stats::decode(&bytes),
        Err(e) => Err(e),
    };
    debug!(
        "Read {} source {} in {:.2}ms (ok: {})",
        source.kind,
        source.address,
        start.elapsed().as_secs_f64() * 1000.0,
        outcome.is_ok()
    );
    ReadResult { source, outcome }
}

/// Retrieves the raw document bytes for one source within the deadline.
pub async fn fetch(source: &ConcreteSource, options: FetchOptions) -> Result<Vec<u8>, SourceError> {
    let read = async {
        match source.kind {
            ConcreteKind::File => read_file(&source.address).await,
            ConcreteKind::Socket => read_socket(&source.address).await,
        }
    };

    tokio::time::timeout(options.timeout, read)
        .await
        .map_err(|_| SourceError::Timeout {
            address: source.address.clone(),
            limit: options.timeout,
        })?
}

async fn read_file(path: &str) -> Result<Vec<u8>, SourceError> {
    tokio::fs::read(path).await.map_err(|source| SourceError::Read {
        address: path.to_string(),
        source,
    })
}

async fn read_socket(path: &str) -> Result<Vec<u8>, SourceError> {
    let read_err = |source| SourceError::Read {
        address: path.to_string(),
        source,
    };

    let mut stream = UnixStream::connect(path).await.map_err(read_err)?;
    let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);

    loop {
        buf.reserve(READ_CHUNK);
        let n = stream.read_buf(&mut buf).await.map_err(read_err)?;
        if n == 0 {
            trace!("Peer {} closed after {} bytes", path, buf.len());
            break;
        }
        if stats::is_complete(&buf) {
            trace!("Complete document from {} after {} bytes", path, buf.len());
            break;
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn test_read_file_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.json");
        std::fs::write(&path, r#"{"version": "2.0", "load": 7}"#).unwrap();

        let source = ConcreteSource::new(ConcreteKind::File, path.to_string_lossy());
        let result = read_source(source, FetchOptions::default()).await;
        let snap = result.outcome.unwrap();
        assert_eq!(snap.load, 7);
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.json");
        let source = ConcreteSource::new(ConcreteKind::File, path.to_string_lossy());

        let result = read_source(source, FetchOptions::default()).await;
        assert!(matches!(result.outcome, Err(SourceError::Read { .. })));
    }

    #[tokio::test]
    async fn test_socket_read_until_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uwsgi.sock");
        let listener = UnixListener::bind(&path).unwrap();

        tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            conn.write_all(br#"{"version": "2.0","#).await.unwrap();
            conn.write_all(br#" "listen_queue": 5}"#).await.unwrap();
        });

        let source = ConcreteSource::new(ConcreteKind::Socket, path.to_string_lossy());
        let snap = read_source(source, FetchOptions::default())
            .await
            .outcome
            .unwrap();
        assert_eq!(snap.listen_queue, 5);
    }

    #[tokio::test]
    async fn test_socket_complete_document_without_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("open.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            conn.write_all(br#"{"version": "2.0"}"#).await.unwrap();
            // Hold the connection open until the reader is done.
            let _ = done_rx.await;
        });

        let source = ConcreteSource::new(ConcreteKind::Socket, path.to_string_lossy());
        let options = FetchOptions {
            timeout: Duration::from_secs(2),
        };
        let result = read_source(source, options).await;
        let _ = done_tx.send(());
        assert_eq!(result.outcome.unwrap().version, "2.0");
    }

    #[tokio::test]
    async fn test_stalled_socket_times_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stalled.sock");
        let listener = UnixListener::bind(&path).unwrap();

        tokio::spawn(async move {
            let (_conn, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let source = ConcreteSource::new(ConcreteKind::Socket, path.to_string_lossy());
        let options = FetchOptions {
            timeout: Duration::from_millis(100),
        };
        let result = read_source(source, options).await;
        assert!(matches!(result.outcome, Err(SourceError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_connect_refused_is_read_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nobody.sock");
        let source = ConcreteSource::new(ConcreteKind::Socket, path.to_string_lossy());

        let result = read_source(source, FetchOptions::default()).await;
        assert!(matches!(result.outcome, Err(SourceError::Read { .. })));
    }
}
