//! uWSGI stats document model and decoder.
//!
//! Mirrors the JSON emitted by the uWSGI stats server. Keys missing from the
//! document decode to zero or empty since uWSGI versions differ in what they
//! report; values of the wrong JSON type are decode errors.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Top-level stats document of one uWSGI instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    pub version: String,
    pub listen_queue: u64,
    pub listen_queue_errors: u64,
    pub signal_queue: u64,
    pub load: u64,
    pub pid: u64,
    pub uid: u64,
    pub gid: u64,
    pub cwd: String,
    pub sockets: Vec<SocketStats>,
    pub workers: Vec<WorkerStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketStats {
    pub name: String,
    pub proto: String,
    pub queue: u64,
    pub max_queue: u64,
    pub shared: u64,
    pub can_offload: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerStats {
    pub id: u64,
    pub pid: u64,
    pub accepting: u64,
    pub requests: u64,
    pub delta_requests: u64,
    pub exceptions: u64,
    pub harakiri_count: u64,
    pub signals: u64,
    pub signal_queue: u64,
    pub status: String,
    pub rss: u64,
    pub vsz: u64,
    pub running_time: u64,
    pub last_spawn: u64,
    pub respawn_count: u64,
    pub tx: u64,
    pub avg_rt: u64,
    pub apps: Vec<AppStats>,
    pub cores: Vec<CoreStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppStats {
    pub id: u64,
    pub modifier1: u64,
    pub mountpoint: String,
    pub startup_time: u64,
    pub requests: u64,
    pub exceptions: u64,
    pub chdir: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreStats {
    pub id: u64,
    pub requests: u64,
    pub static_requests: u64,
    pub routed_requests: u64,
    pub offloaded_requests: u64,
    pub write_errors: u64,
    pub read_errors: u64,
    /// uWSGI itself writes this key as `in_request`.
    #[serde(alias = "in_request")]
    pub in_requests: u64,
    pub vars: Vec<String>,
}

/// Decodes a complete stats document.
pub fn decode(bytes: &[u8]) -> Result<StatsSnapshot, SourceError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Returns true once `buf` holds one full JSON value, or bytes that can never
/// become one. Used to stop reading a stream without waiting for the peer to
/// close.
pub fn is_complete(buf: &[u8]) -> bool {
    let mut values = serde_json::Deserializer::from_slice(buf).into_iter::<IgnoredAny>();
    match values.next() {
        None => false,
        Some(Ok(_)) => true,
        Some(Err(e)) => !e.is_eof(),
    }
}
