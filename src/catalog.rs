//! Fixed catalog of exported uWSGI stats.
//!
//! Each hierarchy level (top, socket, worker, app, core) has an accessor enum
//! implementing [`StatField`]. Reading a field is an exhaustive `match`, so
//! every catalog entry is guaranteed to resolve against the document model.
//! [`MetricCatalog::new`] checks the naming and uniqueness rules once at
//! startup; a violation is a build defect and aborts the exporter.

use std::collections::HashSet;
use std::fmt;

use crate::error::ExporterError;
use crate::stats::{AppStats, CoreStats, SocketStats, StatsSnapshot, WorkerStats};

pub const NAMESPACE: &str = "uwsgi_stats";
const COUNTER_SUFFIX: &str = "_total";

pub const SOURCE_LABELS: &[&str] = &["type", "address", "identifier"];
pub const SCRAPE_LABELS: &[&str] = &["type", "address", "identifier", "uwsgi_version"];
pub const SOCKET_LABELS: &[&str] = &["type", "address", "identifier", "name", "proto"];
pub const WORKER_LABELS: &[&str] = &["type", "address", "identifier", "worker_id", "status"];
pub const APP_LABELS: &[&str] = &[
    "type",
    "address",
    "identifier",
    "worker_id",
    "status",
    "app_id",
    "mountpoint",
    "chdir",
];
pub const CORE_LABELS: &[&str] = &[
    "type",
    "address",
    "identifier",
    "worker_id",
    "status",
    "core_id",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Gauge => f.write_str("gauge"),
            MetricKind::Counter => f.write_str("counter"),
        }
    }
}

/// Position of a stat in the document hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Top,
    Socket,
    Worker,
    App,
    Core,
}

impl Level {
    pub fn prefix(&self) -> &'static str {
        match self {
            Level::Top => "uwsgi_stats_",
            Level::Socket => "uwsgi_stats_socket_",
            Level::Worker => "uwsgi_stats_worker_",
            Level::App => "uwsgi_stats_worker_app_",
            Level::Core => "uwsgi_stats_worker_core_",
        }
    }

    /// Label names, ancestor identity labels first.
    pub fn label_names(&self) -> &'static [&'static str] {
        match self {
            Level::Top => SOURCE_LABELS,
            Level::Socket => SOCKET_LABELS,
            Level::Worker => WORKER_LABELS,
            Level::App => APP_LABELS,
            Level::Core => CORE_LABELS,
        }
    }
}

/// Name, help, type and label shape of one exported metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub label_names: &'static [&'static str],
}

/// Emitted once per successfully read source, value 1.
pub const SCRAPES: MetricDesc = MetricDesc {
    name: "uwsgi_stats_scrapes_total",
    help: "Number of times stats are scraped",
    kind: MetricKind::Counter,
    label_names: SCRAPE_LABELS,
};

/// Emitted once per source that could not be read or decoded, value 1.
pub const READ_ERRORS: MetricDesc = MetricDesc {
    name: "uwsgi_stats_read_error_total",
    help: "Problems reading stats",
    kind: MetricKind::Counter,
    label_names: SOURCE_LABELS,
};

/// Static accessor for one numeric field at one level.
pub trait StatField: Copy + fmt::Debug + 'static {
    type Source;
    const LEVEL: Level;

    /// Document key of the field.
    fn field_name(&self) -> &'static str;

    fn value(&self, source: &Self::Source) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopField {
    ListenQueue,
    ListenQueueErrors,
    SignalQueue,
    Load,
}

impl StatField for TopField {
    type Source = StatsSnapshot;
    const LEVEL: Level = Level::Top;

    fn field_name(&self) -> &'static str {
        match self {
            TopField::ListenQueue => "listen_queue",
            TopField::ListenQueueErrors => "listen_queue_errors",
            TopField::SignalQueue => "signal_queue",
            TopField::Load => "load",
        }
    }

    fn value(&self, s: &StatsSnapshot) -> u64 {
        match self {
            TopField::ListenQueue => s.listen_queue,
            TopField::ListenQueueErrors => s.listen_queue_errors,
            TopField::SignalQueue => s.signal_queue,
            TopField::Load => s.load,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketField {
    Queue,
    MaxQueue,
    Shared,
    CanOffload,
}

impl StatField for SocketField {
    type Source = SocketStats;
    const LEVEL: Level = Level::Socket;

    fn field_name(&self) -> &'static str {
        match self {
            SocketField::Queue => "queue",
            SocketField::MaxQueue => "max_queue",
            SocketField::Shared => "shared",
            SocketField::CanOffload => "can_offload",
        }
    }

    fn value(&self, s: &SocketStats) -> u64 {
        match self {
            SocketField::Queue => s.queue,
            SocketField::MaxQueue => s.max_queue,
            SocketField::Shared => s.shared,
            SocketField::CanOffload => s.can_offload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerField {
    Accepting,
    Requests,
    DeltaRequests,
    Exceptions,
    HarakiriCount,
    Signals,
    SignalQueue,
    Rss,
    Vsz,
    RunningTime,
    LastSpawn,
    RespawnCount,
    Tx,
    AvgRt,
}

impl StatField for WorkerField {
    type Source = WorkerStats;
    const LEVEL: Level = Level::Worker;

    fn field_name(&self) -> &'static str {
        match self {
            WorkerField::Accepting => "accepting",
            WorkerField::Requests => "requests",
            WorkerField::DeltaRequests => "delta_requests",
            WorkerField::Exceptions => "exceptions",
            WorkerField::HarakiriCount => "harakiri_count",
            WorkerField::Signals => "signals",
            WorkerField::SignalQueue => "signal_queue",
            WorkerField::Rss => "rss",
            WorkerField::Vsz => "vsz",
            WorkerField::RunningTime => "running_time",
            WorkerField::LastSpawn => "last_spawn",
            WorkerField::RespawnCount => "respawn_count",
            WorkerField::Tx => "tx",
            WorkerField::AvgRt => "avg_rt",
        }
    }

    fn value(&self, w: &WorkerStats) -> u64 {
        match self {
            WorkerField::Accepting => w.accepting,
            WorkerField::Requests => w.requests,
            WorkerField::DeltaRequests => w.delta_requests,
            WorkerField::Exceptions => w.exceptions,
            WorkerField::HarakiriCount => w.harakiri_count,
            WorkerField::Signals => w.signals,
            WorkerField::SignalQueue => w.signal_queue,
            WorkerField::Rss => w.rss,
            WorkerField::Vsz => w.vsz,
            WorkerField::RunningTime => w.running_time,
            WorkerField::LastSpawn => w.last_spawn,
            WorkerField::RespawnCount => w.respawn_count,
            WorkerField::Tx => w.tx,
            WorkerField::AvgRt => w.avg_rt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppField {
    StartupTime,
    Requests,
    Exceptions,
}

impl StatField for AppField {
    type Source = AppStats;
    const LEVEL: Level = Level::App;

    fn field_name(&self) -> &'static str {
        match self {
            AppField::StartupTime => "startup_time",
            AppField::Requests => "requests",
            AppField::Exceptions => "exceptions",
        }
    }

    fn value(&self, a: &AppStats) -> u64 {
        match self {
            AppField::StartupTime => a.startup_time,
            AppField::Requests => a.requests,
            AppField::Exceptions => a.exceptions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreField {
    Requests,
    StaticRequests,
    RoutedRequests,
    OffloadedRequests,
    WriteErrors,
    ReadErrors,
    InRequests,
}

impl StatField for CoreField {
    type Source = CoreStats;
    const LEVEL: Level = Level::Core;

    fn field_name(&self) -> &'static str {
        match self {
            CoreField::Requests => "requests",
            CoreField::StaticRequests => "static_requests",
            CoreField::RoutedRequests => "routed_requests",
            CoreField::OffloadedRequests => "offloaded_requests",
            CoreField::WriteErrors => "write_errors",
            CoreField::ReadErrors => "read_errors",
            CoreField::InRequests => "in_requests",
        }
    }

    fn value(&self, c: &CoreStats) -> u64 {
        match self {
            CoreField::Requests => c.requests,
            CoreField::StaticRequests => c.static_requests,
            CoreField::RoutedRequests => c.routed_requests,
            CoreField::OffloadedRequests => c.offloaded_requests,
            CoreField::WriteErrors => c.write_errors,
            CoreField::ReadErrors => c.read_errors,
            CoreField::InRequests => c.in_requests,
        }
    }
}

/// One exported field: where it is read from and how it is published.
#[derive(Debug, Clone, Copy)]
pub struct StatDefinition<F> {
    pub field: F,
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
}

impl<F> StatDefinition<F> {
    const fn gauge(field: F, name: &'static str, help: &'static str) -> Self {
        Self {
            field,
            name,
            help,
            kind: MetricKind::Gauge,
        }
    }

    const fn counter(field: F, name: &'static str, help: &'static str) -> Self {
        Self {
            field,
            name,
            help,
            kind: MetricKind::Counter,
        }
    }
}

impl<F: StatField> StatDefinition<F> {
    pub fn desc(&self) -> MetricDesc {
        MetricDesc {
            name: self.name,
            help: self.help,
            kind: self.kind,
            label_names: F::LEVEL.label_names(),
        }
    }

    /// The metric name the naming convention requires for this entry.
    fn expected_name(&self) -> String {
        let suffix = match self.kind {
            MetricKind::Counter => COUNTER_SUFFIX,
            MetricKind::Gauge => "",
        };
        format!("{}{}{}", F::LEVEL.prefix(), self.field.field_name(), suffix)
    }
}

pub static TOP_STATS: &[StatDefinition<TopField>] = &[
    StatDefinition::gauge(
        TopField::ListenQueue,
        "uwsgi_stats_listen_queue",
        "Length of listen queue.",
    ),
    StatDefinition::gauge(
        TopField::ListenQueueErrors,
        "uwsgi_stats_listen_queue_errors",
        "Number of listen queue errors.",
    ),
    StatDefinition::gauge(
        TopField::SignalQueue,
        "uwsgi_stats_signal_queue",
        "Length of signal queue.",
    ),
    StatDefinition::gauge(TopField::Load, "uwsgi_stats_load", "Load."),
];

pub static SOCKET_STATS: &[StatDefinition<SocketField>] = &[
    StatDefinition::gauge(
        SocketField::Queue,
        "uwsgi_stats_socket_queue",
        "Length of socket queue.",
    ),
    StatDefinition::gauge(
        SocketField::MaxQueue,
        "uwsgi_stats_socket_max_queue",
        "Maximum length of socket queue.",
    ),
    StatDefinition::gauge(
        SocketField::Shared,
        "uwsgi_stats_socket_shared",
        "Is the socket shared?",
    ),
    StatDefinition::gauge(
        SocketField::CanOffload,
        "uwsgi_stats_socket_can_offload",
        "Can socket offload?",
    ),
];

pub static WORKER_STATS: &[StatDefinition<WorkerField>] = &[
    StatDefinition::gauge(
        WorkerField::Accepting,
        "uwsgi_stats_worker_accepting",
        "Is this worker accepting requests?",
    ),
    StatDefinition::counter(
        WorkerField::Requests,
        "uwsgi_stats_worker_requests_total",
        "Number of requests.",
    ),
    StatDefinition::counter(
        WorkerField::DeltaRequests,
        "uwsgi_stats_worker_delta_requests_total",
        "Number of delta requests.",
    ),
    StatDefinition::counter(
        WorkerField::Exceptions,
        "uwsgi_stats_worker_exceptions_total",
        "Number of exceptions.",
    ),
    StatDefinition::counter(
        WorkerField::HarakiriCount,
        "uwsgi_stats_worker_harakiri_count_total",
        "Number of harakiri attempts.",
    ),
    StatDefinition::counter(
        WorkerField::Signals,
        "uwsgi_stats_worker_signals_total",
        "Number of signals.",
    ),
    StatDefinition::gauge(
        WorkerField::SignalQueue,
        "uwsgi_stats_worker_signal_queue",
        "Length of signal queue.",
    ),
    StatDefinition::gauge(WorkerField::Rss, "uwsgi_stats_worker_rss", "Worker RSS bytes."),
    StatDefinition::gauge(WorkerField::Vsz, "uwsgi_stats_worker_vsz", "Worker VSZ bytes."),
    StatDefinition::gauge(
        WorkerField::RunningTime,
        "uwsgi_stats_worker_running_time",
        "Worker running time.",
    ),
    StatDefinition::gauge(
        WorkerField::LastSpawn,
        "uwsgi_stats_worker_last_spawn",
        "Last worker respawn time.",
    ),
    StatDefinition::counter(
        WorkerField::RespawnCount,
        "uwsgi_stats_worker_respawn_count_total",
        "Worker respawn count.",
    ),
    StatDefinition::gauge(WorkerField::Tx, "uwsgi_stats_worker_tx", "Worker transmitted bytes."),
    StatDefinition::gauge(
        WorkerField::AvgRt,
        "uwsgi_stats_worker_avg_rt",
        "Worker average response time.",
    ),
];

pub static APP_STATS: &[StatDefinition<AppField>] = &[
    StatDefinition::gauge(
        AppField::StartupTime,
        "uwsgi_stats_worker_app_startup_time",
        "How long this app took to start.",
    ),
    StatDefinition::counter(
        AppField::Requests,
        "uwsgi_stats_worker_app_requests_total",
        "Number of requests.",
    ),
    StatDefinition::counter(
        AppField::Exceptions,
        "uwsgi_stats_worker_app_exceptions_total",
        "Number of exceptions.",
    ),
];

pub static CORE_STATS: &[StatDefinition<CoreField>] = &[
    StatDefinition::counter(
        CoreField::Requests,
        "uwsgi_stats_worker_core_requests_total",
        "Number of requests.",
    ),
    StatDefinition::counter(
        CoreField::StaticRequests,
        "uwsgi_stats_worker_core_static_requests_total",
        "Number of static requests.",
    ),
    StatDefinition::counter(
        CoreField::RoutedRequests,
        "uwsgi_stats_worker_core_routed_requests_total",
        "Number of routed requests.",
    ),
    StatDefinition::counter(
        CoreField::OffloadedRequests,
        "uwsgi_stats_worker_core_offloaded_requests_total",
        "Number of requests offloaded to threads.",
    ),
    StatDefinition::counter(
        CoreField::WriteErrors,
        "uwsgi_stats_worker_core_write_errors_total",
        "Number of write errors.",
    ),
    StatDefinition::counter(
        CoreField::ReadErrors,
        "uwsgi_stats_worker_core_read_errors_total",
        "Number of read errors.",
    ),
    StatDefinition::counter(
        CoreField::InRequests,
        "uwsgi_stats_worker_core_in_requests_total",
        "Number of requests in.",
    ),
];

/// The validated, read-only stat table shared by every collection run.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    pub top: &'static [StatDefinition<TopField>],
    pub socket: &'static [StatDefinition<SocketField>],
    pub worker: &'static [StatDefinition<WorkerField>],
    pub app: &'static [StatDefinition<AppField>],
    pub core: &'static [StatDefinition<CoreField>],
}

impl MetricCatalog {
    /// Builds the catalog and checks it. Errors are build defects.
    pub fn new() -> Result<Self, ExporterError> {
        let catalog = Self {
            top: TOP_STATS,
            socket: SOCKET_STATS,
            worker: WORKER_STATS,
            app: APP_STATS,
            core: CORE_STATS,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Every metric this catalog can emit, bookkeeping metrics first.
    pub fn descriptors(&self) -> Vec<MetricDesc> {
        let mut descs = vec![SCRAPES, READ_ERRORS];
        descs.extend(self.top.iter().map(StatDefinition::desc));
        descs.extend(self.socket.iter().map(StatDefinition::desc));
        descs.extend(self.worker.iter().map(StatDefinition::desc));
        descs.extend(self.app.iter().map(StatDefinition::desc));
        descs.extend(self.core.iter().map(StatDefinition::desc));
        descs
    }

    pub fn len(&self) -> usize {
        self.top.len() + self.socket.len() + self.worker.len() + self.app.len() + self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self) -> Result<(), ExporterError> {
        check_level(self.top)?;
        check_level(self.socket)?;
        check_level(self.worker)?;
        check_level(self.app)?;
        check_level(self.core)?;

        let mut seen = HashSet::new();
        for desc in self.descriptors() {
            if !is_valid_metric_name(desc.name) {
                return Err(ExporterError::CatalogDefect(format!(
                    "'{}' is not a valid metric name",
                    desc.name
                )));
            }
            if !desc.name.starts_with(NAMESPACE) {
                return Err(ExporterError::CatalogDefect(format!(
                    "'{}' is outside the {} namespace",
                    desc.name, NAMESPACE
                )));
            }
            if desc.help.is_empty() {
                return Err(ExporterError::CatalogDefect(format!(
                    "'{}' has no help text",
                    desc.name
                )));
            }
            if !seen.insert(desc.name) {
                return Err(ExporterError::CatalogDefect(format!(
                    "'{}' is defined more than once",
                    desc.name
                )));
            }
        }
        Ok(())
    }
}

fn check_level<F: StatField + Eq + std::hash::Hash>(
    defs: &[StatDefinition<F>],
) -> Result<(), ExporterError> {
    let mut fields = HashSet::new();
    for def in defs {
        let expected = def.expected_name();
        if def.name != expected {
            return Err(ExporterError::CatalogDefect(format!(
                "{:?} stat {:?} is named '{}', expected '{}'",
                F::LEVEL,
                def.field,
                def.name,
                expected
            )));
        }
        if !fields.insert(def.field) {
            return Err(ExporterError::CatalogDefect(format!(
                "{:?} stat {:?} is exported twice",
                F::LEVEL,
                def.field
            )));
        }
    }
    Ok(())
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    fn keys_of<T: Serialize + Default>() -> Vec<String> {
        match serde_json::to_value(T::default()).unwrap() {
            serde_json::Value::Object(map) => map.keys().cloned().collect(),
            other => panic!("expected object, got {other}"),
        }
    }

    fn assert_fields_exist<F: StatField>(defs: &[StatDefinition<F>], keys: &[String]) {
        for def in defs {
            let name = def.field.field_name();
            assert!(
                keys.iter().any(|k| k == name),
                "{name} is not a key of the {:?} document",
                F::LEVEL
            );
        }
    }

    #[test]
    fn test_catalog_builds() {
        let catalog = MetricCatalog::new().unwrap();
        assert_eq!(catalog.top.len(), 4);
        assert_eq!(catalog.socket.len(), 4);
        assert_eq!(catalog.worker.len(), 14);
        assert_eq!(catalog.app.len(), 3);
        assert_eq!(catalog.core.len(), 7);
        assert_eq!(catalog.len(), 32);
        assert_eq!(catalog.descriptors().len(), 34);
    }

    #[test]
    fn test_field_names_match_document_keys() {
        let catalog = MetricCatalog::new().unwrap();
        assert_fields_exist(catalog.top, &keys_of::<StatsSnapshot>());
        assert_fields_exist(catalog.socket, &keys_of::<SocketStats>());
        assert_fields_exist(catalog.worker, &keys_of::<WorkerStats>());
        assert_fields_exist(catalog.app, &keys_of::<AppStats>());
        assert_fields_exist(catalog.core, &keys_of::<CoreStats>());
    }

    #[test]
    fn test_counters_end_in_total() {
        let catalog = MetricCatalog::new().unwrap();
        for desc in catalog.descriptors() {
            match desc.kind {
                MetricKind::Counter => assert!(desc.name.ends_with("_total"), "{}", desc.name),
                MetricKind::Gauge => assert!(!desc.name.ends_with("_total"), "{}", desc.name),
            }
        }
    }

    #[test]
    fn test_identity_labels_lead() {
        for level in [Level::Top, Level::Socket, Level::Worker, Level::App, Level::Core] {
            assert_eq!(&level.label_names()[..3], SOURCE_LABELS);
        }
        assert_eq!(&APP_LABELS[..5], WORKER_LABELS);
        assert_eq!(&CORE_LABELS[..5], WORKER_LABELS);
    }

    #[test]
    fn test_misnamed_definition_is_defect() {
        let bad = [StatDefinition::gauge(TopField::Load, "uwsgi_stats_loadavg", "Load.")];
        let err = check_level(&bad).unwrap_err();
        assert!(matches!(err, ExporterError::CatalogDefect(_)));
    }

    #[test]
    fn test_duplicate_field_is_defect() {
        let bad = [
            StatDefinition::gauge(TopField::Load, "uwsgi_stats_load", "Load."),
            StatDefinition::gauge(TopField::Load, "uwsgi_stats_load", "Load again."),
        ];
        assert!(check_level(&bad).is_err());
    }

    #[test]
    fn test_metric_name_charset() {
        assert!(is_valid_metric_name("uwsgi_stats_load"));
        assert!(!is_valid_metric_name("9lives"));
        assert!(!is_valid_metric_name("has-dash"));
        assert!(!is_valid_metric_name(""));
    }
}
