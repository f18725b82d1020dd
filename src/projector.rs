//! Projection of decoded stats documents into flat, labeled metric samples.
//!
//! Identity labels flow down the hierarchy: every sample starts with the
//! source's `type`, `address` and `identifier`; worker-level samples add
//! `worker_id` and `status`, and app and core samples keep those worker labels
//! before adding their own. Samples are emitted level by level, definition by
//! definition, in document order within a definition.

use crate::catalog::{
    MetricCatalog, MetricDesc, StatDefinition, StatField, READ_ERRORS, SCRAPES,
};
use crate::fetch::ReadResult;
use crate::stats::{AppStats, CoreStats, StatsSnapshot};

/// One metric instance: descriptor, positional label values and value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub desc: MetricDesc,
    /// Bound positionally to `desc.label_names`.
    pub label_values: Vec<String>,
    pub value: f64,
}

impl MetricSample {
    fn new(desc: MetricDesc, label_values: Vec<String>, value: f64) -> Self {
        debug_assert_eq!(
            desc.label_names.len(),
            label_values.len(),
            "label arity mismatch for {}",
            desc.name
        );
        Self {
            desc,
            label_values,
            value,
        }
    }

    pub fn name(&self) -> &'static str {
        self.desc.name
    }

    /// Value of the named label, if the sample has it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .label_names
            .iter()
            .position(|n| *n == name)
            .and_then(|i| self.label_values.get(i))
            .map(String::as_str)
    }
}

/// Projects every read result, in order.
pub fn project_all(catalog: &MetricCatalog, results: &[ReadResult]) -> Vec<MetricSample> {
    results
        .iter()
        .flat_map(|result| project(catalog, result))
        .collect()
}

/// Projects one source's read result.
///
/// A failed read produces exactly one read-error sample. A successful read
/// produces one scrape sample carrying the uWSGI version, followed by every
/// catalog stat at every level.
pub fn project(catalog: &MetricCatalog, result: &ReadResult) -> Vec<MetricSample> {
    let source = &result.source;
    let base = vec![
        source.kind.label().to_string(),
        source.address.clone(),
        source.identifier.clone(),
    ];

    let snapshot = match &result.outcome {
        Ok(snapshot) => snapshot,
        Err(_) => return vec![MetricSample::new(READ_ERRORS, base, 1.0)],
    };

    let mut out = Vec::with_capacity(expected_len(catalog, snapshot));
    out.push(MetricSample::new(
        SCRAPES,
        extend(&base, [snapshot.version.as_str()]),
        1.0,
    ));

    for def in catalog.top {
        push_stat(&mut out, def, snapshot, base.clone());
    }

    for def in catalog.socket {
        for socket in &snapshot.sockets {
            let labels = extend(&base, [socket.name.as_str(), socket.proto.as_str()]);
            push_stat(&mut out, def, socket, labels);
        }
    }

    let workers: Vec<_> = snapshot
        .workers
        .iter()
        .map(|w| (w, extend(&base, [w.id.to_string().as_str(), w.status.as_str()])))
        .collect();

    for def in catalog.worker {
        for (worker, labels) in &workers {
            push_stat(&mut out, def, *worker, labels.clone());
        }
    }

    let apps: Vec<(&AppStats, Vec<String>)> = workers
        .iter()
        .flat_map(|(worker, worker_labels)| {
            worker.apps.iter().map(move |app| {
                let id = app.id.to_string();
                let labels = extend(
                    worker_labels,
                    [id.as_str(), app.mountpoint.as_str(), app.chdir.as_str()],
                );
                (app, labels)
            })
        })
        .collect();

    for def in catalog.app {
        for (app, labels) in &apps {
            push_stat(&mut out, def, *app, labels.clone());
        }
    }

    let cores: Vec<(&CoreStats, Vec<String>)> = workers
        .iter()
        .flat_map(|(worker, worker_labels)| {
            worker
                .cores
                .iter()
                .map(move |core| (core, extend(worker_labels, [core.id.to_string().as_str()])))
        })
        .collect();

    for def in catalog.core {
        for (core, labels) in &cores {
            push_stat(&mut out, def, *core, labels.clone());
        }
    }

    out
}

fn push_stat<F: StatField>(
    out: &mut Vec<MetricSample>,
    def: &StatDefinition<F>,
    source: &F::Source,
    labels: Vec<String>,
) {
    let value = def.field.value(source) as f64;
    out.push(MetricSample::new(def.desc(), labels, value));
}

fn extend<const N: usize>(prefix: &[String], extra: [&str; N]) -> Vec<String> {
    let mut labels = Vec::with_capacity(prefix.len() + N);
    labels.extend_from_slice(prefix);
    labels.extend(extra.iter().map(|s| s.to_string()));
    labels
}

/// Number of samples a successful read of `snapshot` produces.
pub fn expected_len(catalog: &MetricCatalog, snapshot: &StatsSnapshot) -> usize {
    let apps: usize = snapshot.workers.iter().map(|w| w.apps.len()).sum();
    let cores: usize = snapshot.workers.iter().map(|w| w.cores.len()).sum();
    1 + catalog.top.len()
        + catalog.socket.len() * snapshot.sockets.len()
        + catalog.worker.len() * snapshot.workers.len()
        + catalog.app.len() * apps
        + catalog.core.len() * cores
}
