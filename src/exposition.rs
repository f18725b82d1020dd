//! Prometheus exposition of projected samples.
//!
//! Samples are loaded into a registry built for a single scrape, one
//! `GaugeVec` or `CounterVec` per metric name, so nothing leaks between runs.
//! A series that appears twice (same name and label values) keeps its first
//! sample.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::catalog::{MetricDesc, MetricKind};
use crate::projector::MetricSample;
use tracing::warn;

/// Initial capacity of the text encoding buffer.
const BUFFER_CAP: usize = 64 * 1024;

/// Builds a throwaway registry holding exactly `samples`.
pub fn registry_for(samples: &[MetricSample]) -> Result<Registry, prometheus::Error> {
    let registry = Registry::new();
    let mut gauges: HashMap<&'static str, GaugeVec> = HashMap::new();
    let mut counters: HashMap<&'static str, CounterVec> = HashMap::new();
    let mut seen: HashSet<(&'static str, &[String])> = HashSet::new();

    for sample in samples {
        if !seen.insert((sample.name(), sample.label_values.as_slice())) {
            warn!(
                "Dropping duplicate series {}{:?} (value {})",
                sample.name(),
                sample.label_values,
                sample.value
            );
            continue;
        }

        let values: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
        let desc = &sample.desc;

        match desc.kind {
            MetricKind::Gauge => {
                let vec = match gauges.entry(desc.name) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        let vec = GaugeVec::new(opts(desc), desc.label_names)?;
                        registry.register(Box::new(vec.clone()))?;
                        e.insert(vec)
                    }
                };
                vec.get_metric_with_label_values(values.as_slice())?
                    .set(sample.value);
            }
            MetricKind::Counter => {
                let vec = match counters.entry(desc.name) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        let vec = CounterVec::new(opts(desc), desc.label_names)?;
                        registry.register(Box::new(vec.clone()))?;
                        e.insert(vec)
                    }
                };
                vec.get_metric_with_label_values(values.as_slice())?
                    .inc_by(sample.value);
            }
        }
    }

    Ok(registry)
}

fn opts(desc: &MetricDesc) -> Opts {
    Opts::new(desc.name, desc.help)
}

/// Gathers `samples` into metric families, sorted by name.
pub fn gather(samples: &[MetricSample]) -> Result<Vec<MetricFamily>, prometheus::Error> {
    Ok(registry_for(samples)?.gather())
}

/// Encodes metric families in the Prometheus text format.
pub fn encode_text(families: &[MetricFamily]) -> Result<String, prometheus::Error> {
    let mut buffer = Vec::with_capacity(BUFFER_CAP);
    TextEncoder::new().encode(families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
