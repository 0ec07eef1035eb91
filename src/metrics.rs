//! Latency histograms for upstream calls, lookups and update dispatch.
//! Each named metric keeps a fixed ring of samples; summaries report p50/p95/p99.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Measures elapsed time from creation until `finish`.
pub struct TimingSpan {
    name: &'static str,
    start: Instant,
    registry: Arc<MetricsRegistry>,
}

impl TimingSpan {
    pub fn new(name: &'static str, registry: Arc<MetricsRegistry>) -> Self {
        Self {
            name,
            start: Instant::now(),
            registry,
        }
    }

    /// Record the elapsed duration in microseconds and return it.
    pub fn finish(self) -> f64 {
        let elapsed_us = self.start.elapsed().as_micros() as f64;
        self.registry.record(self.name, elapsed_us);
        elapsed_us
    }
}

struct SampleRing {
    samples: Vec<f64>,
    pos: usize,
    count: usize,
    capacity: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            pos: 0,
            count: 0,
            capacity,
        }
    }

    fn push(&mut self, value: f64) {
        self.samples[self.pos] = value;
        self.pos = (self.pos + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples[..self.count].to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((p / 100.0) * (self.count as f64 - 1.0)).round() as usize;
        sorted[idx.min(self.count - 1)]
    }
}

pub struct MetricsRegistry {
    histograms: Mutex<HashMap<&'static str, SampleRing>>,
    ring_capacity: usize,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(ring_capacity: usize) -> Self {
        Self {
            histograms: Mutex::new(HashMap::new()),
            ring_capacity: ring_capacity.max(1),
        }
    }

    /// Record a sample (in microseconds) for the named metric.
    pub fn record(&self, name: &'static str, value_us: f64) {
        let mut hists = self.histograms.lock();
        hists
            .entry(name)
            .or_insert_with(|| SampleRing::new(self.ring_capacity))
            .push(value_us);
        tracing::trace!(metric = name, value_us, "metric_recorded");
    }

    /// Start a timing span that records on finish.
    pub fn span(self: &Arc<Self>, name: &'static str) -> TimingSpan {
        TimingSpan::new(name, Arc::clone(self))
    }

    pub fn summary(&self) -> HashMap<String, MetricSummary> {
        let hists = self.histograms.lock();
        hists
            .iter()
            .map(|(&name, ring)| {
                (
                    name.to_string(),
                    MetricSummary {
                        p50_us: ring.percentile(50.0),
                        p95_us: ring.percentile(95.0),
                        p99_us: ring.percentile(99.0),
                        count: ring.count,
                    },
                )
            })
            .collect()
    }

    /// Emit one log line per metric.
    pub fn log_summary(&self) {
        let mut summary: Vec<_> = self.summary().into_iter().collect();
        summary.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, s) in summary {
            tracing::info!(
                metric = %name,
                count = s.count,
                p50_us = s.p50_us,
                p95_us = s.p95_us,
                p99_us = s.p99_us,
                "metric_summary"
            );
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricSummary {
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub count: usize,
}

/// Well-known metric names.
pub mod metric_names {
    pub const CATALOG_CALL: &str = "catalog_call";
    pub const IMAGE_DOWNLOAD: &str = "image_download";
    pub const TRANSLATE_CALL: &str = "translate_call";
    pub const LOOKUP_SEARCH: &str = "lookup_search";
    pub const LOOKUP_DETAILS: &str = "lookup_details";
    pub const DISPATCH: &str = "dispatch";
    pub const QUEUE_WAIT: &str = "queue_wait";
}
