//! Metric store - bounded window of recent performance samples.

use jarvis_core::{MetricSample, Time};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{PoisonError, RwLock};

/// Fixed-capacity FIFO buffer of metric samples.
///
/// Safe for concurrent writers and readers. Recording never fails: once the
/// window is full the oldest sample is evicted.
pub struct MetricStore {
    capacity: usize,
    samples: RwLock<VecDeque<MetricSample>>,
}

impl MetricStore {
    /// Create a store holding at most `capacity` samples (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Record a sample, evicting the oldest if the window is full.
    pub fn record(&self, sample: MetricSample) {
        let mut samples = self.samples.write().unwrap_or_else(PoisonError::into_inner);
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Record several samples under one lock.
    pub fn record_all(&self, batch: impl IntoIterator<Item = MetricSample>) {
        let mut samples = self.samples.write().unwrap_or_else(PoisonError::into_inner);
        for sample in batch {
            if samples.len() == self.capacity {
                samples.pop_front();
            }
            samples.push_back(sample);
        }
    }

    /// Copy the current window. Later records do not affect the snapshot.
    pub fn snapshot(&self) -> MetricSnapshot {
        let samples = self.samples.read().unwrap_or_else(PoisonError::into_inner);
        MetricSnapshot {
            taken_at: chrono::Utc::now(),
            samples: samples.iter().cloned().collect(),
        }
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no samples are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of samples held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Immutable view of the metric window, taken once per cycle.
#[derive(Debug, Clone)]
pub struct MetricSnapshot {
    /// When the snapshot was taken
    pub taken_at: Time,
    samples: Vec<MetricSample>,
}

impl MetricSnapshot {
    /// Build a snapshot from explicit samples.
    pub fn from_samples(samples: Vec<MetricSample>) -> Self {
        Self {
            taken_at: chrono::Utc::now(),
            samples,
        }
    }

    /// Samples in recording order.
    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples grouped by `(module, metric_name)`, each in timestamp order.
    pub fn series(&self) -> BTreeMap<(&str, &str), Vec<&MetricSample>> {
        let mut series: BTreeMap<(&str, &str), Vec<&MetricSample>> = BTreeMap::new();
        for sample in &self.samples {
            series
                .entry((sample.module.as_str(), sample.metric_name.as_str()))
                .or_default()
                .push(sample);
        }
        for samples in series.values_mut() {
            samples.sort_by_key(|s| s.timestamp);
        }
        series
    }
}
