//! In-process execution metrics.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::unit::{LifecycleEvent, StepRecord};

/// Thread-safe atomic counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Thread-safe atomic gauge.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Fixed-bucket histogram.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    bounds: Vec<f64>,
    // Scaled by 1000 to keep sub-millisecond precision in an integer.
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(bounds: Vec<f64>) -> Self {
        let buckets = (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            bounds,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn default_latency() -> Self {
        Self::new(vec![
            10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0, 30000.0, 60000.0,
        ])
    }

    pub fn observe(&self, value: f64) {
        let idx = self
            .bounds
            .iter()
            .position(|&bound| value <= bound)
            .unwrap_or(self.bounds.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.sum
            .fetch_add((value.max(0.0) * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> f64 {
        self.sum.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum() / n as f64,
        }
    }

    /// Observation count per bucket; the last bucket is unbounded.
    pub fn bucket_counts(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }
}

/// Counters for one execution manager.
#[derive(Debug)]
pub struct ExecutionMetrics {
    pub units_created: Counter,
    pub units_rejected: Counter,
    pub units_completed: Counter,
    pub units_failed: Counter,
    pub units_aborted: Counter,
    pub tool_calls: Counter,
    pub tool_errors: Counter,
    pub running_units: Gauge,
    pub unit_latency_ms: Histogram,
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self {
            units_created: Counter::new(),
            units_rejected: Counter::new(),
            units_completed: Counter::new(),
            units_failed: Counter::new(),
            units_aborted: Counter::new(),
            tool_calls: Counter::new(),
            tool_errors: Counter::new(),
            running_units: Gauge::new(),
            unit_latency_ms: Histogram::default_latency(),
        }
    }
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&self) {
        self.units_created.inc();
    }

    pub fn record_rejected(&self) {
        self.units_rejected.inc();
    }

    pub fn record_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Start { .. } => self.running_units.inc(),
            LifecycleEvent::Complete { duration_ms, .. } => {
                self.running_units.dec();
                self.units_completed.inc();
                self.unit_latency_ms.observe(*duration_ms as f64);
            }
            LifecycleEvent::Error { duration_ms, .. } => {
                self.running_units.dec();
                self.units_failed.inc();
                self.unit_latency_ms.observe(*duration_ms as f64);
            }
            LifecycleEvent::Aborted { .. } => {
                self.running_units.dec();
                self.units_aborted.inc();
            }
        }
    }

    pub fn record_steps(&self, steps: &[StepRecord]) {
        for step in steps.iter().filter(|s| s.tool.is_some()) {
            self.tool_calls.inc();
            if !step.success {
                self.tool_errors.inc();
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            units_created: self.units_created.get(),
            units_rejected: self.units_rejected.get(),
            units_completed: self.units_completed.get(),
            units_failed: self.units_failed.get(),
            units_aborted: self.units_aborted.get(),
            running_units: self.running_units.get(),
            tool_calls: self.tool_calls.get(),
            tool_errors: self.tool_errors.get(),
            avg_unit_latency_ms: self.unit_latency_ms.mean(),
        }
    }
}

/// Plain copy of [`ExecutionMetrics`] for display or export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub units_created: u64,
    pub units_rejected: u64,
    pub units_completed: u64,
    pub units_failed: u64,
    pub units_aborted: u64,
    pub running_units: i64,
    pub tool_calls: u64,
    pub tool_errors: u64,
    pub avg_unit_latency_ms: f64,
}
