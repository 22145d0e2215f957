//! Micro-benchmark accumulators
//!
//! Lightweight timing of UI operations (layouts, renders, task runs):
//! - [`Accumulator`]: running count / total / min / max / variance
//! - [`Profiler`]: accumulators by name over a [`Clock`]
//! - Duration histogram (0-1ms, 1-10ms, 10-100ms, 100ms+)
//! - Snapshots serialize to JSON for shipping to a dev tool

use crate::platform::Clock;
use serde::Serialize;
use std::collections::BTreeMap;

/// Histogram bucket upper bounds (ms); the last bucket is open-ended
const BUCKET_BOUNDS: [f64; 3] = [1.0, 10.0, 100.0];

/// Running statistics for one measured operation
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    /// Number of samples
    pub count: u64,
    /// Total time (ms)
    pub total: f64,
    /// Fastest sample (ms)
    pub min: f64,
    /// Slowest sample (ms)
    pub max: f64,
    /// Sum of squared samples, for the standard deviation
    sum_sq: f64,
    /// Samples per duration bucket
    pub histogram: [u64; 4],
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            count: 0,
            total: 0.0,
            min: f64::MAX,
            max: 0.0,
            sum_sq: 0.0,
            histogram: [0; 4],
        }
    }

    /// Record one sample
    pub fn record(&mut self, duration: f64) {
        self.count += 1;
        self.total += duration;
        self.sum_sq += duration * duration;
        if duration < self.min {
            self.min = duration;
        }
        if duration > self.max {
            self.max = duration;
        }

        let bucket = BUCKET_BOUNDS
            .iter()
            .position(|bound| duration < *bound)
            .unwrap_or(BUCKET_BOUNDS.len());
        self.histogram[bucket] += 1;
    }

    /// Average time per sample
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    /// Population standard deviation
    pub fn std_dev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.total / n;
        (self.sum_sq / n - mean * mean).max(0.0).sqrt()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// An open measurement, closed with [`Profiler::leave`]
#[derive(Debug, Clone)]
#[must_use = "a span records nothing until it is left"]
pub struct Span {
    name: String,
    start: f64,
}

/// Serializable summary of one accumulator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub name: String,
    pub count: u64,
    pub total: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub histogram: [u64; 4],
}

/// Accumulators by name
pub struct Profiler<C: Clock> {
    clock: C,
    accumulators: BTreeMap<String, Accumulator>,
    enabled: bool,
}

impl<C: Clock> Profiler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            accumulators: BTreeMap::new(),
            enabled: true,
        }
    }

    /// A disabled profiler still runs timed closures but records nothing
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start measuring `name`
    pub fn enter(&self, name: impl Into<String>) -> Span {
        Span {
            name: name.into(),
            start: self.clock.now_ms(),
        }
    }

    /// Finish a measurement. Returns the elapsed ms.
    pub fn leave(&mut self, span: Span) -> f64 {
        let elapsed = (self.clock.now_ms() - span.start).max(0.0);
        self.record(&span.name, elapsed);
        elapsed
    }

    /// Record an externally measured sample
    pub fn record(&mut self, name: &str, duration: f64) {
        if !self.enabled {
            return;
        }
        if let Some(acc) = self.accumulators.get_mut(name) {
            acc.record(duration);
        } else {
            let mut acc = Accumulator::new();
            acc.record(duration);
            self.accumulators.insert(name.to_string(), acc);
        }
    }

    /// Time a closure under `name`
    pub fn time<R>(&mut self, name: &str, f: impl FnOnce() -> R) -> R {
        let start = self.clock.now_ms();
        let result = f();
        let elapsed = (self.clock.now_ms() - start).max(0.0);
        self.record(name, elapsed);
        result
    }

    pub fn get(&self, name: &str) -> Option<&Accumulator> {
        self.accumulators.get(name)
    }

    /// Drop all samples
    pub fn reset(&mut self) {
        self.accumulators.clear();
    }

    /// Summaries, sorted by name
    pub fn snapshot(&self) -> Vec<Stats> {
        self.accumulators
            .iter()
            .map(|(name, acc)| Stats {
                name: name.clone(),
                count: acc.count,
                total: acc.total,
                avg: acc.avg(),
                min: if acc.count == 0 { 0.0 } else { acc.min },
                max: acc.max,
                std_dev: acc.std_dev(),
                histogram: acc.histogram,
            })
            .collect()
    }

    /// Human-readable table, slowest total first
    pub fn report(&self) -> String {
        let mut rows = self.snapshot();
        rows.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut out = format!(
            "{:<24} {:>8} {:>10} {:>9} {:>9} {:>9}\n",
            "NAME", "COUNT", "TOTAL", "AVG", "MIN", "MAX"
        );
        for row in rows {
            out.push_str(&format!(
                "{:<24} {:>8} {:>10.2} {:>9.3} {:>9.3} {:>9.3}\n",
                row.name, row.count, row.total, row.avg, row.min, row.max
            ));
        }
        out
    }
}
