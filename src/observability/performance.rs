//! Performance telemetry: render, API and load timings.
//!
//! [`PerformanceMonitor`] aggregates durations per metric kind and operation
//! name, keeps free-form counters, warns about operations slower than the
//! configured [`PerformanceThresholds`], and notifies observers of every
//! measurement. The monitor is a cheap-clone handle shared by the context and
//! any code that wants to time itself.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// What a measurement timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Render,
    Api,
    Load,
}

impl MetricKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Api => "api",
            Self::Load => "load",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durations above which an operation is reported as slow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    pub slow_render_ms: u64,
    pub slow_api_ms: u64,
    pub slow_load_ms: u64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            slow_render_ms: 16,
            slow_api_ms: 1_000,
            slow_load_ms: 3_000,
        }
    }
}

impl PerformanceThresholds {
    /// Configured threshold in milliseconds.
    #[must_use]
    pub const fn limit_ms(&self, kind: MetricKind) -> u64 {
        match kind {
            MetricKind::Render => self.slow_render_ms,
            MetricKind::Api => self.slow_api_ms,
            MetricKind::Load => self.slow_load_ms,
        }
    }

    #[must_use]
    pub const fn limit(&self, kind: MetricKind) -> Duration {
        Duration::from_millis(self.limit_ms(kind))
    }
}

/// Aggregate of all measurements for one operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingStats {
    pub count: u64,
    pub total_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub slow_count: u64,
}

impl TimingStats {
    fn record(&mut self, ms: f64, slow: bool) {
        if self.count == 0 {
            self.min_ms = ms;
            self.max_ms = ms;
        } else {
            self.min_ms = self.min_ms.min(ms);
            self.max_ms = self.max_ms.max(ms);
        }
        self.count += 1;
        self.total_ms += ms;
        #[allow(clippy::cast_precision_loss)]
        let count = self.count as f64;
        self.mean_ms = self.total_ms / count;
        if slow {
            self.slow_count += 1;
        }
    }
}

/// One recorded timing, as handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub kind: MetricKind,
    pub operation: String,
    pub duration_ms: f64,
    pub slow: bool,
}

/// Serializable snapshot of everything the monitor has recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub render: BTreeMap<String, TimingStats>,
    pub api: BTreeMap<String, TimingStats>,
    pub load: BTreeMap<String, TimingStats>,
    pub counters: BTreeMap<String, u64>,
}

type Observer = Arc<dyn Fn(&Measurement) + Send + Sync>;

/// Handle returned by [`PerformanceMonitor::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
struct MonitorState {
    timings: BTreeMap<(MetricKind, String), TimingStats>,
    counters: BTreeMap<String, u64>,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

#[derive(Clone, Default)]
pub struct PerformanceMonitor {
    thresholds: PerformanceThresholds,
    state: Arc<Mutex<MonitorState>>,
}

impl PerformanceMonitor {
    #[must_use]
    pub fn new(thresholds: PerformanceThresholds) -> Self {
        Self {
            thresholds,
            state: Arc::default(),
        }
    }

    #[must_use]
    pub const fn thresholds(&self) -> PerformanceThresholds {
        self.thresholds
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one timing and notifies observers.
    pub fn record(&self, kind: MetricKind, operation: &str, duration: Duration) -> Measurement {
        let slow = duration > self.thresholds.limit(kind);
        let measurement = Measurement {
            kind,
            operation: operation.to_string(),
            duration_ms: duration.as_secs_f64() * 1_000.0,
            slow,
        };

        let observers: Vec<Observer> = {
            let mut state = self.lock();
            state
                .timings
                .entry((kind, operation.to_string()))
                .or_default()
                .record(measurement.duration_ms, slow);
            state.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
        };

        if slow {
            tracing::warn!(
                kind = %kind,
                operation = %operation,
                duration_ms = measurement.duration_ms,
                threshold_ms = self.thresholds.limit_ms(kind),
                "slow operation"
            );
        } else {
            tracing::trace!(kind = %kind, operation = %operation, duration_ms = measurement.duration_ms, "timing recorded");
        }

        for observer in observers {
            observer(&measurement);
        }
        measurement
    }

    /// Times a synchronous closure.
    pub fn time<R, F>(&self, kind: MetricKind, operation: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let started = Instant::now();
        let result = f();
        self.record(kind, operation, started.elapsed());
        result
    }

    /// Times a future until it resolves.
    pub async fn time_async<F>(&self, kind: MetricKind, operation: &str, future: F) -> F::Output
    where
        F: Future,
    {
        let started = Instant::now();
        let output = future.await;
        self.record(kind, operation, started.elapsed());
        output
    }

    pub fn increment(&self, counter: &str) -> u64 {
        self.add(counter, 1)
    }

    /// Adds `amount` to a named counter and returns the new value.
    pub fn add(&self, counter: &str, amount: u64) -> u64 {
        let mut state = self.lock();
        let value = state.counters.entry(counter.to_string()).or_default();
        *value = value.saturating_add(amount);
        *value
    }

    #[must_use]
    pub fn counter(&self, counter: &str) -> u64 {
        self.lock().counters.get(counter).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn stats(&self, kind: MetricKind, operation: &str) -> Option<TimingStats> {
        self.lock().timings.get(&(kind, operation.to_string())).cloned()
    }

    /// Registers a callback invoked after every measurement.
    pub fn observe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&Measurement) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = ObserverId(state.next_observer);
        state.next_observer += 1;
        state.observers.push((id, Arc::new(observer)));
        id
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut state = self.lock();
        let before = state.observers.len();
        state.observers.retain(|(other, _)| *other != id);
        state.observers.len() != before
    }

    #[must_use]
    pub fn report(&self) -> PerformanceReport {
        let state = self.lock();
        let mut report = PerformanceReport {
            counters: state.counters.clone(),
            ..PerformanceReport::default()
        };
        for ((kind, operation), stats) in &state.timings {
            let bucket = match kind {
                MetricKind::Render => &mut report.render,
                MetricKind::Api => &mut report.api,
                MetricKind::Load => &mut report.load,
            };
            bucket.insert(operation.clone(), stats.clone());
        }
        report
    }

    /// Clears timings and counters; observers stay registered.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.timings.clear();
        state.counters.clear();
    }
}

impl fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}
