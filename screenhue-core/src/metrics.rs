//! Sampling metrics
//!
//! Provides:
//! - Counters for ticks, captures, failures and published events
//! - Rolling averages for capture and reduce latency
//! - Effective emission rate from the time between published events

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Maximum number of samples to keep for rolling averages
const MAX_SAMPLES: usize = 120;

/// Rolling average calculator for timing data
#[derive(Debug)]
struct RollingAverage {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

impl RollingAverage {
    fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    fn add(&mut self, duration: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
    }

    fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.samples.iter().sum();
        total / self.samples.len() as u32
    }

    fn average_ms(&self) -> f64 {
        self.average().as_secs_f64() * 1000.0
    }
}

/// Point-in-time copy of the metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    /// Ticks produced by the clock
    pub ticks: u64,
    /// Ticks dropped because a capture was still in flight
    pub ticks_coalesced: u64,
    /// Capture attempts
    pub captures: u64,
    /// Captures that produced a frame
    pub captures_succeeded: u64,
    /// Failed capture attempts
    pub capture_failures: u64,
    /// Frames that could not be reduced
    pub reduction_failures: u64,
    /// Events handed to the broadcast channel
    pub events_published: u64,
    /// Events skipped by lagging subscribers
    pub subscriber_lag_drops: u64,
    /// Failures since the last successful sample
    pub consecutive_failures: u64,
    /// Average capture latency in milliseconds
    pub capture_latency_ms: f64,
    /// Average reduce latency in milliseconds
    pub reduce_latency_ms: f64,
    /// Effective events per second
    pub effective_rate: f64,
    /// Seconds since the metrics were created
    pub uptime_seconds: f64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} events ({:.1}/s), {} captures, {} failed, {} ticks coalesced, capture {:.1}ms, reduce {:.1}ms",
            self.events_published,
            self.effective_rate,
            self.captures,
            self.capture_failures + self.reduction_failures,
            self.ticks_coalesced,
            self.capture_latency_ms,
            self.reduce_latency_ms
        )
    }
}

/// Metrics collector
///
/// Thread-safe; shared between the sampler task, the blocking capture
/// workers and subscribers.
#[derive(Debug)]
pub struct SamplingMetrics {
    capture_latency: RwLock<RollingAverage>,
    reduce_latency: RwLock<RollingAverage>,
    emission_intervals: RwLock<RollingAverage>,
    last_emission: RwLock<Option<Instant>>,
    ticks: AtomicU64,
    ticks_coalesced: AtomicU64,
    captures: AtomicU64,
    capture_failures: AtomicU64,
    reduction_failures: AtomicU64,
    events_published: AtomicU64,
    subscriber_lag_drops: AtomicU64,
    consecutive_failures: AtomicU64,
    start_time: Instant,
}

impl Default for SamplingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplingMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            capture_latency: RwLock::new(RollingAverage::new(MAX_SAMPLES)),
            reduce_latency: RwLock::new(RollingAverage::new(MAX_SAMPLES)),
            emission_intervals: RwLock::new(RollingAverage::new(MAX_SAMPLES)),
            last_emission: RwLock::new(None),
            ticks: AtomicU64::new(0),
            ticks_coalesced: AtomicU64::new(0),
            captures: AtomicU64::new(0),
            capture_failures: AtomicU64::new(0),
            reduction_failures: AtomicU64::new(0),
            events_published: AtomicU64::new(0),
            subscriber_lag_drops: AtomicU64::new(0),
            consecutive_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a tick that reached the worker, plus any it replaced
    pub fn record_tick(&self, coalesced: u64) {
        self.ticks.fetch_add(1 + coalesced, Ordering::Relaxed);
        self.ticks_coalesced.fetch_add(coalesced, Ordering::Relaxed);
    }

    /// Record a capture attempt and how long it took
    pub fn record_capture(&self, duration: Duration, ok: bool) {
        self.captures.fetch_add(1, Ordering::Relaxed);
        if ok {
            self.capture_latency.write().add(duration);
        } else {
            self.capture_failures.fetch_add(1, Ordering::Relaxed);
            self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a reduction and how long it took
    pub fn record_reduce(&self, duration: Duration, ok: bool) {
        if ok {
            self.reduce_latency.write().add(duration);
        } else {
            self.reduction_failures.fetch_add(1, Ordering::Relaxed);
            self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an event handed to subscribers
    pub fn record_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);

        let now = Instant::now();
        let mut last = self.last_emission.write();
        if let Some(previous) = last.replace(now) {
            self.emission_intervals
                .write()
                .add(now.duration_since(previous));
        }
    }

    /// Record events a lagging subscriber skipped
    pub fn record_lagged(&self, skipped: u64) {
        self.subscriber_lag_drops
            .fetch_add(skipped, Ordering::Relaxed);
    }

    pub fn captures(&self) -> u64 {
        self.captures.load(Ordering::Relaxed)
    }

    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let interval = self.emission_intervals.read().average();
        let effective_rate = if interval.as_secs_f64() > 0.0 {
            1.0 / interval.as_secs_f64()
        } else {
            0.0
        };

        let captures = self.captures.load(Ordering::Relaxed);
        let capture_failures = self.capture_failures.load(Ordering::Relaxed);

        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            ticks_coalesced: self.ticks_coalesced.load(Ordering::Relaxed),
            captures,
            captures_succeeded: captures.saturating_sub(capture_failures),
            capture_failures,
            reduction_failures: self.reduction_failures.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            subscriber_lag_drops: self.subscriber_lag_drops.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            capture_latency_ms: self.capture_latency.read().average_ms(),
            reduce_latency_ms: self.reduce_latency.read().average_ms(),
            effective_rate,
            uptime_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

/// Create a shared metrics instance
pub fn create_metrics() -> Arc<SamplingMetrics> {
    Arc::new(SamplingMetrics::new())
}
