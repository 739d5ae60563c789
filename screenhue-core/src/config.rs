//! Sampling configuration
//!
//! Plain values handed to the hub at construction. Nothing here reads
//! files or the environment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, ScreenhueError};
use crate::reduce::{Algorithm, ColorReducer, DEFAULT_PIXEL_DENSITY};

/// Default time between samples
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Highest rate that still gives a whole-millisecond interval
pub const MAX_RATE: u32 = 1000;

/// Default per-subscriber buffer, in events
pub const DEFAULT_BUFFER_CAPACITY: usize = 16;

/// When the sampler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Lifecycle {
    /// Start with the first subscriber, stop when the last one leaves
    #[default]
    OnDemand,
    /// Run from `start()` until shutdown, even with nobody listening
    Continuous,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnDemand => write!(f, "on-demand"),
            Self::Continuous => write!(f, "continuous"),
        }
    }
}

impl std::str::FromStr for Lifecycle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on-demand" | "ondemand" | "lazy" => Ok(Self::OnDemand),
            "continuous" | "always" => Ok(Self::Continuous),
            _ => Err(format!("Unknown lifecycle: {}", s)),
        }
    }
}

/// Sampler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Milliseconds between ticks
    pub interval_ms: u64,
    /// Reduction stride in both axes
    pub pixel_density: u32,
    /// Algorithm whose result is the event's primary color
    pub primary: Algorithm,
    /// Algorithms run on every frame
    pub algorithms: Vec<Algorithm>,
    /// When the sampler runs
    pub lifecycle: Lifecycle,
    /// Events buffered per subscriber before it starts skipping
    pub buffer_capacity: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            pixel_density: DEFAULT_PIXEL_DENSITY,
            primary: Algorithm::default(),
            algorithms: Algorithm::ALL.to_vec(),
            lifecycle: Lifecycle::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl SamplingConfig {
    /// Time between ticks
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Builder: set the tick interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis() as u64;
        self
    }

    /// Builder: set the tick interval from a target samples-per-second rate
    ///
    /// The interval is `1000 / rate` in whole milliseconds, so 60/s ticks
    /// every 16ms. Rates of zero or above [`MAX_RATE`] are rejected.
    pub fn with_rate(mut self, samples_per_second: u32) -> Result<Self> {
        if samples_per_second == 0 {
            return Err(ScreenhueError::config("Sample rate must be at least 1/s"));
        }
        if samples_per_second > MAX_RATE {
            return Err(ScreenhueError::config(format!(
                "Sample rate {}/s is above the maximum of {}/s",
                samples_per_second, MAX_RATE
            )));
        }
        self.interval_ms = 1000 / u64::from(samples_per_second);
        Ok(self)
    }

    /// Builder: set the reduction stride
    pub fn with_pixel_density(mut self, pixel_density: u32) -> Self {
        self.pixel_density = pixel_density;
        self
    }

    /// Builder: set the primary algorithm
    pub fn with_primary(mut self, primary: Algorithm) -> Self {
        self.primary = primary;
        self
    }

    /// Builder: set the enabled algorithms
    pub fn with_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.algorithms = algorithms.into_iter().collect();
        self
    }

    /// Builder: set the lifecycle policy
    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Builder: set the per-subscriber buffer
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Build the reducer described by this configuration
    pub fn reducer(&self) -> Result<ColorReducer> {
        ColorReducer::new(self.pixel_density, self.algorithms.iter().copied())
    }

    /// Non-fatal observations about the configuration
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.interval_ms > 0 && self.interval_ms < 16 {
            warnings.push(format!(
                "Interval {}ms is faster than 60 samples/sec; captures will likely not keep up.",
                self.interval_ms
            ));
        }

        if self.pixel_density == 1 {
            warnings.push(
                "Pixel density 1 reduces every pixel; expect high CPU usage on large screens."
                    .to_string(),
            );
        }

        if self.lifecycle == Lifecycle::Continuous {
            warnings.push("Continuous lifecycle captures even with no subscribers.".to_string());
        }

        warnings
    }

    /// Reject configurations that can never work
    pub fn validate_strict(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(ScreenhueError::config("Sampling interval cannot be zero"));
        }

        if self.buffer_capacity == 0 {
            return Err(ScreenhueError::config("Subscriber buffer capacity cannot be zero"));
        }

        let reducer = self.reducer()?;
        if !reducer.supports(self.primary) {
            return Err(ScreenhueError::config(format!(
                "Primary algorithm '{}' is not among the enabled algorithms ({})",
                self.primary,
                reducer
                    .algorithms()
                    .iter()
                    .map(Algorithm::name)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        Ok(())
    }
}
