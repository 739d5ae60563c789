//! Screenhue Core Library
//!
//! Samples the screen on a fixed cadence, reduces each frame to a single
//! representative color and fans the result out to any number of listeners.
//!
//! This library provides:
//! - A capture contract plus command-line and synthetic capture sources
//! - Strided color reduction (RMS average, plain average, circular hue)
//! - A drop-latest scheduler that never runs two captures at once
//! - A broadcast hub that shares one upstream between all subscribers
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐    ┌──────────┐    ┌─────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Scheduler │───▶│ Capturer │───▶│ Reducer │───▶│ BroadcastHub │───▶│ Subscription │ ×N
//! │ (ticks)   │    │ (blocks) │    │ (pure)  │    │ (fan-out)    │    │ (own cursor) │
//! └───────────┘    └──────────┘    └─────────┘    └──────────────┘    └──────────────┘
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod event;
pub mod hub;
pub mod metrics;
pub mod pipeline;
pub mod reduce;
pub mod scheduler;
pub mod types;

pub use capture::{CommandCapturer, ScreenCapturer, SyntheticCapturer};
pub use config::{Lifecycle, SamplingConfig};
pub use error::{Result, ResultExt, ScreenhueError};
pub use event::ColorEvent;
pub use hub::{BroadcastHub, Subscription};
pub use metrics::{MetricsSnapshot, SamplingMetrics};
pub use pipeline::SamplePipeline;
pub use reduce::{Algorithm, AlgorithmResults, ColorReducer};
pub use scheduler::{SampleScheduler, Tick};
pub use types::{Color, Frame, Handle, ScreenBounds};
