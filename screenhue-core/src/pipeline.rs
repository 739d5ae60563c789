//! Capture-reduce pipeline
//!
//! One call to [`SamplePipeline::sample`] grabs a frame, reduces it with
//! every enabled algorithm and wraps the results in a [`ColorEvent`]. The
//! frame is dropped before the event is returned; nothing downstream ever
//! sees pixel data.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::capture::ScreenCapturer;
use crate::config::SamplingConfig;
use crate::error::{Result, ScreenhueError};
use crate::event::ColorEvent;
use crate::metrics::SamplingMetrics;
use crate::reduce::{Algorithm, ColorReducer};
use crate::types::{Handle, ScreenBounds};

/// Consecutive failures before the pipeline starts logging at error level
pub const FAILURE_ALERT_THRESHOLD: u64 = 10;

/// Capturer shared between blocking workers
pub type SharedCapturer = Arc<Mutex<Box<dyn ScreenCapturer>>>;

/// Screen sampling pipeline
pub struct SamplePipeline {
    handle: Handle,
    capturer: SharedCapturer,
    capturer_name: String,
    bounds: ScreenBounds,
    reducer: ColorReducer,
    primary: Algorithm,
    metrics: Arc<SamplingMetrics>,
}

impl SamplePipeline {
    /// Create a pipeline, rejecting configurations that can never produce events
    pub fn new(
        capturer: Box<dyn ScreenCapturer>,
        config: &SamplingConfig,
        metrics: Arc<SamplingMetrics>,
    ) -> Result<Self> {
        config.validate_strict()?;
        for warning in config.validate() {
            warn!("{}", warning);
        }

        let reducer = config.reducer()?;
        let capturer_name = capturer.name().to_string();
        let bounds = capturer.bounds();

        info!(
            "Pipeline configured: {} capture at {}, density {}, primary {}, {} algorithm(s)",
            capturer_name,
            bounds,
            reducer.pixel_density(),
            config.primary,
            reducer.algorithms().len()
        );

        Ok(Self {
            handle: Handle::new(),
            capturer: Arc::new(Mutex::new(capturer)),
            capturer_name,
            bounds,
            reducer,
            primary: config.primary,
            metrics,
        })
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Name of the capture backend
    pub fn capturer_name(&self) -> &str {
        &self.capturer_name
    }

    /// Capture area, fixed at construction
    pub fn bounds(&self) -> ScreenBounds {
        self.bounds
    }

    pub fn reducer(&self) -> &ColorReducer {
        &self.reducer
    }

    pub fn primary(&self) -> Algorithm {
        self.primary
    }

    pub fn metrics(&self) -> &Arc<SamplingMetrics> {
        &self.metrics
    }

    /// Capture and reduce one frame
    ///
    /// Blocks the calling thread for the duration of the capture. Failures
    /// are recorded and logged here; the caller only decides whether to
    /// publish.
    pub fn sample(&self) -> Result<ColorEvent> {
        let result = self.sample_inner();
        if let Err(ref e) = result {
            let failures = self.metrics.consecutive_failures();
            if failures >= FAILURE_ALERT_THRESHOLD && failures % FAILURE_ALERT_THRESHOLD == 0 {
                error!(
                    "Pipeline {}: {} consecutive failed samples, last: {}",
                    self.handle, failures, e
                );
            } else {
                warn!("Pipeline {}: sample failed: {}", self.handle, e);
            }
        }
        result
    }

    fn sample_inner(&self) -> Result<ColorEvent> {
        let started = Instant::now();
        let captured = self.capturer.lock().capture();
        let capture_time = started.elapsed();
        self.metrics.record_capture(capture_time, captured.is_ok());
        let frame = captured?;
        debug!("Screen capture latency: {}ms", capture_time.as_millis());

        let started = Instant::now();
        let reduced = self.reducer.reduce(&frame);
        self.metrics.record_reduce(started.elapsed(), reduced.is_ok());
        drop(frame);

        ColorEvent::new(reduced?, self.primary)
    }

    /// Run [`sample`](Self::sample) on the blocking thread pool
    pub async fn sample_async(self: &Arc<Self>) -> Result<ColorEvent> {
        let pipeline = Arc::clone(self);
        tokio::task::spawn_blocking(move || pipeline.sample())
            .await
            .map_err(ScreenhueError::from)?
    }
}

impl std::fmt::Debug for SamplePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplePipeline")
            .field("handle", &self.handle)
            .field("capturer", &self.capturer_name)
            .field("bounds", &self.bounds)
            .field("reducer", &self.reducer)
            .field("primary", &self.primary)
            .finish()
    }
}
