//! Mock infrastructure for testing
//!
//! Provides test capturers with observable call counts and frame builders.

#![allow(dead_code)]

use screenhue_core::capture::ScreenCapturer;
use screenhue_core::error::{Result, ScreenhueError};
use screenhue_core::types::{Frame, ScreenBounds};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Create a test frame with solid color
pub fn create_test_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
    Frame::solid(width, height, rgb)
}

/// Create a test frame with a diagonal gradient
pub fn create_gradient_frame(width: u32, height: u32) -> Frame {
    Frame::from_fn(width, height, |x, y| {
        let r = ((x as f32 / width as f32) * 255.0) as u8;
        let g = ((y as f32 / height as f32) * 255.0) as u8;
        let b = (((x + y) as f32 / (width + height) as f32) * 255.0) as u8;
        [r, g, b]
    })
}

/// Call counters shared between a [`ScriptedCapturer`] and the test
#[derive(Debug, Clone, Default)]
pub struct CaptureProbe {
    calls: Arc<AtomicU64>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl CaptureProbe {
    /// Number of `capture` calls so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `capture` calls seen
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Capturer whose frames encode how many times it has been called
///
/// Capture `n` (starting at 1) returns a solid frame of color
/// `[n % 256, 0, 0]`, so events can be matched to captures.
pub struct ScriptedCapturer {
    bounds: ScreenBounds,
    latency: Duration,
    failing: bool,
    probe: CaptureProbe,
}

impl ScriptedCapturer {
    pub fn new(width: u32, height: u32) -> (Self, CaptureProbe) {
        let probe = CaptureProbe::default();
        let capturer = Self {
            bounds: ScreenBounds::new(width, height),
            latency: Duration::ZERO,
            failing: false,
            probe: probe.clone(),
        };
        (capturer, probe)
    }

    /// Block for `latency` on every capture
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every capture
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn boxed(self) -> Box<dyn ScreenCapturer> {
        Box::new(self)
    }
}

impl ScreenCapturer for ScriptedCapturer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn bounds(&self) -> ScreenBounds {
        self.bounds
    }

    fn capture(&mut self) -> Result<Frame> {
        let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let call = self.probe.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing {
            return Err(ScreenhueError::capture(format!("scripted failure #{}", call)));
        }
        Ok(Frame::solid(
            self.bounds.width,
            self.bounds.height,
            [(call % 256) as u8, 0, 0],
        ))
    }
}
