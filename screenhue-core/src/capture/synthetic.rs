//! Synthetic test-pattern capture
//!
//! Generates a horizontal gradient whose base color shifts on every capture,
//! so downstream consumers see a moving color without a real display.

use std::time::Duration;

use super::ScreenCapturer;
use crate::error::{Result, ScreenhueError};
use crate::types::{Frame, ScreenBounds};

/// How far the pattern shifts per capture, in channel steps
const SHIFT_PER_CAPTURE: u32 = 8;

/// Deterministic generated frames of a fixed size
#[derive(Debug, Clone)]
pub struct SyntheticCapturer {
    bounds: ScreenBounds,
    latency: Duration,
    captures: u32,
}

impl SyntheticCapturer {
    pub fn new(bounds: ScreenBounds) -> Result<Self> {
        if bounds.area() == 0 {
            return Err(ScreenhueError::config(format!(
                "Synthetic capture area {} is empty",
                bounds
            )));
        }
        Ok(Self {
            bounds,
            latency: Duration::ZERO,
            captures: 0,
        })
    }

    /// Block for `latency` on every capture, to imitate slow screen I/O
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of frames produced so far
    pub fn captures(&self) -> u32 {
        self.captures
    }
}

impl ScreenCapturer for SyntheticCapturer {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn bounds(&self) -> ScreenBounds {
        self.bounds
    }

    fn capture(&mut self) -> Result<Frame> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        let shift = self.captures.wrapping_mul(SHIFT_PER_CAPTURE);
        self.captures = self.captures.wrapping_add(1);

        let width = self.bounds.width.max(1);
        let height = self.bounds.height.max(1);
        Ok(Frame::from_fn(self.bounds.width, self.bounds.height, |x, y| {
            let gx = x * 255 / width;
            let gy = y * 255 / height;
            [
                gx.wrapping_add(shift) as u8,
                gy.wrapping_add(shift / 2) as u8,
                (255 - gx).wrapping_add(shift / 3) as u8,
            ]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bounds_rejected() {
        assert!(SyntheticCapturer::new(ScreenBounds::new(0, 10)).is_err());
    }

    #[test]
    fn test_frames_match_bounds_and_move() {
        let mut capturer = SyntheticCapturer::new(ScreenBounds::new(16, 9)).unwrap();
        let first = capturer.capture().unwrap();
        let second = capturer.capture().unwrap();

        assert_eq!(first.bounds(), ScreenBounds::new(16, 9));
        assert_ne!(first, second);
        assert_eq!(capturer.captures(), 2);
    }
}
