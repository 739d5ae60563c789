//! Screen capture
//!
//! This module handles:
//! - The capture contract the sampler depends on
//! - A command-line adapter that decodes screenshots from an external tool
//! - A synthetic test-pattern source for running without a display

pub mod command;
pub mod synthetic;

pub use command::CommandCapturer;
pub use synthetic::SyntheticCapturer;

use crate::error::Result;
use crate::types::{Frame, ScreenBounds};

/// Source of full-screen frames
///
/// The capture area is fixed when the capturer is built. Implementations
/// may block; the sampler only ever runs one `capture` at a time, so they
/// need no internal locking.
pub trait ScreenCapturer: Send {
    /// Short name for logs
    fn name(&self) -> &str;

    /// The capture area
    fn bounds(&self) -> ScreenBounds;

    /// Capture one frame of the capture area
    fn capture(&mut self) -> Result<Frame>;
}

impl<C: ScreenCapturer + ?Sized> ScreenCapturer for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn bounds(&self) -> ScreenBounds {
        (**self).bounds()
    }

    fn capture(&mut self) -> Result<Frame> {
        (**self).capture()
    }
}
