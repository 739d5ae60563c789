//! Reduction of a captured frame to representative colors
//!
//! Every algorithm walks the same strided subsample of the frame: columns
//! and rows `0, s, 2s, ...` where `s` is the pixel density. The number of
//! sampled pixels is therefore `ceil(w / s) * ceil(h / s)`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::TAU;

use crate::error::{Result, ScreenhueError};
use crate::types::{Color, Frame};

/// Default sampling stride in both axes
pub const DEFAULT_PIXEL_DENSITY: u32 = 4;

/// Named results of one reduction
pub type AlgorithmResults = BTreeMap<Algorithm, Color>;

/// Color reduction algorithm
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Algorithm {
    /// Arithmetic mean per channel
    #[serde(rename = "avgRgb")]
    AverageRgb,
    /// Root-mean-square per channel (favours bright pixels)
    #[default]
    #[serde(rename = "squaredAvgRgb")]
    SquaredAverageRgb,
    /// Circular mean of the hue, rendered fully saturated
    #[serde(rename = "averageHue")]
    AverageHue,
}

impl Algorithm {
    /// All known algorithms
    pub const ALL: [Algorithm; 3] = [
        Algorithm::AverageRgb,
        Algorithm::SquaredAverageRgb,
        Algorithm::AverageHue,
    ];

    /// Stable name used in events and configuration
    pub fn name(&self) -> &'static str {
        match self {
            Self::AverageRgb => "avgRgb",
            Self::SquaredAverageRgb => "squaredAvgRgb",
            Self::AverageHue => "averageHue",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "avgRgb" | "avg-rgb" | "average" => Ok(Self::AverageRgb),
            "squaredAvgRgb" | "squared-avg-rgb" | "rms" => Ok(Self::SquaredAverageRgb),
            "averageHue" | "average-hue" | "hue" => Ok(Self::AverageHue),
            _ => Err(format!("Unknown algorithm: {}", s)),
        }
    }
}

/// Reduces frames to a set of named colors
#[derive(Debug, Clone)]
pub struct ColorReducer {
    pixel_density: u32,
    algorithms: Vec<Algorithm>,
}

impl ColorReducer {
    /// Create a reducer running `algorithms` at the given stride
    pub fn new(pixel_density: u32, algorithms: impl IntoIterator<Item = Algorithm>) -> Result<Self> {
        if pixel_density == 0 {
            return Err(ScreenhueError::config("Pixel density must be at least 1"));
        }

        let mut algorithms: Vec<Algorithm> = algorithms.into_iter().collect();
        algorithms.sort();
        algorithms.dedup();
        if algorithms.is_empty() {
            return Err(ScreenhueError::config("At least one algorithm must be enabled"));
        }

        Ok(Self {
            pixel_density,
            algorithms,
        })
    }

    /// Sampling stride
    pub fn pixel_density(&self) -> u32 {
        self.pixel_density
    }

    /// Enabled algorithms, in name order
    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Whether `algorithm` is part of every reduction
    pub fn supports(&self, algorithm: Algorithm) -> bool {
        self.algorithms.contains(&algorithm)
    }

    /// Number of pixels a frame of `width` x `height` contributes
    pub fn sampled_pixel_count(&self, width: u32, height: u32) -> u64 {
        let s = self.pixel_density as u64;
        (width as u64).div_ceil(s) * (height as u64).div_ceil(s)
    }

    /// Run every enabled algorithm on `frame`
    pub fn reduce(&self, frame: &Frame) -> Result<AlgorithmResults> {
        self.check_not_empty(frame)?;
        Ok(self
            .algorithms
            .iter()
            .map(|&algorithm| (algorithm, self.apply(algorithm, frame)))
            .collect())
    }

    /// Run a single algorithm, whether or not it is enabled
    pub fn reduce_one(&self, algorithm: Algorithm, frame: &Frame) -> Result<Color> {
        self.check_not_empty(frame)?;
        Ok(self.apply(algorithm, frame))
    }

    fn check_not_empty(&self, frame: &Frame) -> Result<()> {
        if self.sampled_pixel_count(frame.width(), frame.height()) == 0 {
            return Err(ScreenhueError::reduction(format!(
                "Frame {} has no pixels to sample",
                frame.bounds()
            )));
        }
        Ok(())
    }

    fn apply(&self, algorithm: Algorithm, frame: &Frame) -> Color {
        match algorithm {
            Algorithm::AverageRgb => average_rgb(self.samples(frame)),
            Algorithm::SquaredAverageRgb => squared_average_rgb(self.samples(frame)),
            Algorithm::AverageHue => average_hue(self.samples(frame)),
        }
    }

    /// Strided walk over the frame, column by column
    fn samples<'a>(&self, frame: &'a Frame) -> impl Iterator<Item = [u8; 3]> + 'a {
        let step = self.pixel_density as usize;
        (0..frame.width()).step_by(step).flat_map(move |x| {
            (0..frame.height())
                .step_by(step)
                .map(move |y| frame.pixel(x, y))
        })
    }
}

impl Default for ColorReducer {
    fn default() -> Self {
        Self {
            pixel_density: DEFAULT_PIXEL_DENSITY,
            algorithms: Algorithm::ALL.to_vec(),
        }
    }
}

// Callers guarantee at least one sample.

fn average_rgb(samples: impl Iterator<Item = [u8; 3]>) -> Color {
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for pixel in samples {
        for (sum, channel) in sums.iter_mut().zip(pixel) {
            *sum += channel as u64;
        }
        count += 1;
    }
    Color::from(sums.map(|sum| (sum / count) as u8))
}

fn squared_average_rgb(samples: impl Iterator<Item = [u8; 3]>) -> Color {
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for pixel in samples {
        for (sum, channel) in sums.iter_mut().zip(pixel) {
            let c = channel as u64;
            *sum += c * c;
        }
        count += 1;
    }
    Color::from(sums.map(|sum| ((sum / count) as f64).sqrt().floor().min(255.0) as u8))
}

fn average_hue(samples: impl Iterator<Item = [u8; 3]>) -> Color {
    let (mut x, mut y) = (0.0f64, 0.0f64);
    let mut count = 0u64;
    for pixel in samples {
        let angle = rgb_to_hue(pixel) * TAU;
        x += angle.cos();
        y += angle.sin();
        count += 1;
    }
    x /= count as f64;
    y /= count as f64;

    let hue = (y.atan2(x) / TAU).rem_euclid(1.0);
    Color::from(hsb_to_rgb(hue, 1.0, 0.5))
}

/// Hue as a fraction of a turn; greys have hue 0
fn rgb_to_hue([r, g, b]: [u8; 3]) -> f64 {
    let max = r.max(g).max(b) as f64;
    let min = r.min(g).min(b) as f64;
    if max == min {
        return 0.0;
    }
    let span = max - min;
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let rc = (max - r) / span;
    let gc = (max - g) / span;
    let bc = (max - b) / span;

    let sextant = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };

    let hue = sextant / 6.0;
    if hue < 0.0 { hue + 1.0 } else { hue }
}

fn hsb_to_rgb(hue: f64, saturation: f64, brightness: f64) -> [u8; 3] {
    let to_byte = |v: f64| (v * 255.0 + 0.5).floor().clamp(0.0, 255.0) as u8;
    if saturation == 0.0 {
        let v = to_byte(brightness);
        return [v, v, v];
    }

    let h = (hue - hue.floor()) * 6.0;
    let f = h - h.floor();
    let p = brightness * (1.0 - saturation);
    let q = brightness * (1.0 - saturation * f);
    let t = brightness * (1.0 - saturation * (1.0 - f));

    let (r, g, b) = match h as u32 {
        0 => (brightness, t, p),
        1 => (q, brightness, p),
        2 => (p, brightness, t),
        3 => (p, q, brightness),
        4 => (t, p, brightness),
        _ => (brightness, p, q),
    };
    [to_byte(r), to_byte(g), to_byte(b)]
}
