//! Core types for screenhue
//!
//! These types represent the fundamental data structures used throughout
//! the sampling and broadcast pipeline.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, ScreenhueError};

/// Global handle counter for unique subscription IDs
static HANDLE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque handle identifying one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Create a new unique handle
    pub fn new() -> Self {
        Self(HANDLE_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw handle value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

/// Size of the capture area, fixed when a capturer is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenBounds {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ScreenBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for ScreenBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One captured screen image
///
/// Pixels are stored row-major as RGB triples. A frame is consumed by a
/// single reduction and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

impl Frame {
    /// Create a frame from row-major RGB pixels
    pub fn new(width: u32, height: u32, pixels: Vec<[u8; 3]>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ScreenhueError::capture(format!(
                "Frame {}x{} needs {} pixels, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create a frame by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a frame filled with a single color
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self {
            width,
            height,
            pixels: vec![rgb; width as usize * height as usize],
        }
    }

    /// Create a frame from a decoded image, keeping only the top-left `bounds`
    pub fn from_rgb_image(image: &image::RgbImage, bounds: ScreenBounds) -> Result<Self> {
        if image.width() < bounds.width || image.height() < bounds.height {
            return Err(ScreenhueError::capture(format!(
                "Screenshot is {}x{}, smaller than the capture area {}",
                image.width(),
                image.height(),
                bounds
            )));
        }
        Ok(Self::from_fn(bounds.width, bounds.height, |x, y| {
            image.get_pixel(x, y).0
        }))
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frame dimensions
    pub fn bounds(&self) -> ScreenBounds {
        ScreenBounds::new(self.width, self.height)
    }

    /// RGB value at (x, y)
    ///
    /// Panics if the coordinate is outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}

/// An RGB color with 8-bit channels
///
/// Serializes with a derived `hexTriplet` field so consumers don't need to
/// format it themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "ColorRepr", from = "ColorRepr")]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Lowercase `#rrggbb` form
    pub fn hex_triplet(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }

    /// Parse a `#rrggbb` string
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn as_array(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }
}

impl From<[u8; 3]> for Color {
    fn from(rgb: [u8; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hex_triplet())
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_hex(s).ok_or_else(|| format!("Invalid hex color: {}", s))
    }
}

/// Wire form of [`Color`]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColorRepr {
    red: u8,
    green: u8,
    blue: u8,
    #[serde(default, skip_deserializing)]
    hex_triplet: String,
}

impl From<Color> for ColorRepr {
    fn from(color: Color) -> Self {
        Self {
            red: color.red,
            green: color.green,
            blue: color.blue,
            hex_triplet: color.hex_triplet(),
        }
    }
}

impl From<ColorRepr> for Color {
    fn from(repr: ColorRepr) -> Self {
        Self::new(repr.red, repr.green, repr.blue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_unique() {
        let a = Handle::new();
        let b = Handle::new();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_hex_triplet_zero_padded() {
        assert_eq!(Color::new(10, 20, 30).hex_triplet(), "#0a141e");
        assert_eq!(Color::new(0, 0, 0).hex_triplet(), "#000000");
        assert_eq!(Color::new(255, 255, 255).hex_triplet(), "#ffffff");
    }

    #[test]
    fn test_hex_triplet_decodes_back() {
        for (r, g, b) in [(0, 0, 0), (1, 2, 3), (180, 0, 0), (255, 128, 7)] {
            let color = Color::new(r, g, b);
            let hex = color.hex_triplet();
            assert_eq!(hex.len(), 7);
            assert!(hex[1..].chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
            assert_eq!(Color::from_hex(&hex), Some(color));
        }
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert_eq!(Color::from_hex("0a141e"), None);
        assert_eq!(Color::from_hex("#0a141"), None);
        assert_eq!(Color::from_hex("#zz141e"), None);
        assert!("#0a141e".parse::<Color>().is_ok());
    }

    #[test]
    fn test_color_json_has_hex_triplet() {
        let json = serde_json::to_value(Color::new(10, 20, 30)).unwrap();
        assert_eq!(json["red"], 10);
        assert_eq!(json["hexTriplet"], "#0a141e");

        let back: Color = serde_json::from_value(json).unwrap();
        assert_eq!(back, Color::new(10, 20, 30));
    }

    #[test]
    fn test_frame_rejects_wrong_pixel_count() {
        assert!(Frame::new(2, 2, vec![[0, 0, 0]; 3]).is_err());
        assert!(Frame::new(2, 2, vec![[0, 0, 0]; 4]).is_ok());
    }

    #[test]
    fn test_frame_from_fn_row_major() {
        let frame = Frame::from_fn(3, 2, |x, y| [x as u8, y as u8, 0]);
        assert_eq!(frame.pixel(2, 0), [2, 0, 0]);
        assert_eq!(frame.pixel(1, 1), [1, 1, 0]);
        assert_eq!(frame.bounds(), ScreenBounds::new(3, 2));
    }

    #[test]
    fn test_frame_from_image_crops_to_bounds() {
        let image = image::RgbImage::from_fn(8, 6, |x, _| image::Rgb([x as u8, 0, 0]));
        let frame = Frame::from_rgb_image(&image, ScreenBounds::new(4, 4)).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.pixel(3, 3), [3, 0, 0]);

        assert!(Frame::from_rgb_image(&image, ScreenBounds::new(10, 4)).is_err());
    }
}
