use crate::foundation::error::{HeatmapError, HeatmapResult};

/// A weighted sample in pixel space.
///
/// `x`/`y` are pixel coordinates of the sample center (they may lie outside the canvas; the
/// stamp is clipped). `value` is the intensity weight, normalized against the observed
/// min/max of the point set at render time.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    /// Horizontal pixel coordinate.
    pub x: f64,
    /// Vertical pixel coordinate.
    pub y: f64,
    /// Intensity weight.
    pub value: f64,
}

impl Point {
    /// Create a point.
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    pub(crate) fn validate(&self) -> HeatmapResult<()> {
        if !(self.x.is_finite() && self.y.is_finite() && self.value.is_finite()) {
            return Err(HeatmapError::validation(format!(
                "point ({}, {}) value {} must be finite",
                self.x, self.y, self.value
            )));
        }
        Ok(())
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create validated canvas dimensions (`width > 0`, `height > 0`).
    pub fn new(width: u32, height: u32) -> HeatmapResult<Self> {
        if width == 0 || height == 0 {
            return Err(HeatmapError::invalid_dimension(width, height));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels, or an error if the product overflows `usize`.
    pub fn pixel_count(self) -> HeatmapResult<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .ok_or_else(|| HeatmapError::validation("canvas pixel count overflows usize"))
    }
}

/// Straight (non-premultiplied) RGB8 color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    /// Create a color from channel bytes.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear interpolation between `self` and `other`, rounded to nearest.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        fn mix(a: u8, b: u8, t: f64) -> u8 {
            let a = f64::from(a);
            let b = f64::from(b);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        }

        let t = t.clamp(0.0, 1.0);
        Self {
            r: mix(self.r, other.r, t),
            g: mix(self.g, other.g, t),
            b: mix(self.b, other.b, t),
        }
    }
}
