use std::cmp::Ordering;

use crate::config::HeatmapConfig;
use crate::foundation::core::{Canvas, Point};
use crate::foundation::error::{HeatmapError, HeatmapResult};
use crate::foundation::math::{mul_div255_u8, unit_to_u8};
use crate::stamp::{Stamp, StampCache};

/// Lowest opacity a stamp is ever drawn with.
pub const MIN_DRAW_OPACITY: f64 = 0.01;

/// Alpha-only accumulation raster, one byte per pixel, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntensityBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl IntensityBuffer {
    /// Blank (all-zero) buffer.
    pub fn new(canvas: Canvas) -> HeatmapResult<Self> {
        let canvas = Canvas::new(canvas.width, canvas.height)?;
        Ok(Self {
            width: canvas.width,
            height: canvas.height,
            data: vec![0u8; canvas.pixel_count()?],
        })
    }

    /// Wrap existing alpha bytes; `data.len()` must equal `width * height`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> HeatmapResult<Self> {
        let canvas = Canvas::new(width, height)?;
        if data.len() != canvas.pixel_count()? {
            return Err(HeatmapError::validation(
                "intensity buffer expects width*height bytes",
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&a| a == 0)
    }

    /// Source-over `stamp` with its top-left corner at `(left, top)`, scaled by `opacity`.
    /// Parts of the stamp outside the buffer are clipped.
    pub fn draw_stamp(&mut self, stamp: &Stamp, left: i64, top: i64, opacity: f64) {
        let op = u16::from(unit_to_u8(opacity));
        if op == 0 {
            return;
        }

        let side = i64::from(stamp.side());
        let (w, h) = (i64::from(self.width), i64::from(self.height));

        let x0 = left.max(0);
        let x1 = left.saturating_add(side).min(w);
        let y0 = top.max(0);
        let y1 = top.saturating_add(side).min(h);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let src = stamp.alpha();
        for y in y0..y1 {
            let src_row = ((y - top) * side) as usize;
            let dst_row = (y * w) as usize;
            for x in x0..x1 {
                let s = src[src_row + (x - left) as usize];
                let d = &mut self.data[dst_row + x as usize];
                *d = over_alpha(*d, s, op);
            }
        }
    }
}

/// Source-over on a single alpha channel: `sa + da * (1 - sa)` with `sa = src * op`.
pub fn over_alpha(dst: u8, src: u8, op: u16) -> u8 {
    let sa = mul_div255_u8(u16::from(src), op.min(255));
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);
    sa.saturating_add(mul_div255_u8(u16::from(dst), inv))
}

/// Observed value range of a point set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Min/max over `points`; `None` when there are no points with a finite value.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        points
            .iter()
            .map(|p| p.value)
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some(Self { min: v, max: v }),
                Some(r) => Some(Self {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    /// All values equal (including the single-point case).
    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    /// `value` rescaled into `[0, 1]`. A degenerate range maps every value to 1; a NaN
    /// value maps to 0.
    ///
    /// Operands are halved before subtracting so ranges wider than `f64::MAX` stay finite.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            return 1.0;
        }
        let span = self.max / 2.0 - self.min / 2.0;
        if span <= 0.0 {
            return 1.0;
        }
        let t = (value / 2.0 - self.min / 2.0) / span;
        if t.is_nan() {
            return 0.0;
        }
        t.clamp(0.0, 1.0)
    }
}

pub fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Per-draw opacity for a value: smoothstep of the normalized value, floored at
/// [`MIN_DRAW_OPACITY`].
pub fn draw_opacity(range: &ValueRange, value: f64) -> f64 {
    smoothstep(range.normalize(value)).max(MIN_DRAW_OPACITY)
}

/// Draw every point's stamp into `buffer`, lowest values first.
///
/// The sort is stable so equal values keep their input order; the highest values land on
/// top of overlaps.
#[tracing::instrument(skip_all, fields(points = points.len(), radius = config.radius, blur = config.blur))]
pub fn composite(
    buffer: &mut IntensityBuffer,
    points: &[Point],
    config: &HeatmapConfig,
    range: ValueRange,
    stamps: &mut StampCache,
) -> HeatmapResult<()> {
    if points.is_empty() {
        return Ok(());
    }
    for p in points {
        p.validate()?;
    }
    if range.is_degenerate() {
        tracing::debug!(value = range.min, "degenerate value range; drawing at full opacity");
    }

    let stamp = stamps.get_or_build(config.radius, config.blur)?;
    let shift = config.radius + config.blur_offset();

    let mut sorted: Vec<&Point> = points.iter().collect();
    sorted.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal));

    for p in sorted {
        let left = (p.x - shift).round() as i64;
        let top = (p.y - shift).round() as i64;
        buffer.draw_stamp(&stamp, left, top, draw_opacity(&range, p.value));
    }
    Ok(())
}
