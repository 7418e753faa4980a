//! Color gradients and the 256-entry palette sampled from them.

use std::collections::BTreeMap;

use crate::color::ColorDef;
use crate::foundation::core::Rgb8;
use crate::foundation::error::{HeatmapError, HeatmapResult};

/// Number of palette entries; one per intensity byte.
pub const PALETTE_LEN: usize = 256;

/// A single gradient stop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    /// Position in `[0, 1]`.
    pub offset: f64,
    /// Color at `offset`.
    pub color: Rgb8,
}

/// Ordered set of color stops.
///
/// Stops are kept sorted by offset (stable, so duplicate offsets keep their input order).
/// Positions before the first stop take the first color and positions after the last stop
/// take the last color.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    stops: Vec<GradientStop>,
}

impl Gradient {
    /// Build a gradient, failing on an empty stop list or offsets outside `[0, 1]`.
    pub fn new(mut stops: Vec<GradientStop>) -> HeatmapResult<Self> {
        if stops.is_empty() {
            return Err(HeatmapError::gradient("gradient must have at least one stop"));
        }
        for s in &stops {
            if !s.offset.is_finite() || !(0.0..=1.0).contains(&s.offset) {
                return Err(HeatmapError::gradient(format!(
                    "stop offset {} is outside [0, 1]",
                    s.offset
                )));
            }
        }
        stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        Ok(Self { stops })
    }

    /// Offsets must already be sorted and inside `[0, 1]`.
    pub(crate) fn from_sorted_stops(stops: Vec<GradientStop>) -> Self {
        debug_assert!(stops.windows(2).all(|w| w[0].offset <= w[1].offset));
        Self { stops }
    }

    /// Parse a `"offset" -> color` map as found in configuration JSON.
    pub fn from_map(map: &BTreeMap<String, ColorDef>) -> HeatmapResult<Self> {
        let mut stops = Vec::with_capacity(map.len());
        for (key, color) in map {
            let offset: f64 = key
                .trim()
                .parse()
                .map_err(|_| HeatmapError::gradient(format!("stop key \"{key}\" is not a number")))?;
            stops.push(GradientStop {
                offset,
                color: color.to_rgb8(),
            });
        }
        Self::new(stops)
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    /// Color at position `p` (clamped to `[0, 1]`).
    pub fn sample(&self, p: f64) -> Rgb8 {
        let p = p.clamp(0.0, 1.0);
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Rgb8::default(),
        };
        if p <= first.offset {
            return first.color;
        }
        if p >= last.offset {
            return last.color;
        }

        for w in self.stops.windows(2) {
            let (a, b) = (w[0], w[1]);
            if p <= b.offset {
                let span = b.offset - a.offset;
                if span <= 0.0 {
                    return b.color;
                }
                return a.color.lerp(b.color, (p - a.offset) / span);
            }
        }
        last.color
    }
}

impl<'de> serde::Deserialize<'de> for Gradient {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let map = BTreeMap::<String, ColorDef>::deserialize(deserializer)?;
        Self::from_map(&map).map_err(serde::de::Error::custom)
    }
}

/// 256-entry color lookup table indexed by accumulated intensity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    entries: [Rgb8; PALETTE_LEN],
}

impl Palette {
    /// Sample `gradient` at `i / 255` for every index `i`.
    pub fn from_gradient(gradient: &Gradient) -> Self {
        let mut entries = [Rgb8::default(); PALETTE_LEN];
        for (i, e) in entries.iter_mut().enumerate() {
            *e = gradient.sample(i as f64 / 255.0);
        }
        Self { entries }
    }

    pub fn get(&self, index: u8) -> Rgb8 {
        self.entries[usize::from(index)]
    }

    /// Opaque RGBA8 strip (`256 x 1`) of the palette, for previews.
    pub fn to_rgba_strip(&self) -> Vec<u8> {
        self.entries
            .iter()
            .flat_map(|c| [c.r, c.g, c.b, 255])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stop(offset: f64, r: u8, g: u8, b: u8) -> GradientStop {
        GradientStop {
            offset,
            color: Rgb8::new(r, g, b),
        }
    }

    #[test]
    fn stops_are_sorted_by_offset() {
        let g = Gradient::new(vec![stop(1.0, 255, 0, 0), stop(0.0, 0, 0, 255)]).unwrap();
        assert_eq!(g.stops()[0].offset, 0.0);
        assert_eq!(g.stops()[1].offset, 1.0);
    }

    #[test]
    fn endpoints_are_exact_when_present() {
        let g = Gradient::new(vec![
            stop(0.0, 10, 20, 30),
            stop(0.5, 100, 100, 100),
            stop(1.0, 200, 210, 220),
        ])
        .unwrap();
        let p = Palette::from_gradient(&g);
        assert_eq!(p.get(0), Rgb8::new(10, 20, 30));
        assert_eq!(p.get(255), Rgb8::new(200, 210, 220));
    }

    #[test]
    fn positions_outside_stop_range_clamp_to_nearest_stop() {
        let g = Gradient::new(vec![stop(0.25, 0, 0, 255), stop(0.75, 255, 0, 0)]).unwrap();
        assert_eq!(g.sample(0.0), Rgb8::new(0, 0, 255));
        assert_eq!(g.sample(0.1), Rgb8::new(0, 0, 255));
        assert_eq!(g.sample(0.9), Rgb8::new(255, 0, 0));
        assert_eq!(g.sample(0.5), Rgb8::new(128, 0, 128));
    }

    #[test]
    fn single_stop_fills_palette() {
        let g = Gradient::new(vec![stop(0.4, 1, 2, 3)]).unwrap();
        let p = Palette::from_gradient(&g);
        assert!((0..=255u8).all(|i| p.get(i) == Rgb8::new(1, 2, 3)));
    }

    #[test]
    fn duplicate_offsets_form_a_hard_edge() {
        let g = Gradient::new(vec![
            stop(0.0, 0, 0, 0),
            stop(0.5, 0, 0, 0),
            stop(0.5, 255, 255, 255),
            stop(1.0, 255, 255, 255),
        ])
        .unwrap();
        assert_eq!(g.sample(0.49), Rgb8::new(0, 0, 0));
        assert_eq!(g.sample(0.51), Rgb8::new(255, 255, 255));
    }

    #[test]
    fn malformed_stops_fail_fast() {
        assert!(matches!(
            Gradient::new(vec![]),
            Err(HeatmapError::InvalidGradient(_))
        ));
        assert!(Gradient::new(vec![stop(1.5, 0, 0, 0)]).is_err());
        assert!(Gradient::new(vec![stop(f64::NAN, 0, 0, 0)]).is_err());

        let bad_key = serde_json::from_value::<Gradient>(json!({"low": "#000000"}));
        assert!(bad_key.is_err());
        let out_of_range = serde_json::from_value::<Gradient>(json!({"-0.1": "#000000"}));
        assert!(out_of_range.is_err());
        let bad_color = serde_json::from_value::<Gradient>(json!({"0.5": "not a color"}));
        assert!(bad_color.is_err());
    }

    #[test]
    fn deserializes_css_map() {
        let g: Gradient = serde_json::from_value(json!({
            "1.0": "rgb(255,0,0)",
            "0.1": "rgb(0,0,255)"
        }))
        .unwrap();
        assert_eq!(g.stops().len(), 2);
        assert_eq!(g.stops()[0].color, Rgb8::new(0, 0, 255));
        assert_eq!(g.sample(1.0), Rgb8::new(255, 0, 0));
    }

    #[test]
    fn rgba_strip_is_opaque() {
        let g = Gradient::new(vec![stop(0.0, 0, 0, 0), stop(1.0, 255, 255, 255)]).unwrap();
        let strip = Palette::from_gradient(&g).to_rgba_strip();
        assert_eq!(strip.len(), PALETTE_LEN * 4);
        assert!(strip.chunks_exact(4).all(|px| px[3] == 255));
        assert_eq!(&strip[255 * 4..], &[255, 255, 255, 255]);
    }
}
