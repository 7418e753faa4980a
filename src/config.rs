//! Render configuration: the fixed default table and the explicit overlay that produces an
//! immutable, validated [`HeatmapConfig`].

use crate::foundation::core::Rgb8;
use crate::foundation::error::{HeatmapError, HeatmapResult};
use crate::gradient::{Gradient, GradientStop};
use crate::render::DEFAULT_BACKEND_ID;
use crate::stamp::stamp_side;

/// Fully resolved render configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct HeatmapConfig {
    /// Registry id of the rendering backend.
    pub backend: String,
    /// Stamp falloff radius in pixels (`> 0`).
    pub radius: f64,
    /// Threshold at or below which normalized intensity passes through unscaled.
    pub min_opacity: f64,
    /// Cap on final pixel opacity above the threshold.
    pub max_opacity: f64,
    /// Halo size factor for the stamp and opacity boost factor for colorization.
    pub blur: f64,
    /// Color ramp sampled into the palette.
    pub gradient: Gradient,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND_ID.to_owned(),
            radius: 25.0,
            min_opacity: 0.05,
            max_opacity: 0.5,
            blur: 0.95,
            gradient: default_gradient(),
        }
    }
}

fn default_gradient() -> Gradient {
    let stops = [
        (0.1, Rgb8::new(0, 0, 255)),
        (0.4, Rgb8::new(0, 255, 0)),
        (0.6, Rgb8::new(255, 255, 0)),
        (0.8, Rgb8::new(255, 128, 0)),
        (1.0, Rgb8::new(255, 0, 0)),
    ]
    .into_iter()
    .map(|(offset, color)| GradientStop { offset, color })
    .collect();

    Gradient::from_sorted_stops(stops)
}

/// Partial configuration as supplied by callers; every field is optional.
///
/// JSON keys are camelCase. `defaultRenderer` is accepted as an alias for `backend`.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(default, alias = "defaultRenderer")]
    pub backend: Option<String>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub min_opacity: Option<f64>,
    #[serde(default)]
    pub max_opacity: Option<f64>,
    #[serde(default)]
    pub blur: Option<f64>,
    #[serde(default)]
    pub gradient: Option<Gradient>,
}

impl ConfigOverrides {
    pub fn from_json(s: &str) -> HeatmapResult<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

impl HeatmapConfig {
    /// Resolve `overrides` on top of the default table.
    pub fn from_overrides(overrides: ConfigOverrides) -> HeatmapResult<Self> {
        Self::default().overlay(overrides)
    }

    /// Return a new config with every supplied field of `overrides` replacing the value in
    /// `self`. A supplied gradient replaces the whole gradient. The result is validated.
    pub fn overlay(&self, overrides: ConfigOverrides) -> HeatmapResult<Self> {
        let ConfigOverrides {
            backend,
            radius,
            min_opacity,
            max_opacity,
            blur,
            gradient,
        } = overrides;

        let out = Self {
            backend: backend.unwrap_or_else(|| self.backend.clone()),
            radius: radius.unwrap_or(self.radius),
            min_opacity: min_opacity.unwrap_or(self.min_opacity),
            max_opacity: max_opacity.unwrap_or(self.max_opacity),
            blur: blur.unwrap_or(self.blur),
            gradient: gradient.unwrap_or_else(|| self.gradient.clone()),
        };
        out.validate()?;
        Ok(out)
    }

    pub fn validate(&self) -> HeatmapResult<()> {
        if self.backend.trim().is_empty() {
            return Err(HeatmapError::validation("backend id must not be empty"));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(HeatmapError::validation(format!(
                "radius must be > 0, got {}",
                self.radius
            )));
        }
        for (name, v) in [
            ("minOpacity", self.min_opacity),
            ("maxOpacity", self.max_opacity),
            ("blur", self.blur),
        ] {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(HeatmapError::validation(format!(
                    "{name} must be in [0, 1], got {v}"
                )));
            }
        }
        if self.min_opacity > self.max_opacity {
            return Err(HeatmapError::validation(format!(
                "minOpacity ({}) must be <= maxOpacity ({})",
                self.min_opacity, self.max_opacity
            )));
        }
        stamp_side(self.radius, self.blur)?;
        Ok(())
    }

    /// Horizontal/vertical distance from the stamp edge to the falloff circle.
    pub fn blur_offset(&self) -> f64 {
        self.radius * self.blur
    }
}
