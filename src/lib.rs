//! Weighted point sets to colorized density rasters.
//!
//! The pipeline has three stages, each a pure function of its inputs:
//!
//! - build a radial falloff [`Stamp`] for `(radius, blur)`,
//! - composite one stamp per point into an alpha-only [`IntensityBuffer`],
//! - map intensity through a 256-entry [`Palette`] into a straight-alpha [`RasterRgba`].
//!
//! Backends are resolved by id through a [`BackendRegistry`]; the software raster backend
//! is always registered.
#![forbid(unsafe_code)]

mod foundation;

pub mod color;
pub mod colorize;
pub mod composite;
pub mod config;
pub mod gradient;
pub mod pipeline;
pub mod render;
pub mod render_cpu;
pub mod stamp;

pub use crate::foundation::core::{Canvas, Point, Rgb8};
pub use crate::foundation::error::{HeatmapError, HeatmapResult};

pub use color::ColorDef;
pub use colorize::{colorize, shape_opacity};
pub use composite::{IntensityBuffer, ValueRange, composite};
pub use config::{ConfigOverrides, HeatmapConfig};
pub use gradient::{Gradient, GradientStop, PALETTE_LEN, Palette};
pub use pipeline::{HeatmapRenderer, render_heatmap, render_with_backend};
pub use render::{
    BackendFactory, BackendKind, BackendRegistry, DEFAULT_BACKEND_ID, RasterRgba, RenderBackend,
    RenderSettings, create_backend, resolve_backend,
};
pub use render_cpu::SoftwareBackend;
pub use stamp::{Stamp, StampCache, StampCacheStats, StampKey, stamp_side};
