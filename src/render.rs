use std::collections::BTreeMap;
use std::str::FromStr;

use crate::{
    composite::{IntensityBuffer, ValueRange},
    config::HeatmapConfig,
    foundation::core::{Canvas, Point},
    foundation::error::{HeatmapError, HeatmapResult},
    pipeline::render_with_backend,
    stamp::{StampCache, StampCacheStats},
};

/// Canonical id of the software raster backend.
pub const DEFAULT_BACKEND_ID: &str = "software";

/// A rendered heatmap as RGBA8 pixels.
///
/// Straight (non-premultiplied) alpha, tightly packed, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterRgba {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

impl RasterRgba {
    /// Fully transparent raster of the given size.
    pub fn transparent(width: u32, height: u32) -> HeatmapResult<Self> {
        let len = Canvas::new(width, height)?
            .pixel_count()?
            .checked_mul(4)
            .ok_or_else(|| HeatmapError::validation("raster byte length overflows usize"))?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; len],
        })
    }

    /// RGBA of pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// `true` when every pixel has zero alpha.
    pub fn is_fully_transparent(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Convert into an `image` buffer for encoding.
    pub fn into_rgba_image(self) -> HeatmapResult<image::RgbaImage> {
        let (w, h) = (self.width, self.height);
        image::RgbaImage::from_raw(w, h, self.data).ok_or_else(|| {
            HeatmapError::validation(format!("raster data does not match {w}x{h} rgba8"))
        })
    }
}

/// Settings applied when a backend is created.
#[derive(Clone, Debug)]
pub struct RenderSettings {
    /// Number of `(radius, blur)` stamps kept between renders; 0 rebuilds every call.
    pub stamp_cache_capacity: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            stamp_cache_capacity: StampCache::DEFAULT_CAPACITY,
        }
    }
}

/// A raster surface capability: create a blank intensity surface, draw stamps into it, and
/// map it to colors.
///
/// Most users do not drive a backend directly; prefer [`crate::render_heatmap`] or
/// [`crate::HeatmapRenderer`].
pub trait RenderBackend: Send {
    /// Registry id this backend was created under.
    fn id(&self) -> &str;

    /// Blank intensity surface for a `width x height` canvas.
    fn create(&mut self, width: u32, height: u32) -> HeatmapResult<IntensityBuffer>;

    /// Composite every point's stamp into `surface`.
    fn draw_points(
        &mut self,
        surface: &mut IntensityBuffer,
        points: &[Point],
        config: &HeatmapConfig,
        range: ValueRange,
    ) -> HeatmapResult<()>;

    /// Map `surface` to the final RGBA raster.
    fn colorize(
        &mut self,
        surface: &IntensityBuffer,
        config: &HeatmapConfig,
    ) -> HeatmapResult<RasterRgba>;

    /// Called when the active configuration changes; backends drop cached state that no
    /// longer matches `config`.
    fn config_changed(&mut self, _config: &HeatmapConfig) {}

    /// Stamp cache counters, for backends that cache stamps.
    fn stamp_cache_stats(&self) -> Option<StampCacheStats> {
        None
    }

    /// Full render: create, draw, colorize.
    fn render(
        &mut self,
        points: &[Point],
        width: u32,
        height: u32,
        config: &HeatmapConfig,
    ) -> HeatmapResult<RasterRgba> {
        render_with_backend(self, points, width, height, config)
    }
}

impl std::fmt::Debug for dyn RenderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderBackend")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

/// Available backend kinds.
///
/// - `Software` is always available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// CPU raster backend.
    Software,
}

impl BackendKind {
    /// Canonical registry id.
    pub fn id(self) -> &'static str {
        match self {
            Self::Software => DEFAULT_BACKEND_ID,
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Software => &["software", "raster/software", "canvas2d", "cpu"],
        }
    }
}

impl FromStr for BackendKind {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Software]
            .into_iter()
            .find(|k| k.aliases().contains(&s))
            .ok_or_else(|| HeatmapError::unsupported_backend(s))
    }
}

/// Create a backend of a known kind.
pub fn create_backend(
    kind: BackendKind,
    settings: &RenderSettings,
) -> HeatmapResult<Box<dyn RenderBackend>> {
    match kind {
        BackendKind::Software => Ok(Box::new(crate::render_cpu::SoftwareBackend::new(
            settings.clone(),
        ))),
    }
}

/// Constructor stored in a [`BackendRegistry`].
pub type BackendFactory = fn(&RenderSettings) -> HeatmapResult<Box<dyn RenderBackend>>;

/// Maps backend ids to constructors. The only extension point for new backends.
#[derive(Clone)]
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl Default for BackendRegistry {
    /// Registry with the software backend under all of its ids.
    fn default() -> Self {
        let mut r = Self::empty();
        for id in BackendKind::Software.aliases() {
            r.register(*id, |s| create_backend(BackendKind::Software, s));
        }
        r
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("ids", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register `factory` under `id`, returning the factory it replaced.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        factory: BackendFactory,
    ) -> Option<BackendFactory> {
        self.factories.insert(id.into(), factory)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Create the backend registered under `id`.
    #[tracing::instrument(skip(self, settings))]
    pub fn resolve(
        &self,
        id: &str,
        settings: &RenderSettings,
    ) -> HeatmapResult<Box<dyn RenderBackend>> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| HeatmapError::unsupported_backend(id))?;
        let backend = factory(settings)?;
        tracing::debug!(id, "resolved render backend");
        Ok(backend)
    }
}

/// Resolve `id` against the default registry.
pub fn resolve_backend(
    id: &str,
    settings: &RenderSettings,
) -> HeatmapResult<Box<dyn RenderBackend>> {
    BackendRegistry::default().resolve(id, settings)
}
