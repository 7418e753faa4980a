use crate::{
    colorize::colorize_with_palette,
    composite::{IntensityBuffer, ValueRange, composite},
    config::HeatmapConfig,
    foundation::core::{Canvas, Point},
    foundation::error::HeatmapResult,
    gradient::{Gradient, Palette},
    render::{DEFAULT_BACKEND_ID, RasterRgba, RenderBackend, RenderSettings},
    stamp::{StampCache, StampCacheStats, StampKey},
};

/// Software raster backend.
///
/// Keeps a bounded stamp cache and the palette of the last gradient it colorized with.
pub struct SoftwareBackend {
    stamps: StampCache,
    palette: Option<(Gradient, Palette)>,
}

impl SoftwareBackend {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            stamps: StampCache::new(settings.stamp_cache_capacity),
            palette: None,
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn id(&self) -> &str {
        DEFAULT_BACKEND_ID
    }

    fn create(&mut self, width: u32, height: u32) -> HeatmapResult<IntensityBuffer> {
        IntensityBuffer::new(Canvas::new(width, height)?)
    }

    fn draw_points(
        &mut self,
        surface: &mut IntensityBuffer,
        points: &[Point],
        config: &HeatmapConfig,
        range: ValueRange,
    ) -> HeatmapResult<()> {
        composite(surface, points, config, range, &mut self.stamps)
    }

    fn colorize(
        &mut self,
        surface: &IntensityBuffer,
        config: &HeatmapConfig,
    ) -> HeatmapResult<RasterRgba> {
        let cached = match self.palette.take() {
            Some((g, p)) if g == config.gradient => (g, p),
            _ => (
                config.gradient.clone(),
                Palette::from_gradient(&config.gradient),
            ),
        };
        let out = colorize_with_palette(surface, &cached.1, config);
        self.palette = Some(cached);
        out
    }

    fn config_changed(&mut self, config: &HeatmapConfig) {
        self.stamps
            .retain_only(StampKey::new(config.radius, config.blur));
        if matches!(&self.palette, Some((g, _)) if *g != config.gradient) {
            self.palette = None;
        }
    }

    fn stamp_cache_stats(&self) -> Option<StampCacheStats> {
        Some(self.stamps.stats())
    }
}
