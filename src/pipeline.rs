use crate::{
    composite::ValueRange,
    config::HeatmapConfig,
    foundation::core::{Canvas, Point},
    foundation::error::HeatmapResult,
    render::{BackendRegistry, RasterRgba, RenderBackend, RenderSettings},
    stamp::StampCacheStats,
};

/// Render `points` onto a `width x height` raster with the backend named by `config`.
///
/// Stamps are not retained across calls; use [`HeatmapRenderer`] to reuse them.
pub fn render_heatmap(
    points: &[Point],
    width: u32,
    height: u32,
    config: &HeatmapConfig,
) -> HeatmapResult<RasterRgba> {
    Canvas::new(width, height)?;
    let settings = RenderSettings {
        stamp_cache_capacity: 0,
    };
    let mut backend = BackendRegistry::default().resolve(&config.backend, &settings)?;
    render_with_backend(backend.as_mut(), points, width, height, config)
}

/// Run the full pipeline on an already resolved backend.
///
/// Validates inputs up front so no partial raster is produced. An empty point set skips
/// drawing entirely and yields a fully transparent raster.
#[tracing::instrument(
    skip(backend, points, config),
    fields(backend = backend.id(), points = points.len())
)]
pub fn render_with_backend<B: RenderBackend + ?Sized>(
    backend: &mut B,
    points: &[Point],
    width: u32,
    height: u32,
    config: &HeatmapConfig,
) -> HeatmapResult<RasterRgba> {
    Canvas::new(width, height)?;
    config.validate()?;
    for p in points {
        p.validate()?;
    }

    let mut surface = backend.create(width, height)?;
    if let Some(range) = ValueRange::from_points(points) {
        backend.draw_points(&mut surface, points, config, range)?;
    }
    backend.colorize(&surface, config)
}

/// Reusable renderer: one configuration, one backend, stamps cached across renders.
#[derive(Debug)]
pub struct HeatmapRenderer {
    config: HeatmapConfig,
    settings: RenderSettings,
    registry: BackendRegistry,
    backend: Box<dyn RenderBackend>,
}

impl HeatmapRenderer {
    /// Create a renderer backed by the default registry.
    pub fn new(config: HeatmapConfig, settings: RenderSettings) -> HeatmapResult<Self> {
        Self::with_registry(config, settings, BackendRegistry::default())
    }

    pub fn with_registry(
        config: HeatmapConfig,
        settings: RenderSettings,
        registry: BackendRegistry,
    ) -> HeatmapResult<Self> {
        config.validate()?;
        let backend = registry.resolve(&config.backend, &settings)?;
        Ok(Self {
            config,
            settings,
            registry,
            backend,
        })
    }

    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    pub fn backend_id(&self) -> &str {
        self.backend.id()
    }

    /// Swap the configuration.
    ///
    /// A different backend id resolves a fresh backend; otherwise the current backend drops
    /// cached stamps for a `(radius, blur)` that no longer applies.
    pub fn set_config(&mut self, config: HeatmapConfig) -> HeatmapResult<()> {
        config.validate()?;
        if config.backend != self.config.backend {
            self.backend = self.registry.resolve(&config.backend, &self.settings)?;
        } else {
            self.backend.config_changed(&config);
        }
        self.config = config;
        Ok(())
    }

    pub fn render(
        &mut self,
        points: &[Point],
        width: u32,
        height: u32,
    ) -> HeatmapResult<RasterRgba> {
        render_with_backend(self.backend.as_mut(), points, width, height, &self.config)
    }

    pub fn stamp_cache_stats(&self) -> Option<StampCacheStats> {
        self.backend.stamp_cache_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::error::HeatmapError;

    fn pts() -> Vec<Point> {
        vec![Point::new(10.0, 10.0, 1.0), Point::new(30.0, 30.0, 5.0)]
    }

    #[test]
    fn invalid_dimensions_fail_before_backend_resolution() {
        let config = HeatmapConfig {
            backend: "nope".to_owned(),
            ..HeatmapConfig::default()
        };
        let err = render_heatmap(&pts(), 0, 10, &config).unwrap_err();
        assert!(matches!(err, HeatmapError::InvalidDimension { width: 0, height: 10 }));

        let err = render_heatmap(&pts(), 10, 10, &config).unwrap_err();
        assert!(matches!(err, HeatmapError::UnsupportedBackend(_)));
    }

    #[test]
    fn renderer_reuses_stamps() {
        let mut r = HeatmapRenderer::new(HeatmapConfig::default(), RenderSettings::default())
            .unwrap();
        let a = r.render(&pts(), 64, 64).unwrap();
        let b = r.render(&pts(), 64, 64).unwrap();
        assert_eq!(a, b);

        let st = r.stamp_cache_stats().unwrap();
        assert_eq!(st.misses, 1);
        assert_eq!(st.hits, 1);
    }

    #[test]
    fn set_config_invalidates_stale_stamps() {
        let mut r = HeatmapRenderer::new(HeatmapConfig::default(), RenderSettings::default())
            .unwrap();
        r.render(&pts(), 64, 64).unwrap();
        assert_eq!(r.stamp_cache_stats().unwrap().retained, 1);

        r.set_config(HeatmapConfig {
            radius: 10.0,
            ..HeatmapConfig::default()
        })
        .unwrap();
        assert_eq!(r.stamp_cache_stats().unwrap().retained, 0);

        r.render(&pts(), 64, 64).unwrap();
        assert_eq!(r.stamp_cache_stats().unwrap().misses, 2);
    }

    #[test]
    fn set_config_switches_backend_and_rejects_unknown() {
        let mut r = HeatmapRenderer::new(HeatmapConfig::default(), RenderSettings::default())
            .unwrap();
        r.set_config(HeatmapConfig {
            backend: "canvas2d".to_owned(),
            ..HeatmapConfig::default()
        })
        .unwrap();
        assert_eq!(r.config().backend, "canvas2d");
        assert_eq!(r.backend_id(), "software");

        let err = r
            .set_config(HeatmapConfig {
                backend: "webgl".to_owned(),
                ..HeatmapConfig::default()
            })
            .unwrap_err();
        assert!(matches!(err, HeatmapError::UnsupportedBackend(_)));
        assert_eq!(r.config().backend, "canvas2d");
    }

    #[test]
    fn non_finite_points_are_rejected_without_partial_output() {
        let bad = [Point::new(1.0, 1.0, f64::NAN)];
        let err = render_heatmap(&bad, 10, 10, &HeatmapConfig::default()).unwrap_err();
        assert!(matches!(err, HeatmapError::Validation(_)));
    }
}
