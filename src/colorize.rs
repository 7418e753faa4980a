use crate::composite::IntensityBuffer;
use crate::config::HeatmapConfig;
use crate::foundation::error::HeatmapResult;
use crate::foundation::math::unit_to_u8;
use crate::gradient::Palette;
use crate::render::RasterRgba;

/// Final pixel opacity for a normalized intensity `n`.
///
/// At or below `min_opacity` the intensity passes through unscaled; above it the intensity
/// is boosted by `1 + blur` and capped at `max_opacity`. The two branches are not
/// continuous at the threshold (a pixel just above it can end up more opaque or less opaque
/// than one just below, depending on `max_opacity`).
pub fn shape_opacity(n: f64, config: &HeatmapConfig) -> f64 {
    if n <= config.min_opacity {
        n
    } else {
        (n * (1.0 + config.blur)).min(config.max_opacity)
    }
}

/// Map accumulated intensity to RGBA through the config's gradient.
pub fn colorize(buffer: &IntensityBuffer, config: &HeatmapConfig) -> HeatmapResult<RasterRgba> {
    let palette = Palette::from_gradient(&config.gradient);
    colorize_with_palette(buffer, &palette, config)
}

/// Map accumulated intensity to RGBA with a prebuilt palette.
///
/// Zero-intensity pixels stay fully transparent black. Every other pixel takes the palette
/// color at its intensity byte (`floor(n * 255)` is the byte itself) and the opacity from
/// [`shape_opacity`].
#[tracing::instrument(skip_all, fields(width = buffer.width(), height = buffer.height()))]
pub fn colorize_with_palette(
    buffer: &IntensityBuffer,
    palette: &Palette,
    config: &HeatmapConfig,
) -> HeatmapResult<RasterRgba> {
    let mut out = RasterRgba::transparent(buffer.width(), buffer.height())?;

    for (px, &a) in out.data.chunks_exact_mut(4).zip(buffer.data()) {
        if a == 0 {
            continue;
        }
        let n = f64::from(a) / 255.0;
        let c = palette.get(a);
        px[0] = c.r;
        px[1] = c.g;
        px[2] = c.b;
        px[3] = unit_to_u8(shape_opacity(n, config));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgb8;
    use crate::gradient::{Gradient, GradientStop};

    fn ramp_config(min_opacity: f64, max_opacity: f64, blur: f64) -> HeatmapConfig {
        HeatmapConfig {
            min_opacity,
            max_opacity,
            blur,
            gradient: Gradient::new(vec![
                GradientStop {
                    offset: 0.0,
                    color: Rgb8::new(0, 0, 0),
                },
                GradientStop {
                    offset: 1.0,
                    color: Rgb8::new(255, 255, 255),
                },
            ])
            .unwrap(),
            ..HeatmapConfig::default()
        }
    }

    fn all_bytes() -> IntensityBuffer {
        IntensityBuffer::from_raw(256, 1, (0..=255u8).collect()).unwrap()
    }

    #[test]
    fn zero_intensity_is_transparent() {
        let buf = IntensityBuffer::from_raw(2, 1, vec![0, 10]).unwrap();
        let out = colorize(&buf, &HeatmapConfig::default()).unwrap();
        assert_eq!(out.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_ne!(out.pixel(1, 0).unwrap()[3], 0);
    }

    #[test]
    fn below_threshold_passes_through() {
        let config = ramp_config(1.0, 1.0, 0.95);
        let out = colorize(&all_bytes(), &config).unwrap();
        for a in 0..=255u32 {
            assert_eq!(u32::from(out.pixel(a, 0).unwrap()[3]), a);
        }
    }

    #[test]
    fn above_threshold_is_capped() {
        let config = ramp_config(0.05, 0.5, 0.95);
        let cap = unit_to_u8(0.5);
        let out = colorize(&all_bytes(), &config).unwrap();
        for a in 0..=255u32 {
            let n = f64::from(a) / 255.0;
            let alpha = out.pixel(a, 0).unwrap()[3];
            if n <= 0.05 {
                assert_eq!(u32::from(alpha), a);
            } else {
                assert!(alpha <= cap, "a={a} alpha={alpha}");
            }
        }
    }

    #[test]
    fn boost_applies_between_threshold_and_cap() {
        let config = ramp_config(0.05, 1.0, 0.5);
        // n = 0.2 -> 0.3
        assert!((shape_opacity(0.2, &config) - 0.3).abs() < 1e-12);
        // n = 0.9 -> capped at 1.0
        assert_eq!(shape_opacity(0.9, &config), 1.0);
        // n == threshold passes through
        assert_eq!(shape_opacity(0.05, &config), 0.05);
    }

    #[test]
    fn color_comes_from_intensity_index() {
        let config = ramp_config(0.0, 1.0, 0.0);
        let out = colorize(&all_bytes(), &config).unwrap();
        let palette = Palette::from_gradient(&config.gradient);
        for a in 1..=255u8 {
            let px = out.pixel(u32::from(a), 0).unwrap();
            let c = palette.get(a);
            assert_eq!([px[0], px[1], px[2]], [c.r, c.g, c.b]);
        }
        assert_eq!(out.pixel(255, 0), Some([255, 255, 255, 255]));
    }
}
