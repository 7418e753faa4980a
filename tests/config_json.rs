use heatmap::{ConfigOverrides, HeatmapConfig, HeatmapError, Point, Rgb8, render_heatmap};

fn warm_config() -> HeatmapConfig {
    let overrides = ConfigOverrides::from_json(include_str!("data/warm_config.json")).unwrap();
    HeatmapConfig::from_overrides(overrides).unwrap()
}

#[test]
fn json_fixture_overlays_defaults() {
    let config = warm_config();
    assert_eq!(config.backend, "software");
    assert_eq!(config.radius, 12.0);
    assert_eq!(config.min_opacity, 0.1);
    assert_eq!(config.max_opacity, 0.8);
    assert_eq!(config.blur, 0.5);

    let stops = config.gradient.stops();
    assert_eq!(stops.len(), 4);
    assert_eq!(stops[0].color, Rgb8::new(0, 0, 64));
    assert_eq!(stops[1].color, Rgb8::new(0x20, 0x60, 0xff));
    assert_eq!(stops[2].color, Rgb8::new(255, 204, 0));
    assert_eq!(stops[3].color, Rgb8::new(255, 0, 0));
}

#[test]
fn json_fixture_renders() {
    let points: Vec<Point> = serde_json::from_str(include_str!("data/points.json")).unwrap();
    let out = render_heatmap(&points, 64, 64, &warm_config()).unwrap();
    assert!(!out.is_fully_transparent());
    assert_eq!(out.pixel(63, 0), Some([0, 0, 0, 0]));
}

#[test]
fn partial_override_keeps_other_defaults() {
    let overrides = ConfigOverrides::from_json(r#"{"maxOpacity": 0.9}"#).unwrap();
    let config = HeatmapConfig::from_overrides(overrides).unwrap();
    let defaults = HeatmapConfig::default();
    assert_eq!(config.max_opacity, 0.9);
    assert_eq!(config.radius, defaults.radius);
    assert_eq!(config.gradient, defaults.gradient);
}

#[test]
fn malformed_json_is_rejected() {
    assert!(matches!(
        ConfigOverrides::from_json(r#"{"radius": "#),
        Err(HeatmapError::Serde(_))
    ));
    assert!(matches!(
        ConfigOverrides::from_json(r#"{"radios": 10}"#),
        Err(HeatmapError::Serde(_))
    ));

    let bad_gradient = ConfigOverrides::from_json(r#"{"gradient": {"1.5": "red"}}"#);
    assert!(bad_gradient.is_err());

    let overrides = ConfigOverrides::from_json(r#"{"minOpacity": 0.9, "maxOpacity": 0.2}"#).unwrap();
    assert!(matches!(
        HeatmapConfig::from_overrides(overrides),
        Err(HeatmapError::Validation(_))
    ));
}
