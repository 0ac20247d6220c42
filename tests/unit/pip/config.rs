use super::*;

fn preview_cfg() -> PipConfig {
    PipConfig::new(
        ShapeKind::Circle,
        Point::new(50.0, 30.0),
        Size::new(200.0, 100.0),
        CoordSpace::Preview {
            width: 960.0,
            height: 540.0,
        },
    )
    .with_border("#ffffff", 3.0)
}

#[test]
fn to_source_space_scales_each_axis() {
    let source = PixelSize::new(1920, 1080).unwrap();
    let cfg = preview_cfg().to_source_space(source);
    assert_eq!(cfg.space, CoordSpace::Source);
    assert_eq!(cfg.position, Point::new(100.0, 60.0));
    assert_eq!(cfg.size, Size::new(400.0, 200.0));
    assert_eq!(cfg.border.as_ref().unwrap().width, 6.0);

    // Already in source space: unchanged.
    assert_eq!(cfg.to_source_space(source), cfg);
}

#[test]
fn non_uniform_scaling_is_per_axis() {
    let cfg = preview_cfg().to_source_space(PixelSize::new(1920, 540).unwrap());
    assert_eq!(cfg.position, Point::new(100.0, 30.0));
    assert_eq!(cfg.size, Size::new(400.0, 100.0));
    assert_eq!(cfg.border.as_ref().unwrap().width, 3.0);
}

#[test]
fn preview_and_source_round_trip() {
    let source = PixelSize::new(1920, 1080).unwrap();
    let back = preview_cfg()
        .to_source_space(source)
        .to_preview_space(source, Size::new(960.0, 540.0));
    assert_eq!(back, preview_cfg());
}

#[test]
fn validate_rejects_bad_configs() {
    assert!(preview_cfg().validate().is_ok());

    let mut bad = preview_cfg();
    bad.size = Size::new(0.0, 10.0);
    assert!(bad.validate().is_err());

    let bad = preview_cfg().with_border("white", 2.0);
    assert!(bad.validate().is_err());

    let bad = preview_cfg().with_border("#000", -1.0);
    assert!(bad.validate().is_err());

    let mut bad = preview_cfg();
    bad.position = Point::new(f64::NAN, 0.0);
    assert!(bad.validate().is_err());

    let mut bad = preview_cfg();
    bad.space = CoordSpace::Preview {
        width: 0.0,
        height: 540.0,
    };
    assert!(bad.validate().is_err());
}

#[test]
fn serde_shape_and_space_forms() {
    let json = serde_json::to_value(preview_cfg()).unwrap();
    assert_eq!(json["shape"], "circle");
    assert_eq!(json["space"]["kind"], "preview");
    assert_eq!(json["position"]["x"], 50.0);

    let parsed: PipConfig = serde_json::from_value(serde_json::json!({
        "shape": "hex",
        "position": {"x": 1.0, "y": 2.0},
        "size": {"width": 10.0, "height": 10.0},
        "space": {"kind": "source"}
    }))
    .unwrap();
    assert_eq!(parsed.shape, ShapeKind::Hexagon);
    assert_eq!(parsed.border, None);
}
