//! Print the composition plan for a timeline as JSON.
//!
//! `cargo run --example plan_dump [clips.json]` reads a JSON array of clips, or plans a built-in
//! screen + webcam timeline. Set `RUST_LOG=clipforge=debug` to see classification and step logs.

use clipforge::{
    Clip, ClipType, CoordSpace, ExportConfig, ExportSettings, PipComposition, PipConfig, Point,
    ShapeKind, Size, classify_clips, pip_roles, plan, sort_timeline,
};

fn sample_timeline() -> Vec<Clip> {
    let mut cam = Clip::new("cam", "indexeddb://cam", 30.0)
        .with_type(ClipType::Webcam)
        .on_track(2)
        .with_order(1);
    cam.pip_config = Some(
        PipConfig::new(
            ShapeKind::Hexagon,
            Point::new(1500.0, 760.0),
            Size::new(360.0, 280.0),
            CoordSpace::Source,
        )
        .with_border("#ffffff", 4.0),
    );
    vec![
        Clip::new("screen", "https://cdn.example.com/screen.mp4", 30.0)
            .with_type(ClipType::Screen)
            .with_order(0)
            .trimmed(1.5, Some(28.0)),
        cam,
    ]
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let clips = match std::env::args().nth(1) {
        Some(path) => {
            let file = std::fs::File::open(&path)?;
            serde_json::from_reader::<_, Vec<Clip>>(std::io::BufReader::new(file))?
        }
        None => sample_timeline(),
    };
    let config = ExportConfig::from_env();

    let clips = sort_timeline(&clips);
    let classes = classify_clips(&clips)?;
    let pip = pip_roles(&classes).and_then(|roles| {
        clips[roles.overlay]
            .pip_config
            .as_ref()
            .map(|cfg| PipComposition::new(roles.background, roles.overlay, cfg.clone()))
    });
    let plan = plan(&clips, &ExportSettings::default(), pip.as_ref(), &config.plan)?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
