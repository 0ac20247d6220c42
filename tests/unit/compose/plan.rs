use super::*;
use crate::{
    foundation::core::{Point, Size},
    shapes::geometry::ShapeKind,
    timeline::clip::ClipType,
};

fn settings(resolution: &str) -> ExportSettings {
    ExportSettings {
        resolution: resolution.to_string(),
        ..ExportSettings::default()
    }
}

fn circle_at(x: f64, y: f64, w: f64, h: f64) -> PipConfig {
    PipConfig::new(
        ShapeKind::Circle,
        Point::new(x, y),
        Size::new(w, h),
        CoordSpace::Source,
    )
}

#[test]
fn single_untrimmed_clip_is_one_encode() {
    let clips = vec![Clip::new("s", "rec.mp4", 10.0)];
    let p = plan(&clips, &settings("720p"), None, &PlanOptions::default()).unwrap();
    assert_eq!(p.step_kinds(), vec![StepKind::Encode]);
    let cmd = &p.steps[0].command;
    let s = cmd.iter().position(|a| a == "-s").unwrap();
    assert_eq!(cmd[s + 1], "1280x720");
    assert_eq!(p.steps[0].input_files, vec!["clip_0.mp4"]);
    assert_eq!(p.output_file, "output.mp4");
    assert_eq!(p.estimated_secs, 20);
}

#[test]
fn trimmed_screen_with_circle_overlay() {
    let clips = vec![
        Clip::new("s", "screen.mp4", 10.0)
            .with_type(ClipType::Screen)
            .trimmed(2.0, Some(8.0)),
        Clip::new("w", "https://cdn/cam.webm?token=1", 6.0).with_type(ClipType::Webcam),
    ];
    let pip = PipComposition::new(0, 1, circle_at(50.0, 50.0, 200.0, 200.0));
    let p = plan(&clips, &ExportSettings::default(), Some(&pip), &PlanOptions::default()).unwrap();

    assert_eq!(
        p.step_kinds(),
        vec![StepKind::Trim, StepKind::Mask, StepKind::Overlay, StepKind::Encode]
    );
    assert_eq!(
        p.steps[0].command,
        trim_args("clip_0.mp4", 2.0, Some(8.0), "processed_clip_0.mp4")
    );
    let overlay = &p.steps[2];
    assert_eq!(
        overlay.input_files,
        vec!["processed_clip_0.mp4", "clip_1.webm", "pip_mask.png"]
    );
    assert!(overlay.command.iter().any(|a| a.contains("overlay=50:50")));
    assert_eq!(p.steps[3].input_files, vec!["pip_composed.mp4"]);
    assert_eq!(p.generated_inputs[0].name, "pip_shape.svg");
    assert!(String::from_utf8_lossy(&p.generated_inputs[0].contents).contains("viewBox=\"0 0 200 200\""));
    assert_eq!(p.estimated_secs, 22);
    assert!(p.validate().is_ok());
}

#[test]
fn three_clips_concat_in_list_order() {
    let clips = vec![
        Clip::new("a", "a.mp4", 5.0),
        Clip::new("b", "b.mp4", 5.0),
        Clip::new("c", "c.mp4", 5.0),
    ];
    let p = plan(&clips, &ExportSettings::default(), None, &PlanOptions::default()).unwrap();
    assert_eq!(p.step_kinds(), vec![StepKind::Concat, StepKind::Encode]);

    let concat = &p.steps[0];
    assert_eq!(
        concat.input_files[..3],
        ["clip_0.mp4", "clip_1.mp4", "clip_2.mp4"]
    );
    assert_eq!(concat.output_file, "concatenated.mp4");
    assert_eq!(
        String::from_utf8(p.generated_inputs[0].contents.clone()).unwrap(),
        "file 'clip_0.mp4'\nfile 'clip_1.mp4'\nfile 'clip_2.mp4'\n"
    );
    assert_eq!(p.estimated_secs, 48);
}

#[test]
fn reencode_concat_passes_inputs_in_argv() {
    let clips = vec![
        Clip::new("a", "a.mov", 5.0),
        Clip::new("b", "b.mp4", 5.0).trimmed(1.0, None),
    ];
    let opts = PlanOptions {
        concat: ConcatMode::Reencode,
        ..PlanOptions::default()
    };
    let p = plan(&clips, &ExportSettings::default(), None, &opts).unwrap();
    assert_eq!(p.step_kinds(), vec![StepKind::Trim, StepKind::Concat, StepKind::Encode]);
    let cmd = &p.steps[1].command;
    assert_eq!(cmd[..4], ["-i", "clip_0.mov", "-i", "processed_clip_1.mp4"]);
    assert_eq!(p.steps[1].output_file, "concatenated.mov");
    assert!(p.generated_inputs.is_empty());
}

#[test]
fn planning_is_deterministic_and_ends_with_encode() {
    let clips = vec![
        Clip::new("s", "screen.mp4", 12.0).trimmed(0.5, Some(11.0)),
        Clip::new("w", "cam.mp4", 12.0),
    ];
    let pip = PipComposition::new(
        0,
        1,
        circle_at(1500.0, 800.0, 320.0, 240.0).with_border("#ff8800", 4.0),
    );
    let a = plan(&clips, &settings("480p"), Some(&pip), &PlanOptions::default()).unwrap();
    let b = plan(&clips, &settings("480p"), Some(&pip), &PlanOptions::default()).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );

    for n in 1..=4 {
        let clips: Vec<Clip> = (0..n)
            .map(|i| Clip::new(format!("c{i}"), format!("c{i}.webm"), 3.0))
            .collect();
        let p = plan(&clips, &settings("360p"), None, &PlanOptions::default()).unwrap();
        let last = p.steps.last().unwrap();
        assert_eq!(last.kind, StepKind::Encode);
        assert_eq!(last.output_file, p.output_file);
    }
}

#[test]
fn border_adds_ring_to_graph() {
    let clips = vec![Clip::new("s", "s.mp4", 5.0), Clip::new("w", "w.mp4", 5.0)];
    let pip = PipComposition::new(0, 1, circle_at(10.0, 10.0, 100.0, 100.0).with_border("#00ff00", 2.4));
    let p = plan(&clips, &ExportSettings::default(), Some(&pip), &PlanOptions::default()).unwrap();
    let graph = p.steps[1]
        .command
        .iter()
        .skip_while(|a| *a != "-filter_complex")
        .nth(1)
        .unwrap();
    assert!(graph.contains("erosion,erosion[ring_inner]"));
    assert!(graph.contains("color=c=0x00ff00"));
}

#[test]
fn ring_width_is_capped_at_half_the_overlay() {
    let clips = vec![Clip::new("s", "s.mp4", 5.0), Clip::new("w", "w.mp4", 5.0)];
    let pip = PipComposition::new(0, 1, circle_at(0.0, 0.0, 40.0, 30.0).with_border("#ffffff", 500.0));
    let p = plan(&clips, &ExportSettings::default(), Some(&pip), &PlanOptions::default()).unwrap();
    let graph = p.steps[1]
        .command
        .iter()
        .skip_while(|a| *a != "-filter_complex")
        .nth(1)
        .unwrap();
    assert_eq!(graph.matches("erosion").count(), 15);
}

#[test]
fn png_mask_input_is_rasterized() {
    let clips = vec![Clip::new("s", "s.mp4", 5.0), Clip::new("w", "w.mp4", 5.0)];
    let pip = PipComposition::new(0, 1, circle_at(0.0, 0.0, 64.0, 64.0));
    let opts = PlanOptions {
        mask_input: MaskInput::Png,
        ..PlanOptions::default()
    };
    let p = plan(&clips, &ExportSettings::default(), Some(&pip), &opts).unwrap();
    let mask = &p.generated_inputs[0];
    assert_eq!(mask.name, "pip_shape.png");
    assert_eq!(&mask.contents[..8], b"\x89PNG\r\n\x1a\n");
    assert_eq!(p.steps[0].input_files, vec!["pip_shape.png"]);
}

#[test]
fn invalid_pip_roles_fall_back_to_concat() {
    let clips = vec![Clip::new("s", "s.mp4", 5.0), Clip::new("w", "w.mp4", 5.0)];
    let pip = PipComposition::new(0, 0, circle_at(0.0, 0.0, 10.0, 10.0));
    let p = plan(&clips, &ExportSettings::default(), Some(&pip), &PlanOptions::default()).unwrap();
    assert_eq!(p.step_kinds(), vec![StepKind::Concat, StepKind::Encode]);

    let pip = PipComposition::new(0, 7, circle_at(0.0, 0.0, 10.0, 10.0));
    let p = plan(&clips, &ExportSettings::default(), Some(&pip), &PlanOptions::default()).unwrap();
    assert_eq!(p.step_kinds(), vec![StepKind::Concat, StepKind::Encode]);
}

#[test]
fn input_errors_reject_before_planning() {
    assert!(plan(&[], &ExportSettings::default(), None, &PlanOptions::default()).is_err());

    let bad = vec![Clip::new("s", "s.mp4", 5.0).trimmed(6.0, Some(2.0))];
    assert!(plan(&bad, &ExportSettings::default(), None, &PlanOptions::default()).is_err());

    let clips = vec![Clip::new("s", "s.mp4", 5.0), Clip::new("w", "w.mp4", 5.0)];
    let preview = PipConfig::new(
        ShapeKind::Star,
        Point::new(0.0, 0.0),
        Size::new(100.0, 100.0),
        CoordSpace::Preview {
            width: 800.0,
            height: 450.0,
        },
    );
    let err = plan(
        &clips,
        &ExportSettings::default(),
        Some(&PipComposition::new(0, 1, preview)),
        &PlanOptions::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("source pixel space"));
}

#[test]
fn edge_validation_catches_dangling_inputs() {
    let clips = vec![Clip::new("s", "s.mp4", 5.0)];
    let mut p = plan(&clips, &ExportSettings::default(), None, &PlanOptions::default()).unwrap();
    p.steps[0].input_files = vec!["ghost.mp4".to_string()];
    assert!(p.validate_edges().is_err());

    let mut p = plan(&clips, &ExportSettings::default(), None, &PlanOptions::default()).unwrap();
    p.output_file = "other.mp4".to_string();
    assert!(p.validate_edges().is_err());

    let mut p = plan(&clips, &ExportSettings::default(), None, &PlanOptions::default()).unwrap();
    p.steps[0].description.clear();
    assert!(p.validate().unwrap_err().to_string().contains("no description"));
}

#[test]
fn extensions_come_from_the_last_path_segment() {
    assert_eq!(source_extension("https://x.io/v/clip.WEBM?sig=a.b"), "webm");
    assert_eq!(source_extension("blob:http://localhost:3000/7c1e-44"), "mp4");
    assert_eq!(source_extension("indexeddb://rec-12"), "mp4");
    assert_eq!(source_extension("/tmp/dir.d/take"), "mp4");
    assert_eq!(source_extension(".hidden"), "mp4");
}
