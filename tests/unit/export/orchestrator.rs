use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;

use super::*;
use crate::{
    execute::cancel::cancel_pair,
    foundation::core::{Point, Size},
    pip::config::PipConfig,
    shapes::geometry::ShapeKind,
    timeline::clip::ClipType,
};

#[derive(Default)]
struct MockEngine {
    load_failures: AtomicUsize,
    loaded: AtomicBool,
    fail_exec_on: Option<usize>,
    loads: Mutex<Vec<String>>,
    execs: Mutex<Vec<Vec<String>>>,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    terminated: AtomicUsize,
}

impl MockEngine {
    fn failing_loads(n: usize) -> Self {
        Self {
            load_failures: AtomicUsize::new(n),
            ..Self::default()
        }
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    async fn load(&self, source: &str) -> ClipforgeResult<()> {
        self.loads.lock().unwrap().push(source.to_string());
        if self.load_failures.load(Ordering::SeqCst) > 0 {
            self.load_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(ClipforgeError::engine("wasm fetch failed"));
        }
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn write_file(&self, path: &str, bytes: &[u8]) -> ClipforgeResult<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read_file(&self, path: &str) -> ClipforgeResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ClipforgeError::engine(format!("{path}: No such file or directory")))
    }

    async fn exec(&self, argv: &[String]) -> ClipforgeResult<()> {
        let n = {
            let mut execs = self.execs.lock().unwrap();
            execs.push(argv.to_vec());
            execs.len()
        };
        if self.fail_exec_on == Some(n) {
            return Err(ClipforgeError::engine("Error initializing filter 'overlay'"));
        }
        if let Some(out) = argv.last() {
            self.files
                .lock()
                .unwrap()
                .insert(out.clone(), b"rendered".to_vec());
        }
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> ClipforgeResult<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    async fn list_dir(&self, _dir: &str) -> ClipforgeResult<Vec<String>> {
        Ok(self.files.lock().unwrap().keys().cloned().collect())
    }

    async fn terminate(&self) -> ClipforgeResult<()> {
        self.loaded.store(false, Ordering::SeqCst);
        self.terminated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockResolver;

#[async_trait]
impl BlobResolver for MockResolver {
    async fn resolve(&self, src: &str) -> ClipforgeResult<Vec<u8>> {
        if src.contains("missing") {
            return Err(ClipforgeError::staging(format!("fetch {src}: HTTP 404 Not Found")));
        }
        Ok(format!("bytes of {src}").into_bytes())
    }
}

fn pip_clips() -> Vec<Clip> {
    let pip = PipConfig::new(
        ShapeKind::Circle,
        Point::new(50.0, 50.0),
        Size::new(200.0, 200.0),
        CoordSpace::Preview {
            width: 960.0,
            height: 540.0,
        },
    );
    let mut webcam = Clip::new("cam", "indexeddb://cam", 6.0)
        .with_type(ClipType::Webcam)
        .on_track(2)
        .with_order(1);
    webcam.pip_config = Some(pip);
    vec![
        webcam,
        Clip::new("screen", "https://cdn/screen.mp4", 10.0)
            .with_type(ClipType::Screen)
            .with_order(0)
            .trimmed(2.0, Some(8.0)),
    ]
}

fn pip_request(hint: &str) -> ExportRequest {
    ExportRequest::new(pip_clips(), hint, ExportSettings::default())
        .with_background_size(PixelSize::new(1920, 1080).unwrap())
}

fn exporter(engine: &Arc<MockEngine>) -> Exporter {
    Exporter::new(engine.clone(), Arc::new(MockResolver))
}

#[test]
fn lifecycle_table() {
    use ExportState::*;
    let path = [Idle, Preparing, Planning, Staging, Executing, Finalizing, Complete];
    for pair in path.windows(2) {
        assert_eq!(pair[0].transition(pair[1]).unwrap(), pair[1]);
    }
    for s in &path[..path.len() - 1] {
        assert_eq!(s.transition(Cancelled).unwrap(), Cancelled);
        assert_eq!(s.transition(Failed).unwrap(), Failed);
    }
    assert!(matches!(
        Staging.transition(Planning),
        Err(ClipforgeError::InvalidTransition { .. })
    ));
    assert!(Idle.transition(Executing).is_err());
    assert!(Complete.transition(Failed).is_err());
    assert!(Cancelled.transition(Idle).is_err());
}

#[test]
fn output_names_are_sanitized() {
    assert_eq!(output_file_name("My Video.mov", "mp4"), "My Video.mp4");
    assert_eq!(output_file_name("../../etc/passwd", "webm"), "passwd.webm");
    assert_eq!(output_file_name("clip:1?.mp4", "mp4"), "clip_1_.mp4");
    assert_eq!(output_file_name("  ", "mov"), "clipforge-export.mov");
    assert_eq!(output_file_name("v1.2 final", "mp4"), "v1.2 final.mp4");
}

#[tokio::test]
async fn pip_export_completes_and_cleans_up() {
    let engine = Arc::new(MockEngine::default());
    let seen = Arc::new(Mutex::new(Vec::<ExportProgress>::new()));
    let sink = {
        let seen = seen.clone();
        move |p: &ExportProgress| seen.lock().unwrap().push(p.clone())
    };
    let request = pip_request("exports/My Video.mov");

    let outcome = exporter(&engine)
        .export(&request, Some(&sink), &CancelToken::never())
        .await
        .unwrap();

    let ExportOutcome::Complete(artifact) = outcome else {
        panic!("expected a completed export");
    };
    assert_eq!(artifact.file_name, "My Video.mp4");
    assert_eq!(artifact.mime_type, "video/mp4");
    assert_eq!(artifact.bytes, b"rendered");

    let execs = engine.execs.lock().unwrap();
    assert_eq!(execs.len(), 4);
    let overlay = execs[2].join(" ");
    assert!(overlay.contains("overlay=100:100"), "{overlay}");
    assert!(overlay.contains("scale=400:400"), "{overlay}");

    assert!(engine.files.lock().unwrap().is_empty());
    assert_eq!(engine.terminated.load(Ordering::SeqCst), 1);

    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[0].percent <= w[1].percent));
    assert_eq!(seen.last().map(|p| (p.state, p.percent)), Some((ExportState::Complete, 100.0)));
    for state in [ExportState::Staging, ExportState::Executing] {
        assert!(seen.iter().any(|p| p.state == state), "no progress in {state:?}");
    }
    assert!(
        seen.iter()
            .filter(|p| p.state == ExportState::Executing)
            .all(|p| (10.0..=90.0).contains(&p.percent))
    );
}

#[tokio::test]
async fn step_failure_fails_after_cleanup() {
    let engine = Arc::new(MockEngine {
        fail_exec_on: Some(3),
        ..MockEngine::default()
    });
    let request = pip_request("out");

    let err = exporter(&engine)
        .export(&request, None, &CancelToken::never())
        .await
        .unwrap_err();

    match &err {
        ClipforgeError::Step {
            index, description, ..
        } => {
            assert_eq!(*index, 3);
            assert_eq!(description, "Apply PiP overlay");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(engine.execs.lock().unwrap().len(), 3);
    assert!(engine.files.lock().unwrap().is_empty());
    assert_eq!(engine.terminated.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn staging_failure_runs_no_steps() {
    let engine = Arc::new(MockEngine::default());
    let clips = vec![Clip::new("s", "https://cdn/missing.mp4", 5.0).with_type(ClipType::Screen)];
    let request = ExportRequest::new(clips, "out", ExportSettings::default());

    let err = exporter(&engine)
        .export(&request, None, &CancelToken::never())
        .await
        .unwrap_err();
    assert!(matches!(err, ClipforgeError::Staging(_)));
    assert!(engine.execs.lock().unwrap().is_empty());
    assert_eq!(engine.terminated.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn input_errors_never_touch_the_engine() {
    let engine = Arc::new(MockEngine::default());
    let request = ExportRequest::new(Vec::new(), "out", ExportSettings::default());
    let err = exporter(&engine)
        .export(&request, None, &CancelToken::never())
        .await
        .unwrap_err();
    assert!(matches!(err, ClipforgeError::Validation(_)));
    assert!(engine.loads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn preview_space_pip_without_background_size_is_rejected() {
    let engine = Arc::new(MockEngine::default());
    for resolution in ["720p", "1080p", "source"] {
        let settings = ExportSettings {
            resolution: resolution.to_string(),
            ..ExportSettings::default()
        };
        let request = ExportRequest::new(pip_clips(), "out", settings);
        let err = exporter(&engine)
            .export(&request, None, &CancelToken::never())
            .await
            .unwrap_err();
        assert!(matches!(err, ClipforgeError::Validation(_)), "{resolution}: {err:?}");
        assert!(err.to_string().contains("background"));
    }
    assert!(engine.loads.lock().unwrap().is_empty());
    assert!(engine.execs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn preview_space_pip_lands_at_the_same_place_for_every_resolution() {
    let engine = Arc::new(MockEngine::default());
    for resolution in ["720p", "1080p", "source"] {
        let settings = ExportSettings {
            resolution: resolution.to_string(),
            ..ExportSettings::default()
        };
        let request = ExportRequest::new(pip_clips(), "out", settings)
            .with_background_size(PixelSize::new(1920, 1080).unwrap());
        exporter(&engine)
            .export(&request, None, &CancelToken::never())
            .await
            .unwrap();
    }
    let execs = engine.execs.lock().unwrap();
    let overlays: Vec<String> = execs
        .iter()
        .filter(|argv| argv.iter().any(|a| a == "-filter_complex"))
        .map(|argv| argv.join(" "))
        .collect();
    assert_eq!(overlays.len(), 3);
    assert!(overlays.iter().all(|o| o.contains("overlay=100:100")));
}

#[tokio::test]
async fn unclassifiable_clips_never_touch_the_engine() {
    let engine = Arc::new(MockEngine::default());
    let clips = vec![
        Clip::new("a", "https://cdn/a.mp4", 5.0).on_track(3),
        Clip::new("b", "https://cdn/b.mp4", 5.0).on_track(3),
    ];
    let err = exporter(&engine)
        .export(
            &ExportRequest::new(clips, "out", ExportSettings::default()),
            None,
            &CancelToken::never(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClipforgeError::Validation(_)));
    assert!(engine.loads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_before_start() {
    let engine = Arc::new(MockEngine::default());
    let (handle, token) = cancel_pair();
    handle.cancel();
    let request = pip_request("out");

    let outcome = exporter(&engine).export(&request, None, &token).await.unwrap();
    assert_eq!(outcome, ExportOutcome::Cancelled);
    assert!(engine.loads.lock().unwrap().is_empty());
    assert!(engine.execs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_mid_execution_stops_scheduling() {
    let engine = Arc::new(MockEngine::default());
    let (handle, token) = cancel_pair();
    let sink = move |p: &ExportProgress| {
        if p.state == ExportState::Executing && p.detail == "Apply PiP overlay" {
            handle.cancel();
        }
    };
    let request = pip_request("out");

    let outcome = exporter(&engine)
        .export(&request, Some(&sink), &token)
        .await
        .unwrap();
    assert_eq!(outcome, ExportOutcome::Cancelled);
    assert_eq!(engine.execs.lock().unwrap().len(), 3);
    assert!(engine.files.lock().unwrap().is_empty());
    assert_eq!(engine.terminated.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn engine_load_retries_round_robin() {
    let engine = Arc::new(MockEngine::failing_loads(2));
    let config = ExportConfig {
        engine_sources: vec!["primary".to_string(), "mirror".to_string()],
        ..ExportConfig::default()
    };
    let clips = vec![Clip::new("s", "https://cdn/s.mp4", 5.0)];
    let request = ExportRequest::new(clips, "out", ExportSettings::default());

    let outcome = exporter(&engine)
        .with_config(config)
        .export(&request, None, &CancelToken::never())
        .await
        .unwrap();
    assert!(matches!(outcome, ExportOutcome::Complete(_)));
    assert_eq!(
        *engine.loads.lock().unwrap(),
        vec!["primary", "mirror", "primary"]
    );
}

#[tokio::test(start_paused = true)]
async fn engine_load_gives_up_after_max_attempts() {
    let engine = Arc::new(MockEngine::failing_loads(10));
    let clips = vec![Clip::new("s", "https://cdn/s.mp4", 5.0)];
    let request = ExportRequest::new(clips, "out", ExportSettings::default());

    let err = exporter(&engine)
        .export(&request, None, &CancelToken::never())
        .await
        .unwrap_err();
    assert!(matches!(err, ClipforgeError::Engine(_)));
    assert!(err.to_string().contains("after 3 attempts"));
    assert_eq!(engine.loads.lock().unwrap().len(), 3);
    assert!(engine.files.lock().unwrap().is_empty());
}

#[tokio::test]
async fn webcam_without_pip_config_is_concatenated() {
    let engine = Arc::new(MockEngine::default());
    let mut clips = pip_clips();
    clips[0].pip_config = None;
    let request = ExportRequest::new(clips, "out", ExportSettings::default());

    let outcome = exporter(&engine)
        .export(&request, None, &CancelToken::never())
        .await
        .unwrap();
    assert!(matches!(outcome, ExportOutcome::Complete(_)));
    let execs = engine.execs.lock().unwrap();
    assert_eq!(execs.len(), 3);
    assert!(execs[1].iter().any(|a| a == "concat"));
}
