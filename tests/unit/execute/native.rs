use super::*;

#[test]
fn names_resolve_inside_root() {
    let root = Path::new("/vfs");
    assert_eq!(resolve_in(root, "clip_0.mp4").unwrap(), PathBuf::from("/vfs/clip_0.mp4"));
    assert_eq!(resolve_in(root, "/output.mp4").unwrap(), PathBuf::from("/vfs/output.mp4"));
    assert_eq!(resolve_in(root, ".").unwrap(), PathBuf::from("/vfs/."));
    assert!(resolve_in(root, "../etc/passwd").is_err());
    assert!(resolve_in(root, "a/../../b").is_err());
}

#[test]
fn stderr_tail_keeps_last_lines() {
    let text: String = (0..20).map(|i| format!("line {i}\n\n")).collect();
    let tail = stderr_tail(text.as_bytes());
    assert!(tail.starts_with("line 12"));
    assert!(tail.ends_with("line 19"));
}

#[tokio::test]
async fn unloaded_engine_rejects_io() {
    let engine = NativeFfmpegEngine::new();
    assert!(!engine.is_loaded());
    assert!(engine.write_file("a", b"x").await.is_err());
    assert!(engine.exec(&[]).await.is_err());
}

#[tokio::test]
async fn filesystem_round_trip_and_terminate() {
    let engine = NativeFfmpegEngine::new().without_probe();
    engine.load("ffmpeg").await.unwrap();
    let root = engine.root().unwrap();

    engine.write_file("clip_0.mp4", b"abc").await.unwrap();
    engine.write_file("concat_list.txt", b"file 'clip_0.mp4'\n").await.unwrap();
    assert_eq!(engine.read_file("clip_0.mp4").await.unwrap(), b"abc");
    assert_eq!(
        engine.list_dir(".").await.unwrap(),
        vec!["clip_0.mp4", "concat_list.txt"]
    );

    engine.delete_file("clip_0.mp4").await.unwrap();
    engine.delete_file("clip_0.mp4").await.unwrap();
    assert_eq!(engine.list_dir("/").await.unwrap(), vec!["concat_list.txt"]);

    engine.terminate().await.unwrap();
    assert!(!engine.is_loaded());
    assert!(!root.exists());
}

#[tokio::test]
async fn exec_runs_ffmpeg_in_engine_directory() {
    if !ffmpeg_available("ffmpeg").await {
        return;
    }
    let engine = NativeFfmpegEngine::new();
    engine.load("").await.unwrap();
    let argv: Vec<String> = [
        "-f", "lavfi", "-i", "color=c=red:s=32x32:d=0.2", "-frames:v", "1", "frame.png",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    engine.exec(&argv).await.unwrap();
    let png = engine.read_file("frame.png").await.unwrap();
    assert_eq!(&png[..4], b"\x89PNG");

    let bad = vec!["-i".to_string(), "missing.mp4".to_string(), "out.mp4".to_string()];
    let err = engine.exec(&bad).await.unwrap_err();
    assert!(err.to_string().contains("missing.mp4"));
    engine.terminate().await.unwrap();
}
