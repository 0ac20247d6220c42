use super::*;

#[test]
fn happy_path() {
    let s = UploadState::Pending;
    let s = s.transition(UploadEvent::Start).unwrap();
    let s = s.transition(UploadEvent::Progress(0.4)).unwrap();
    assert_eq!(s, UploadState::Uploading { progress: 0.4 });
    let s = s.transition(UploadEvent::Progress(0.2)).unwrap();
    assert_eq!(s, UploadState::Uploading { progress: 0.4 });
    let s = s
        .transition(UploadEvent::Succeed {
            remote_src: "https://cdn/x.webm".to_string(),
        })
        .unwrap();
    assert!(s.is_complete());
}

#[test]
fn failure_and_retry() {
    let s = UploadState::Pending
        .transition(UploadEvent::Start)
        .unwrap()
        .transition(UploadEvent::Fail("503".to_string()))
        .unwrap();
    assert_eq!(
        s,
        UploadState::Failed {
            reason: "503".to_string()
        }
    );
    assert_eq!(s.transition(UploadEvent::Retry).unwrap(), UploadState::Pending);
}

#[test]
fn invalid_transitions_are_rejected() {
    let err = UploadState::Pending
        .transition(UploadEvent::Retry)
        .unwrap_err();
    assert!(matches!(err, ClipforgeError::InvalidTransition { .. }));
    assert!(err.to_string().contains("Pending"));
    assert!(
        UploadState::Pending
            .transition(UploadEvent::Succeed {
                remote_src: "x".to_string()
            })
            .is_err()
    );
    let done = UploadState::Complete {
        remote_src: "x".to_string(),
    };
    assert!(done.transition(UploadEvent::Start).is_err());
    assert!(done.transition(UploadEvent::Fail("late".to_string())).is_err());
}

#[test]
fn tracker_reports_outstanding() {
    let mut t = UploadTracker::default();
    t.track("a");
    t.track("b");
    t.apply("a", UploadEvent::Start).unwrap();
    t.apply(
        "a",
        UploadEvent::Succeed {
            remote_src: "https://cdn/a".to_string(),
        },
    )
    .unwrap();
    assert_eq!(t.outstanding().collect::<Vec<_>>(), vec!["b"]);
    assert!(t.apply("zz", UploadEvent::Start).is_err());
    t.forget("b");
    assert_eq!(t.outstanding().count(), 0);
}
