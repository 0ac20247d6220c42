use super::*;

fn clip(id: &str, track: u32) -> Clip {
    Clip::new(id, format!("{id}.mp4"), 5.0).on_track(track)
}

#[test]
fn explicit_metadata_wins_over_track() {
    let clips = vec![clip("a", 2).with_type(ClipType::Screen)];
    let c = classify_clips(&clips).unwrap();
    assert_eq!(c[0].clip_type, ClipType::Screen);
    assert_eq!(c[0].tier, InferenceTier::Explicit);
}

#[test]
fn track_convention_then_name() {
    let clips = vec![
        clip("a", 1),
        clip("b", 2),
        clip("c", 5).named("My Camera take"),
        clip("d", 6).named("Screen Recording 3"),
    ];
    let c = classify_clips(&clips).unwrap();
    assert_eq!(
        c.iter().map(|c| (c.clip_type, c.tier)).collect::<Vec<_>>(),
        vec![
            (ClipType::Screen, InferenceTier::Track),
            (ClipType::Webcam, InferenceTier::Track),
            (ClipType::Webcam, InferenceTier::Name),
            (ClipType::Screen, InferenceTier::Name),
        ]
    );
}

#[test]
fn lone_unresolved_clip_becomes_screen() {
    let c = classify_clips(&[clip("x", 7)]).unwrap();
    assert_eq!(c[0].clip_type, ClipType::Screen);
    assert_eq!(c[0].tier, InferenceTier::Fallback);
}

#[test]
fn unresolved_clips_on_distinct_tracks_are_assigned_by_track_order() {
    let c = classify_clips(&[clip("hi", 9), clip("lo", 4)]).unwrap();
    assert_eq!(c[0].clip_id, "hi");
    assert_eq!(c[0].clip_type, ClipType::Webcam);
    assert_eq!(c[1].clip_type, ClipType::Screen);
}

#[test]
fn unresolved_clips_sharing_a_track_are_rejected() {
    let err = classify_clips(&[clip("a", 3), clip("b", 3)]).unwrap_err();
    assert!(matches!(err, ClipforgeError::Validation(_)));
    assert!(err.to_string().contains("track 3"));
}

#[test]
fn no_screen_clip_is_rejected() {
    let err = classify_clips(&[clip("a", 2)]).unwrap_err();
    assert!(err.to_string().contains("no screen recording"));
}

#[test]
fn roles_pick_first_of_each_type() {
    let clips = vec![clip("w", 2), clip("s1", 1), clip("s2", 1)];
    let c = classify_clips(&clips).unwrap();
    assert_eq!(
        pip_roles(&c),
        Some(PipRoles {
            background: 1,
            overlay: 0
        })
    );
    let c = classify_clips(&[clip("s", 1)]).unwrap();
    assert_eq!(pip_roles(&c), None);
}
