use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ClipforgeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ClipforgeError::staging("x")
            .to_string()
            .contains("staging error:")
    );
    assert!(
        ClipforgeError::engine("x")
            .to_string()
            .contains("engine error:")
    );
    assert!(
        ClipforgeError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn step_error_names_index_and_description() {
    let err = ClipforgeError::Step {
        index: 2,
        total: 4,
        description: "Apply PiP overlay".to_string(),
        message: "Invalid filter graph".to_string(),
    };
    let s = err.to_string();
    assert!(s.contains("step 2/4"));
    assert!(s.contains("Apply PiP overlay"));
    assert!(s.ends_with("Invalid filter graph"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ClipforgeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert!(!err.is_cancelled());
    assert!(ClipforgeError::Cancelled.is_cancelled());
}
