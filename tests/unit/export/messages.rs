use super::*;

fn step(message: &str) -> ClipforgeError {
    ClipforgeError::Step {
        index: 3,
        total: 4,
        description: "Overlay PiP".to_string(),
        message: message.to_string(),
    }
}

#[test]
fn recognised_engine_errors_are_translated() {
    let msg = user_message(&step("Cannot Save (Domain: AVFoundationErrorDomain, Code: -11823)"));
    assert!(msg.contains("already in use"));

    let msg = user_message(&ClipforgeError::engine(
        "Output directory /Volumes/x does not exist",
    ));
    assert!(msg.starts_with("Cannot save to the selected location"));

    let msg = user_message(&step("output.mp4: No such file or directory"));
    assert!(msg.contains("source clip could not be found"));

    let msg = user_message(&ClipforgeError::staging("/Users/a/Downloads is not writable"));
    assert!(msg.contains("folder permissions"));
}

#[test]
fn avfoundation_description_is_extracted() {
    let msg = user_message(&step(
        "The operation could not be completed (Domain: AVFoundationErrorDomain, Code: -11800)",
    ));
    assert_eq!(msg, "The operation could not be completed");
}

#[test]
fn unrecognised_errors_pass_through() {
    let err = step("Invalid argument");
    assert_eq!(user_message(&err), err.to_string());
    assert!(user_message(&err).contains("Invalid argument"));

    let err = ClipforgeError::validation("no clips to export");
    assert_eq!(user_message(&err), "validation error: no clips to export");
}
