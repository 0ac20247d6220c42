use crate::foundation::error::ClipforgeError;

/// Text to show a user for a failed export.
///
/// Engine errors with a recognised cause get an actionable sentence. Anything else is the
/// error's display text, unchanged.
pub fn user_message(err: &ClipforgeError) -> String {
    let raw = match err {
        ClipforgeError::Step { message, .. } => message.as_str(),
        ClipforgeError::Engine(m) | ClipforgeError::Staging(m) => m.as_str(),
        _ => return err.to_string(),
    };
    translate(raw).unwrap_or_else(|| err.to_string())
}

fn translate(raw: &str) -> Option<String> {
    if raw.contains("-11823") || raw.contains("already in use") {
        return Some(
            "The file name is already in use. Choose a different name and export again."
                .to_string(),
        );
    }
    if raw.contains("AVFoundationErrorDomain")
        && let Some((description, _)) = raw.split_once("(Domain:")
        && !description.trim().is_empty()
    {
        return Some(description.trim().to_string());
    }
    if raw.contains("Output directory") {
        return Some(
            "Cannot save to the selected location. Check folder permissions or choose a different location."
                .to_string(),
        );
    }
    if raw.contains("not writable") || raw.contains("Permission denied") {
        return Some(
            "Cannot write the exported file. Check folder permissions or choose a different location."
                .to_string(),
        );
    }
    if raw.contains("No such file or directory") {
        return Some(
            "A source clip could not be found. Re-import the missing clip and export again."
                .to_string(),
        );
    }
    None
}

#[cfg(test)]
#[path = "../../tests/unit/export/messages.rs"]
mod tests;
