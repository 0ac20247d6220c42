use std::collections::BTreeMap;

use crate::{
    foundation::error::{ClipforgeError, ClipforgeResult},
    timeline::clip::{Clip, ClipType},
};

/// Which rule decided a clip's type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceTier {
    /// `metadata.type` was set.
    Explicit,
    /// Track 1 is screen, track 2 is webcam.
    Track,
    /// The clip name contains a telling keyword.
    Name,
    /// Nothing matched; the clip was assigned by elimination.
    Fallback,
}

/// The inferred type of one clip.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Classification {
    /// Clip id.
    pub clip_id: String,
    /// Inferred type.
    pub clip_type: ClipType,
    /// Rule that produced it.
    pub tier: InferenceTier,
}

const WEBCAM_KEYWORDS: [&str; 2] = ["webcam", "camera"];
const SCREEN_KEYWORDS: [&str; 2] = ["screen", "recording"];

fn by_track(track: u32) -> Option<ClipType> {
    match track {
        1 => Some(ClipType::Screen),
        2 => Some(ClipType::Webcam),
        _ => None,
    }
}

fn by_name(name: &str) -> Option<ClipType> {
    let name = name.to_lowercase();
    if WEBCAM_KEYWORDS.iter().any(|k| name.contains(k)) {
        Some(ClipType::Webcam)
    } else if SCREEN_KEYWORDS.iter().any(|k| name.contains(k)) {
        Some(ClipType::Screen)
    } else {
        None
    }
}

/// Infer a type for every clip: explicit metadata, then track, then name keyword.
///
/// Clips none of those resolve are assigned by elimination: the lowest-track one becomes the
/// screen clip if no screen clip exists yet, the rest become webcam clips. Two unresolved clips
/// on the same track cannot be told apart and are rejected. Every non-explicit decision is
/// logged at `warn`.
pub fn classify_clips(clips: &[Clip]) -> ClipforgeResult<Vec<Classification>> {
    let mut out: Vec<Option<Classification>> = Vec::with_capacity(clips.len());
    let mut unresolved: BTreeMap<u32, Vec<usize>> = BTreeMap::new();

    for (idx, clip) in clips.iter().enumerate() {
        let decided = if let Some(t) = clip.explicit_type() {
            Some((t, InferenceTier::Explicit))
        } else if let Some(t) = by_track(clip.track) {
            Some((t, InferenceTier::Track))
        } else {
            by_name(&clip.name).map(|t| (t, InferenceTier::Name))
        };

        match decided {
            Some((clip_type, tier)) => {
                if tier != InferenceTier::Explicit {
                    tracing::warn!(
                        clip = %clip.id,
                        track = clip.track,
                        name = %clip.name,
                        inferred = clip_type.as_str(),
                        ?tier,
                        "clip has no explicit type, inferred"
                    );
                }
                out.push(Some(Classification {
                    clip_id: clip.id.clone(),
                    clip_type,
                    tier,
                }));
            }
            None => {
                unresolved.entry(clip.track).or_default().push(idx);
                out.push(None);
            }
        }
    }

    if let Some((track, idxs)) = unresolved.iter().find(|(_, v)| v.len() > 1) {
        let ids: Vec<&str> = idxs.iter().map(|&i| clips[i].id.as_str()).collect();
        return Err(ClipforgeError::validation(format!(
            "cannot tell clips {ids:?} on track {track} apart; tag them with metadata.type"
        )));
    }

    let mut have_screen = out
        .iter()
        .flatten()
        .any(|c| c.clip_type == ClipType::Screen);
    for idxs in unresolved.values() {
        for &idx in idxs {
            let clip_type = if have_screen {
                ClipType::Webcam
            } else {
                have_screen = true;
                ClipType::Screen
            };
            tracing::warn!(
                clip = %clips[idx].id,
                track = clips[idx].track,
                assigned = clip_type.as_str(),
                "clip type could not be inferred, assigned by elimination"
            );
            out[idx] = Some(Classification {
                clip_id: clips[idx].id.clone(),
                clip_type,
                tier: InferenceTier::Fallback,
            });
        }
    }

    let result: Vec<Classification> = out.into_iter().flatten().collect();
    if !result.iter().any(|c| c.clip_type == ClipType::Screen) {
        return Err(ClipforgeError::validation(
            "no screen recording found; at least one screen clip is required for export",
        ));
    }
    Ok(result)
}

/// Background (first screen clip) and overlay (first webcam clip), as indices into `clips`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipRoles {
    /// Index of the background clip.
    pub background: usize,
    /// Index of the overlay clip.
    pub overlay: usize,
}

/// Pick PiP roles from classifications produced for the same `clips` slice.
pub fn pip_roles(classes: &[Classification]) -> Option<PipRoles> {
    let background = classes
        .iter()
        .position(|c| c.clip_type == ClipType::Screen)?;
    let overlay = classes
        .iter()
        .position(|c| c.clip_type == ClipType::Webcam)?;
    Some(PipRoles {
        background,
        overlay,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/classify.rs"]
mod tests;
