//! Clip edit operations. Each returns new clips; inputs are never mutated.

use std::cmp::Ordering;

use serde_json::Value;

use crate::{
    foundation::error::{ClipforgeError, ClipforgeResult},
    timeline::clip::Clip,
};

/// Move the in/out points. `None` keeps the current value; the out-point becomes explicit.
pub fn trim_clip(clip: &Clip, start: Option<f64>, end: Option<f64>) -> ClipforgeResult<Clip> {
    let start = start.unwrap_or(clip.start_time);
    let end = end.unwrap_or_else(|| clip.effective_end());
    if let Some(natural) = clip.source_duration
        && end > natural
    {
        return Err(ClipforgeError::validation(format!(
            "clip {}: trim end {end} is past the source length {natural}",
            clip.id
        )));
    }
    let mut out = clip.clone();
    out.start_time = start;
    out.end_time = Some(end);
    out.duration = end - start;
    out.validate()?;
    Ok(out)
}

/// Cut a clip in two at `at` (seconds, source time).
///
/// The halves get ids `<id>-a` and `<id>-b`; the caller replaces the original with both.
pub fn split_clip(clip: &Clip, at: f64) -> ClipforgeResult<[Clip; 2]> {
    let end = clip.effective_end();
    if !(at > clip.start_time && at < end) {
        return Err(ClipforgeError::validation(format!(
            "clip {}: split point {at} is outside ({}, {end})",
            clip.id, clip.start_time
        )));
    }

    let mut first = clip.clone();
    first.id = format!("{}-a", clip.id);
    first.end_time = Some(at);
    first.duration = at - clip.start_time;

    let mut second = clip.clone();
    second.id = format!("{}-b", clip.id);
    second.start_time = at;
    second.end_time = Some(end);
    second.duration = end - at;

    Ok([first, second])
}

/// Copy a clip under `new_id`, marking it as a duplicate.
pub fn duplicate_clip(clip: &Clip, new_id: impl Into<String>) -> Clip {
    let mut out = clip.clone();
    out.id = new_id.into();
    out.metadata
        .insert("duplicated".to_string(), Value::Bool(true));
    out
}

/// Remove the clip with `id`.
pub fn delete_clip(clips: &[Clip], id: &str) -> Vec<Clip> {
    clips.iter().filter(|c| c.id != id).cloned().collect()
}

/// Replace the clip with `id` by `replacement` clips, in place.
pub fn replace_clip(clips: &[Clip], id: &str, replacement: &[Clip]) -> ClipforgeResult<Vec<Clip>> {
    let idx = clips
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| ClipforgeError::validation(format!("unknown clip {id}")))?;
    let mut out = Vec::with_capacity(clips.len() + replacement.len());
    out.extend_from_slice(&clips[..idx]);
    out.extend_from_slice(replacement);
    out.extend_from_slice(&clips[idx + 1..]);
    Ok(out)
}

/// Move the clip at `from` to `to` and renumber `metadata.order` to match.
pub fn reorder_clips(clips: &[Clip], from: usize, to: usize) -> ClipforgeResult<Vec<Clip>> {
    if from >= clips.len() || to >= clips.len() {
        return Err(ClipforgeError::validation(format!(
            "reorder {from} -> {to} is out of range for {} clips",
            clips.len()
        )));
    }
    let mut out = clips.to_vec();
    let moved = out.remove(from);
    out.insert(to, moved);
    Ok(renumber(out))
}

/// Write each clip's position into `metadata.order`.
pub fn renumber(mut clips: Vec<Clip>) -> Vec<Clip> {
    for (i, c) in clips.iter_mut().enumerate() {
        c.metadata.insert("order".to_string(), Value::from(i as i64));
    }
    clips
}

/// Gap, in seconds, below which two cuts count as touching.
pub const MERGE_TOLERANCE: f64 = 0.1;

/// Move the clip with `id` to `track`. It goes to the end of the timeline and every clip is
/// renumbered.
pub fn move_to_track(clips: &[Clip], id: &str, track: u32) -> ClipforgeResult<Vec<Clip>> {
    if track == 0 {
        return Err(ClipforgeError::validation("tracks are numbered from 1"));
    }
    let idx = clips
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| ClipforgeError::validation(format!("unknown clip {id}")))?;
    let mut out = clips.to_vec();
    let mut moved = out.remove(idx);
    moved.track = track;
    out.push(moved);
    Ok(renumber(out))
}

/// Join two cuts of the same source on the same track, where `second` starts where `first`
/// ends. The result keeps `first`'s id and metadata.
pub fn merge_clips(first: &Clip, second: &Clip) -> ClipforgeResult<Clip> {
    if first.track != second.track {
        return Err(ClipforgeError::validation(format!(
            "clips {} and {} are on different tracks",
            first.id, second.id
        )));
    }
    if first.src != second.src {
        return Err(ClipforgeError::validation(format!(
            "clips {} and {} come from different sources",
            first.id, second.id
        )));
    }
    let gap = (first.effective_end() - second.start_time).abs();
    if gap > MERGE_TOLERANCE {
        return Err(ClipforgeError::validation(format!(
            "clips {} and {} are not adjacent ({gap}s apart)",
            first.id, second.id
        )));
    }
    let end = second.effective_end();
    let mut out = first.clone();
    out.end_time = Some(end);
    out.duration = end - first.start_time;
    out.validate()?;
    Ok(out)
}

/// Round `time` to the nearest multiple of `grid`. A non-positive grid leaves it unchanged.
pub fn snap_to_grid(time: f64, grid: f64) -> f64 {
    if !(grid.is_finite() && grid > 0.0) {
        return time;
    }
    (time / grid).round() * grid
}

fn timeline_cmp(a: &Clip, b: &Clip) -> Ordering {
    match (a.order(), b.order()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.start_time.total_cmp(&b.start_time))
}

/// Timeline order: `metadata.order`, then `start_time`. Stable.
pub fn sort_timeline(clips: &[Clip]) -> Vec<Clip> {
    let mut out = clips.to_vec();
    out.sort_by(timeline_cmp);
    out
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/edit.rs"]
mod tests;
