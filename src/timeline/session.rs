//! Editor session: the clip list, the PiP overlay and upload tracking for one project.
//!
//! Edits are applied locally through the pure functions in [`crate::timeline::edit`] and then
//! persisted through a [`ClipStore`]. The session is the only owner of this state; exports take
//! a snapshot via [`EditorSession::export_inputs`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{
    foundation::core::Size,
    foundation::error::{ClipforgeError, ClipforgeResult},
    pip::{config::PipConfig, state::PipState},
    timeline::{
        clip::Clip,
        edit::{
            delete_clip, duplicate_clip, merge_clips, move_to_track, renumber, reorder_clips,
            replace_clip, sort_timeline, split_clip, trim_clip,
        },
        upload::{UploadEvent, UploadState, UploadTracker},
    },
};

/// Partial clip update. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipPatch {
    /// New source locator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// New trim-in point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    /// New trim-out point; `Some(None)` clears it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Option<f64>>,
    /// New trimmed length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// New track.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<u32>,
    /// Replacement metadata map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// New overlay config; `Some(None)` removes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pip_config: Option<Option<PipConfig>>,
}

impl ClipPatch {
    /// Patch carrying the trim fields of `clip`.
    pub fn trim_of(clip: &Clip) -> Self {
        Self {
            start_time: Some(clip.start_time),
            end_time: Some(clip.end_time),
            duration: Some(clip.duration),
            ..Self::default()
        }
    }

    /// Apply to `clip` in place.
    pub fn apply(&self, clip: &mut Clip) {
        if let Some(src) = &self.src {
            clip.src = src.clone();
        }
        if let Some(v) = self.start_time {
            clip.start_time = v;
        }
        if let Some(v) = self.end_time {
            clip.end_time = v;
        }
        if let Some(v) = self.duration {
            clip.duration = v;
        }
        if let Some(v) = self.track {
            clip.track = v;
        }
        if let Some(m) = &self.metadata {
            clip.metadata = m.clone();
        }
        if let Some(p) = &self.pip_config {
            clip.pip_config = p.clone();
        }
    }
}

/// Clip persistence collaborator.
#[async_trait]
pub trait ClipStore: Send + Sync {
    /// All clips of `project_id`, in any order.
    async fn fetch_clips(&self, project_id: &str) -> ClipforgeResult<Vec<Clip>>;

    /// Apply `patch` to clip `id` and return the stored result.
    async fn update_clip(&self, id: &str, patch: ClipPatch) -> ClipforgeResult<Clip>;

    /// Persist a new clip.
    async fn insert_clip(&self, clip: Clip) -> ClipforgeResult<Clip>;

    /// Remove clip `id`.
    async fn delete_clip(&self, id: &str) -> ClipforgeResult<()>;
}

/// Editing state for one project.
pub struct EditorSession {
    project_id: String,
    store: Arc<dyn ClipStore>,
    clips: Vec<Clip>,
    pip: PipState,
    uploads: UploadTracker,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("project_id", &self.project_id)
            .field("clips", &self.clips.len())
            .field("pip", &self.pip)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Load `project_id`'s clips from `store` in timeline order.
    pub async fn open(
        store: Arc<dyn ClipStore>,
        project_id: impl Into<String>,
        preview: Size,
    ) -> ClipforgeResult<Self> {
        let project_id = project_id.into();
        let clips = sort_timeline(&store.fetch_clips(&project_id).await?);
        tracing::info!(project = %project_id, clips = clips.len(), "editor session opened");

        let pip = pip_from_clips(&clips, preview);
        Ok(Self {
            project_id,
            store,
            clips,
            pip,
            uploads: UploadTracker::default(),
        })
    }

    /// Project this session edits.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Clips in timeline order.
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// Clip with `id`.
    pub fn clip(&self, id: &str) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    /// PiP overlay state.
    pub fn pip(&self) -> &PipState {
        &self.pip
    }

    /// Mutable PiP overlay state. Call [`EditorSession::save_pip`] to persist changes.
    pub fn pip_mut(&mut self) -> &mut PipState {
        &mut self.pip
    }

    /// Upload states of locally recorded clips.
    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    fn index_of(&self, id: &str) -> ClipforgeResult<usize> {
        self.clips
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ClipforgeError::validation(format!("unknown clip {id}")))
    }

    /// Trim clip `id` and persist the new in/out points.
    pub async fn trim(&mut self, id: &str, start: Option<f64>, end: Option<f64>) -> ClipforgeResult<()> {
        let idx = self.index_of(id)?;
        let trimmed = trim_clip(&self.clips[idx], start, end)?;
        let stored = self.store.update_clip(id, ClipPatch::trim_of(&trimmed)).await?;
        self.clips[idx] = stored;
        Ok(())
    }

    /// Split clip `id` at `at`; the original is replaced by two new clips.
    pub async fn split(&mut self, id: &str, at: f64) -> ClipforgeResult<[String; 2]> {
        let idx = self.index_of(id)?;
        let [first, second] = split_clip(&self.clips[idx], at)?;

        let first = self.store.insert_clip(first).await?;
        let second = self.store.insert_clip(second).await?;
        self.store.delete_clip(id).await?;

        let ids = [first.id.clone(), second.id.clone()];
        self.clips = replace_clip(&self.clips, id, &[first, second])?;
        if self.pip.clip_id() == Some(id) {
            self.pip.clear();
        }
        self.persist_order().await?;
        Ok(ids)
    }

    /// Join clip `second` onto the end of clip `first`; `second` is deleted.
    pub async fn merge(&mut self, first: &str, second: &str) -> ClipforgeResult<()> {
        let (a, b) = (self.index_of(first)?, self.index_of(second)?);
        let merged = merge_clips(&self.clips[a], &self.clips[b])?;

        let stored = self.store.update_clip(first, ClipPatch::trim_of(&merged)).await?;
        self.store.delete_clip(second).await?;

        self.clips[a] = stored;
        self.clips = delete_clip(&self.clips, second);
        self.uploads.forget(second);
        if self.pip.clip_id() == Some(second) {
            self.pip.clear();
        }
        self.persist_order().await
    }

    /// Move clip `id` to `track`, at the end of the timeline.
    pub async fn move_clip_to_track(&mut self, id: &str, track: u32) -> ClipforgeResult<()> {
        let moved = move_to_track(&self.clips, id, track)?;
        let patch = ClipPatch {
            track: Some(track),
            ..ClipPatch::default()
        };
        self.store.update_clip(id, patch).await?;
        self.clips = moved;
        self.persist_order().await
    }

    /// Copy clip `id` under `new_id`, placed right after the original.
    pub async fn duplicate(&mut self, id: &str, new_id: &str) -> ClipforgeResult<()> {
        let idx = self.index_of(id)?;
        let copy = self.store.insert_clip(duplicate_clip(&self.clips[idx], new_id)).await?;
        self.clips.insert(idx + 1, copy);
        self.persist_order().await
    }

    /// Delete clip `id`, dropping its overlay and upload tracking.
    pub async fn delete(&mut self, id: &str) -> ClipforgeResult<()> {
        self.index_of(id)?;
        self.store.delete_clip(id).await?;
        self.clips = delete_clip(&self.clips, id);
        self.uploads.forget(id);
        if self.pip.clip_id() == Some(id) {
            self.pip.clear();
        }
        self.persist_order().await
    }

    /// Move the clip at `from` to `to`.
    pub async fn reorder(&mut self, from: usize, to: usize) -> ClipforgeResult<()> {
        self.clips = reorder_clips(&self.clips, from, to)?;
        self.persist_order().await
    }

    async fn persist_order(&mut self) -> ClipforgeResult<()> {
        self.clips = renumber(std::mem::take(&mut self.clips));
        for clip in &mut self.clips {
            let patch = ClipPatch {
                metadata: Some(clip.metadata.clone()),
                ..ClipPatch::default()
            };
            *clip = self.store.update_clip(&clip.id, patch).await?;
        }
        Ok(())
    }

    /// Add a just-recorded clip backed by a local placeholder; its upload starts as pending.
    pub async fn add_recording(&mut self, clip: Clip) -> ClipforgeResult<()> {
        clip.validate()?;
        let stored = self.store.insert_clip(clip).await?;
        self.uploads.track(stored.id.clone());
        self.clips.push(stored);
        self.persist_order().await
    }

    /// Feed an upload event for clip `id`. On completion the remote locator is persisted.
    pub async fn record_upload(&mut self, id: &str, event: UploadEvent) -> ClipforgeResult<()> {
        let idx = self.index_of(id)?;
        let state = self.uploads.apply(id, event)?.clone();
        match state {
            UploadState::Complete { remote_src } => {
                let patch = ClipPatch {
                    src: Some(remote_src),
                    ..ClipPatch::default()
                };
                self.clips[idx] = self.store.update_clip(id, patch).await?;
            }
            UploadState::Failed { reason } => {
                tracing::warn!(clip = id, %reason, "clip upload failed; local copy retained");
            }
            UploadState::Pending | UploadState::Uploading { .. } => {}
        }
        Ok(())
    }

    /// Persist the current overlay on its clip, removing any stale overlay from other clips.
    pub async fn save_pip(&mut self) -> ClipforgeResult<()> {
        let active = self.pip.clip_id().map(str::to_string);
        let config = self.pip.config().cloned();
        if let Some(cfg) = &config {
            cfg.validate()?;
        }
        for idx in 0..self.clips.len() {
            let id = self.clips[idx].id.clone();
            let wanted = if active.as_deref() == Some(id.as_str()) {
                config.clone()
            } else {
                None
            };
            if self.clips[idx].pip_config == wanted {
                continue;
            }
            let patch = ClipPatch {
                pip_config: Some(wanted),
                ..ClipPatch::default()
            };
            self.clips[idx] = self.store.update_clip(&id, patch).await?;
        }
        Ok(())
    }

    /// Snapshot of the clips for export: timeline order, with the live overlay applied.
    pub fn export_inputs(&self) -> Vec<Clip> {
        let mut clips = sort_timeline(&self.clips);
        let active = self.pip.clip_id();
        for clip in &mut clips {
            clip.pip_config = if active == Some(clip.id.as_str()) {
                self.pip.config().cloned()
            } else {
                None
            };
        }
        clips
    }
}

fn pip_from_clips(clips: &[Clip], preview: Size) -> PipState {
    let mut pip = PipState::new(preview);
    if let Some(clip) = clips.iter().find(|c| c.pip_config.is_some())
        && let Some(cfg) = &clip.pip_config
    {
        pip.restore(clip.id.clone(), cfg.clone());
    }
    pip
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/session.rs"]
mod tests;
