use std::collections::BTreeMap;

use crate::foundation::error::{ClipforgeError, ClipforgeResult};

/// Per-clip upload lifecycle.
///
/// A freshly recorded clip is usable locally (`Pending`) before its remote copy exists.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadState {
    /// Local placeholder only.
    Pending,
    /// Transfer in progress.
    Uploading {
        /// Fraction transferred, `0.0..=1.0`.
        progress: f64,
    },
    /// Remote copy available at `remote_src`.
    Complete {
        /// Remote locator that replaces the placeholder.
        remote_src: String,
    },
    /// Transfer failed; may be retried.
    Failed {
        /// Error text from the storage collaborator.
        reason: String,
    },
}

/// Inputs that drive [`UploadState`].
#[derive(Clone, Debug, PartialEq)]
pub enum UploadEvent {
    /// Transfer started.
    Start,
    /// Transfer progressed.
    Progress(f64),
    /// Transfer finished.
    Succeed {
        /// Remote locator.
        remote_src: String,
    },
    /// Transfer failed.
    Fail(String),
    /// Re-queue a failed upload.
    Retry,
}

impl UploadState {
    /// Apply `event`, or reject transitions the lifecycle does not allow.
    ///
    /// | from      | event    | to        |
    /// |-----------|----------|-----------|
    /// | Pending   | Start    | Uploading |
    /// | Uploading | Progress | Uploading |
    /// | Uploading | Succeed  | Complete  |
    /// | Uploading | Fail     | Failed    |
    /// | Pending   | Fail     | Failed    |
    /// | Failed    | Retry    | Pending   |
    pub fn transition(&self, event: UploadEvent) -> ClipforgeResult<UploadState> {
        use UploadEvent as E;
        use UploadState as S;
        match (self, event) {
            (S::Pending, E::Start) => Ok(S::Uploading { progress: 0.0 }),
            (S::Uploading { progress }, E::Progress(p)) => Ok(S::Uploading {
                progress: p.clamp(*progress, 1.0),
            }),
            (S::Uploading { .. }, E::Succeed { remote_src }) => Ok(S::Complete { remote_src }),
            (S::Uploading { .. } | S::Pending, E::Fail(reason)) => Ok(S::Failed { reason }),
            (S::Failed { .. }, E::Retry) => Ok(S::Pending),
            (from, event) => Err(ClipforgeError::invalid_transition(from, event)),
        }
    }

    /// `true` for `Complete`.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Upload states keyed by clip id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UploadTracker {
    states: BTreeMap<String, UploadState>,
}

impl UploadTracker {
    /// Register a clip in `Pending`.
    pub fn track(&mut self, clip_id: impl Into<String>) {
        self.states.insert(clip_id.into(), UploadState::Pending);
    }

    /// Current state of `clip_id`.
    pub fn state(&self, clip_id: &str) -> Option<&UploadState> {
        self.states.get(clip_id)
    }

    /// Apply `event` to `clip_id`'s state.
    pub fn apply(&mut self, clip_id: &str, event: UploadEvent) -> ClipforgeResult<&UploadState> {
        let current = self
            .states
            .get_mut(clip_id)
            .ok_or_else(|| ClipforgeError::validation(format!("clip {clip_id} is not tracked")))?;
        let next = current.transition(event)?;
        tracing::debug!(clip = clip_id, ?next, "upload state changed");
        *current = next;
        Ok(current)
    }

    /// Clips whose upload has not completed.
    pub fn outstanding(&self) -> impl Iterator<Item = &str> {
        self.states
            .iter()
            .filter(|(_, s)| !s.is_complete())
            .map(|(id, _)| id.as_str())
    }

    /// Stop tracking `clip_id`.
    pub fn forget(&mut self, clip_id: &str) {
        self.states.remove(clip_id);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/upload.rs"]
mod tests;
