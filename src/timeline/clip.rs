use serde_json::{Map, Value};

use crate::{
    foundation::error::{ClipforgeError, ClipforgeResult},
    pip::config::PipConfig,
};

/// Primary vs. overlay content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipType {
    /// Screen recording; supplies the background and the audio.
    Screen,
    /// Camera recording; composited as the PiP overlay.
    Webcam,
}

impl ClipType {
    /// Parse a metadata `type` value. Unrecognised values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "screen" => Some(Self::Screen),
            "webcam" | "camera" => Some(Self::Webcam),
            _ => None,
        }
    }

    /// Lowercase name, as stored in metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Screen => "screen",
            Self::Webcam => "webcam",
        }
    }
}

fn default_track() -> u32 {
    1
}

/// One source media file restricted to a sub-interval.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Clip {
    /// Unique identifier.
    pub id: String,
    /// Owning project.
    #[serde(default)]
    pub project_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Source locator (`blob:`, `indexeddb://`, `http(s)://`, or a file path).
    pub src: String,
    /// Trim-in point, seconds.
    pub start_time: f64,
    /// Trim-out point, seconds; `None` plays through the natural end.
    #[serde(default)]
    pub end_time: Option<f64>,
    /// Trimmed length, seconds. Kept equal to `end - start` by every edit.
    pub duration: f64,
    /// Track number: 1 is screen content, 2 is webcam content by convention.
    #[serde(default = "default_track")]
    pub track: u32,
    /// Natural length of the source media, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_duration: Option<f64>,
    /// Free-form metadata; `type` and `order` are read by the pipeline.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Overlay placement, for webcam clips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pip_config: Option<PipConfig>,
}

impl Clip {
    /// An untrimmed clip on track 1 spanning `[0, duration)`.
    pub fn new(id: impl Into<String>, src: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            project_id: String::new(),
            name: String::new(),
            src: src.into(),
            start_time: 0.0,
            end_time: None,
            duration,
            track: default_track(),
            source_duration: Some(duration),
            metadata: Map::new(),
            pip_config: None,
        }
    }

    /// Builder-style metadata `type` setter.
    pub fn with_type(mut self, clip_type: ClipType) -> Self {
        self.metadata
            .insert("type".to_string(), Value::String(clip_type.as_str().to_string()));
        self
    }

    /// Builder-style track setter.
    pub fn on_track(mut self, track: u32) -> Self {
        self.track = track;
        self
    }

    /// Builder-style name setter.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder-style timeline order setter.
    pub fn with_order(mut self, order: i64) -> Self {
        self.metadata.insert("order".to_string(), Value::from(order));
        self
    }

    /// Builder-style trim setter; keeps `duration` consistent.
    pub fn trimmed(mut self, start: f64, end: Option<f64>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self.duration = self.effective_end() - start;
        self
    }

    /// Raw metadata `type` string, if present.
    pub fn type_tag(&self) -> Option<&str> {
        self.metadata.get("type").and_then(Value::as_str)
    }

    /// Explicitly tagged type, if the tag is recognised.
    pub fn explicit_type(&self) -> Option<ClipType> {
        self.type_tag().and_then(ClipType::parse)
    }

    /// Timeline order from metadata.
    pub fn order(&self) -> Option<i64> {
        self.metadata.get("order").and_then(Value::as_i64)
    }

    /// Where playback stops: `end_time`, else the natural end.
    pub fn effective_end(&self) -> f64 {
        self.end_time
            .or(self.source_duration)
            .unwrap_or(self.start_time + self.duration)
    }

    /// Whether the staged source must be cut before use.
    ///
    /// An explicit out-point on a source of unknown length counts as a cut.
    pub fn needs_trim(&self) -> bool {
        self.start_time > 0.0
            || self
                .end_time
                .is_some_and(|end| self.source_duration.is_none_or(|natural| end < natural))
    }

    /// Check `0 <= start_time < effective_end`.
    pub fn validate(&self) -> ClipforgeResult<()> {
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(ClipforgeError::validation(format!(
                "clip {}: start_time must be >= 0, got {}",
                self.id, self.start_time
            )));
        }
        let end = self.effective_end();
        if !end.is_finite() || self.start_time >= end {
            return Err(ClipforgeError::validation(format!(
                "clip {}: start_time {} must be before end {}",
                self.id, self.start_time, end
            )));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(ClipforgeError::validation(format!(
                "clip {}: duration must be >= 0, got {}",
                self.id, self.duration
            )));
        }
        if self.src.trim().is_empty() {
            return Err(ClipforgeError::validation(format!(
                "clip {}: source locator is empty",
                self.id
            )));
        }
        if let Some(cfg) = &self.pip_config {
            cfg.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/clip.rs"]
mod tests;
