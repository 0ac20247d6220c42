use crate::foundation::core::PixelSize;

const AUDIO_BITRATE: &str = "128k";
const DEFAULT_X264_PRESET: &str = "medium";

/// Export settings as chosen in the UI. Values are free-form strings resolved by
/// [`ExportSettings::resolve`]; unknown values fall back with a warning.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// `1080p`, `720p`, `480p`, `360p` or `source`.
    pub resolution: String,
    /// `high`, `medium` or `low`.
    pub quality: String,
    /// `mp4`, `mov` or `webm`.
    pub format: String,
    /// x264 speed preset (`fast`, `medium`, `slow`, ...). Ignored for webm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            resolution: "1080p".to_string(),
            quality: "medium".to_string(),
            format: "mp4".to_string(),
            preset: None,
        }
    }
}

/// Output container and its codec pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    /// MPEG-4, H.264 + AAC.
    Mp4,
    /// QuickTime, H.264 + AAC.
    Mov,
    /// WebM, VP9 + Opus.
    Webm,
}

impl Container {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Some(Self::Mp4),
            "mov" => Some(Self::Mov),
            "webm" => Some(Self::Webm),
            _ => None,
        }
    }

    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Webm => "webm",
        }
    }

    /// MIME type of the finished artifact.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Mov => "video/quicktime",
            Self::Webm => "video/webm",
        }
    }

    /// Encoder for the video stream.
    pub fn video_codec(self) -> &'static str {
        match self {
            Self::Mp4 | Self::Mov => "libx264",
            Self::Webm => "libvpx-vp9",
        }
    }

    /// Encoder for the audio stream.
    pub fn audio_codec(self) -> &'static str {
        match self {
            Self::Mp4 | Self::Mov => "aac",
            Self::Webm => "libopus",
        }
    }

    fn takes_preset(self) -> bool {
        !matches!(self, Self::Webm)
    }
}

/// [`ExportSettings`] mapped through the lookup tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSettings {
    /// Output frame size; `None` keeps the source size.
    pub frame_size: Option<PixelSize>,
    /// Video bitrate argument, e.g. `4000k`.
    pub video_bitrate: &'static str,
    /// Audio bitrate argument.
    pub audio_bitrate: &'static str,
    /// Output container.
    pub container: Container,
    /// x264 preset, when the container's encoder takes one.
    pub encoder_preset: Option<String>,
}

fn resolution_table(s: &str) -> Option<Option<PixelSize>> {
    let (w, h) = match s.trim().to_ascii_lowercase().as_str() {
        "1080p" => (1920, 1080),
        "720p" => (1280, 720),
        "480p" => (854, 480),
        "360p" => (640, 360),
        "source" => return Some(None),
        _ => return None,
    };
    Some(Some(PixelSize { width: w, height: h }))
}

fn bitrate_table(s: &str) -> Option<&'static str> {
    match s.trim().to_ascii_lowercase().as_str() {
        "high" => Some("8000k"),
        "medium" => Some("4000k"),
        "low" => Some("2000k"),
        _ => None,
    }
}

impl ExportSettings {
    /// Settings of the named preset, if known.
    pub fn preset(id: &str) -> Option<Self> {
        EXPORT_PRESETS.iter().find(|p| p.id == id).map(ExportPreset::settings)
    }

    /// Map the UI strings to concrete encoder arguments.
    ///
    /// Unknown resolution or quality fall back to `1080p` / `medium`, an unknown format to
    /// `mp4`; each fallback is logged.
    pub fn resolve(&self) -> ResolvedSettings {
        let frame_size = resolution_table(&self.resolution).unwrap_or_else(|| {
            tracing::warn!(resolution = %self.resolution, "unknown export resolution; using 1080p");
            resolution_table("1080p").flatten()
        });
        let video_bitrate = bitrate_table(&self.quality).unwrap_or_else(|| {
            tracing::warn!(quality = %self.quality, "unknown export quality; using medium");
            "4000k"
        });
        let container = Container::parse(&self.format).unwrap_or_else(|| {
            tracing::warn!(format = %self.format, "unknown export format; using mp4");
            Container::Mp4
        });
        let encoder_preset = container.takes_preset().then(|| {
            self.preset
                .clone()
                .unwrap_or_else(|| DEFAULT_X264_PRESET.to_string())
        });

        ResolvedSettings {
            frame_size,
            video_bitrate,
            audio_bitrate: AUDIO_BITRATE,
            container,
            encoder_preset,
        }
    }
}

/// A named settings bundle offered to users.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportPreset {
    /// Stable identifier.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Intended use.
    pub description: &'static str,
    /// Resolution key.
    pub resolution: &'static str,
    /// Quality key.
    pub quality: &'static str,
    /// Container key.
    pub format: &'static str,
    /// x264 preset.
    pub encoder_preset: &'static str,
}

impl ExportPreset {
    /// Convert to [`ExportSettings`].
    pub fn settings(&self) -> ExportSettings {
        ExportSettings {
            resolution: self.resolution.to_string(),
            quality: self.quality.to_string(),
            format: self.format.to_string(),
            preset: Some(self.encoder_preset.to_string()),
        }
    }
}

/// Built-in presets.
pub const EXPORT_PRESETS: &[ExportPreset] = &[
    ExportPreset {
        id: "web",
        name: "Web (720p)",
        description: "Optimized for web sharing and streaming",
        resolution: "720p",
        quality: "medium",
        format: "mp4",
        encoder_preset: "fast",
    },
    ExportPreset {
        id: "youtube",
        name: "YouTube (1080p)",
        description: "High quality for YouTube uploads",
        resolution: "1080p",
        quality: "high",
        format: "mp4",
        encoder_preset: "medium",
    },
    ExportPreset {
        id: "high-quality",
        name: "High Quality (1080p)",
        description: "Maximum quality for archival",
        resolution: "1080p",
        quality: "high",
        format: "mp4",
        encoder_preset: "slow",
    },
    ExportPreset {
        id: "source",
        name: "Source Quality",
        description: "Keep the original resolution",
        resolution: "source",
        quality: "high",
        format: "mp4",
        encoder_preset: "medium",
    },
    ExportPreset {
        id: "mobile",
        name: "Mobile (480p)",
        description: "Optimized for mobile devices",
        resolution: "480p",
        quality: "low",
        format: "mp4",
        encoder_preset: "fast",
    },
    ExportPreset {
        id: "webm",
        name: "WebM (720p)",
        description: "Modern web format with VP9 codec",
        resolution: "720p",
        quality: "medium",
        format: "webm",
        encoder_preset: "medium",
    },
];

#[cfg(test)]
#[path = "../../tests/unit/compose/settings.rs"]
mod tests;
