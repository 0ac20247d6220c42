use std::time::Duration;

use crate::{
    compose::plan::PlanOptions,
    foundation::error::{ClipforgeError, ClipforgeResult},
};

/// Overall progress percentages at which each export phase ends.
///
/// Staging runs from 0 to `staging_end`, step execution from there to `executing_end`, and
/// finalizing from there to 100.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ProgressBands {
    /// End of staging.
    pub staging_end: f64,
    /// End of step execution.
    pub executing_end: f64,
}

impl Default for ProgressBands {
    fn default() -> Self {
        Self {
            staging_end: 10.0,
            executing_end: 90.0,
        }
    }
}

impl ProgressBands {
    /// Overall percent for `done` of `total` steps finished.
    pub fn executing(&self, done: usize, total: usize) -> f64 {
        if total == 0 {
            return self.executing_end;
        }
        let span = self.executing_end - self.staging_end;
        self.staging_end + span * (done as f64 / total as f64)
    }

    /// Overall percent for `done` of `total` staged files.
    pub fn staging(&self, done: usize, total: usize) -> f64 {
        if total == 0 {
            return self.staging_end;
        }
        self.staging_end * (done as f64 / total as f64)
    }
}

/// Export tunables.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Engine load sources, tried round-robin.
    pub engine_sources: Vec<String>,
    /// Total engine load attempts across all sources.
    pub max_init_attempts: u32,
    /// First retry delay.
    pub init_backoff_ms: u64,
    /// Retry delay cap.
    pub init_backoff_max_ms: u64,
    /// Progress phase boundaries.
    pub progress: ProgressBands,
    /// Planner options.
    pub plan: PlanOptions,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            engine_sources: vec!["ffmpeg".to_string()],
            max_init_attempts: 3,
            init_backoff_ms: 250,
            init_backoff_max_ms: 2000,
            progress: ProgressBands::default(),
            plan: PlanOptions::default(),
        }
    }
}

impl ExportConfig {
    /// Defaults overlaid with `CLIPFORGE_*` environment variables.
    ///
    /// `CLIPFORGE_ENGINE_SOURCES` (comma-separated), `CLIPFORGE_INIT_ATTEMPTS`,
    /// `CLIPFORGE_INIT_BACKOFF_MS`, `CLIPFORGE_INIT_BACKOFF_MAX_MS`. Unparsable values are
    /// ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ExportConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(sources) = lookup("CLIPFORGE_ENGINE_SOURCES") {
            let sources: Vec<String> = sources
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !sources.is_empty() {
                cfg.engine_sources = sources;
            }
        }
        if let Some(v) = lookup("CLIPFORGE_INIT_ATTEMPTS").and_then(|s| s.trim().parse().ok()) {
            cfg.max_init_attempts = v;
        }
        if let Some(v) = lookup("CLIPFORGE_INIT_BACKOFF_MS").and_then(|s| s.trim().parse().ok()) {
            cfg.init_backoff_ms = v;
        }
        if let Some(v) = lookup("CLIPFORGE_INIT_BACKOFF_MAX_MS").and_then(|s| s.trim().parse().ok())
        {
            cfg.init_backoff_max_ms = v;
        }
        cfg
    }

    /// Parse a JSON config document; missing fields take their defaults.
    pub fn from_json_reader(reader: impl std::io::Read) -> ClipforgeResult<Self> {
        let cfg: Self = serde_json::from_reader(reader)
            .map_err(|e| ClipforgeError::serde(format!("invalid export config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configs the orchestrator cannot run with.
    pub fn validate(&self) -> ClipforgeResult<()> {
        if self.engine_sources.is_empty() {
            return Err(ClipforgeError::validation("at least one engine source is required"));
        }
        if self.max_init_attempts == 0 {
            return Err(ClipforgeError::validation("max_init_attempts must be at least 1"));
        }
        let ProgressBands {
            staging_end,
            executing_end,
        } = self.progress;
        if !(0.0..=100.0).contains(&staging_end)
            || !(staging_end..=100.0).contains(&executing_end)
        {
            return Err(ClipforgeError::validation(
                "progress bands must satisfy 0 <= staging_end <= executing_end <= 100",
            ));
        }
        Ok(())
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(
            self.init_backoff_ms
                .saturating_mul(factor)
                .min(self.init_backoff_max_ms),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/config.rs"]
mod tests;
