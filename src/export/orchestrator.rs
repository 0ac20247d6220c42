//! End-to-end export: engine init, planning, staging, execution, artifact retrieval.
//!
//! One [`Exporter::export`] call walks the [`ExportState`] machine from `Idle` to a terminal
//! state. Engine filesystem cleanup and engine teardown run on every exit path.

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};

use crate::{
    compose::{
        plan::{CompositionPlan, PipComposition, plan},
        settings::ExportSettings,
    },
    execute::{
        cancel::CancelToken,
        engine::MediaEngine,
        runner::{StepProgress, execute_plan},
    },
    export::{config::ExportConfig, sources::BlobResolver},
    foundation::{
        core::PixelSize,
        error::{ClipforgeError, ClipforgeResult},
    },
    pip::config::{CoordSpace, PipConfig},
    timeline::{
        classify::{classify_clips, pip_roles},
        clip::Clip,
        edit::sort_timeline,
    },
};

const DEFAULT_FILE_STEM: &str = "clipforge-export";

/// Export lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    /// Nothing started.
    Idle,
    /// Loading the media engine.
    Preparing,
    /// Building the composition plan.
    Planning,
    /// Writing inputs into the engine filesystem.
    Staging,
    /// Running plan steps.
    Executing,
    /// Reading the artifact back and cleaning up.
    Finalizing,
    /// Artifact delivered.
    Complete,
    /// Stopped on request.
    Cancelled,
    /// Stopped by an error.
    Failed,
}

impl ExportState {
    /// `Complete`, `Cancelled` or `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }

    /// Move to `next`, if the lifecycle allows it.
    ///
    /// The happy path is strictly linear. `Cancelled` and `Failed` are reachable from every
    /// non-terminal state; terminal states have no exits.
    pub fn transition(self, next: ExportState) -> ClipforgeResult<ExportState> {
        use ExportState::*;
        let allowed = match (self, next) {
            (from, Cancelled | Failed) => !from.is_terminal(),
            (Idle, Preparing)
            | (Preparing, Planning)
            | (Planning, Staging)
            | (Staging, Executing)
            | (Executing, Finalizing)
            | (Finalizing, Complete) => true,
            _ => false,
        };
        if allowed {
            Ok(next)
        } else {
            Err(ClipforgeError::invalid_transition(self, next))
        }
    }
}

/// Progress update for UI display.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportProgress {
    /// Current state.
    pub state: ExportState,
    /// Overall completion, 0 to 100, never decreasing within one export.
    pub percent: f64,
    /// What is happening.
    pub detail: String,
}

/// Progress sink for [`Exporter::export`].
pub type ExportProgressFn<'a> = &'a (dyn Fn(&ExportProgress) + Send + Sync);

/// What to export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportRequest {
    /// Clips in any order; they are sorted into timeline order.
    pub clips: Vec<Clip>,
    /// Suggested output name. Directories are stripped and the extension follows the format.
    pub file_name_hint: String,
    /// Encoder settings.
    pub settings: ExportSettings,
    /// Pixel size of the background video. Required when the overlay's PiP config is in
    /// preview space, since the overlay is composited before the final scale.
    pub background_size: Option<PixelSize>,
}

impl ExportRequest {
    /// A request without a known background size.
    pub fn new(clips: Vec<Clip>, file_name_hint: impl Into<String>, settings: ExportSettings) -> Self {
        Self {
            clips,
            file_name_hint: file_name_hint.into(),
            settings,
            background_size: None,
        }
    }

    /// Set the background video's pixel size.
    pub fn with_background_size(mut self, size: PixelSize) -> Self {
        self.background_size = Some(size);
        self
    }

    /// Everything that can be rejected without the engine: clip ranges, PiP configs, clip
    /// roles and the coordinate space of the overlay.
    fn validate(&self) -> ClipforgeResult<()> {
        if self.clips.is_empty() {
            return Err(ClipforgeError::validation("no clips to export"));
        }
        for clip in &self.clips {
            clip.validate()?;
        }
        let clips = sort_timeline(&self.clips);
        let classes = classify_clips(&clips)?;
        if let Some(roles) = pip_roles(&classes)
            && let Some(config) = &clips[roles.overlay].pip_config
        {
            self.source_space(config)?;
        }
        Ok(())
    }

    fn source_space(&self, config: &PipConfig) -> ClipforgeResult<PipConfig> {
        match (config.space, self.background_size) {
            (CoordSpace::Source, _) => Ok(config.clone()),
            (CoordSpace::Preview { .. }, Some(size)) => Ok(config.to_source_space(size)),
            (CoordSpace::Preview { width, height }, None) => {
                Err(ClipforgeError::validation(format!(
                    "PiP config is in a {width}x{height} preview space but the background \
                     video size is unknown; set the request's background size"
                )))
            }
        }
    }
}

/// The exported file.
#[derive(Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// File contents.
    pub bytes: Vec<u8>,
    /// Suggested file name, extension included.
    pub file_name: String,
    /// MIME type of the container.
    pub mime_type: &'static str,
}

impl std::fmt::Debug for ExportArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportArtifact")
            .field("bytes", &self.bytes.len())
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// How an export ended, when it did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The artifact.
    Complete(ExportArtifact),
    /// The caller cancelled; nothing was produced.
    Cancelled,
}

/// Output file name for `hint`: last path segment, unsafe characters replaced, extension forced.
pub fn output_file_name(hint: &str, extension: &str) -> String {
    let last = hint.rsplit(['/', '\\']).next().unwrap_or(hint).trim();
    let stem = match last.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            stem
        }
        _ => last,
    };
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    let stem = if cleaned.is_empty() {
        DEFAULT_FILE_STEM
    } else {
        cleaned
    };
    format!("{stem}.{extension}")
}

struct Run<'a> {
    state: ExportState,
    percent: Mutex<f64>,
    sink: Option<ExportProgressFn<'a>>,
    files: BTreeSet<String>,
}

impl<'a> Run<'a> {
    fn new(sink: Option<ExportProgressFn<'a>>) -> Self {
        Self {
            state: ExportState::Idle,
            percent: Mutex::new(0.0),
            sink,
            files: BTreeSet::new(),
        }
    }

    fn enter(&mut self, next: ExportState) -> ClipforgeResult<()> {
        self.state = self.state.transition(next)?;
        tracing::info!(state = ?self.state, "export state");
        Ok(())
    }

    fn report(&self, percent: f64, detail: impl Into<String>) {
        let Some(sink) = self.sink else {
            return;
        };
        let percent = match self.percent.lock() {
            Ok(mut last) => {
                *last = last.max(percent.clamp(0.0, 100.0));
                *last
            }
            Err(_) => percent,
        };
        sink(&ExportProgress {
            state: self.state,
            percent,
            detail: detail.into(),
        });
    }
}

fn checkpoint(cancel: &CancelToken) -> ClipforgeResult<()> {
    if cancel.is_cancelled() {
        Err(ClipforgeError::Cancelled)
    } else {
        Ok(())
    }
}

/// Drives exports on one engine.
///
/// The engine filesystem is not shared safely between plans: run concurrent exports on
/// separate engines.
pub struct Exporter {
    engine: Arc<dyn MediaEngine>,
    resolver: Arc<dyn BlobResolver>,
    config: ExportConfig,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("engine_loaded", &self.engine.is_loaded())
            .field("config", &self.config)
            .finish()
    }
}

impl Exporter {
    /// Exporter with the default config.
    pub fn new(engine: Arc<dyn MediaEngine>, resolver: Arc<dyn BlobResolver>) -> Self {
        Self {
            engine,
            resolver,
            config: ExportConfig::default(),
        }
    }

    /// Replace the config.
    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// Active config.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export `request`.
    ///
    /// Input errors are returned before the engine is touched. Cancellation is observed
    /// between stages, staged files and plan steps, and yields [`ExportOutcome::Cancelled`].
    /// Any other failure is returned as an error after cleanup; see
    /// [`user_message`](crate::export::messages::user_message) for display text.
    #[tracing::instrument(skip_all, fields(clips = request.clips.len(), format = %request.settings.format))]
    pub async fn export(
        &self,
        request: &ExportRequest,
        on_progress: Option<ExportProgressFn<'_>>,
        cancel: &CancelToken,
    ) -> ClipforgeResult<ExportOutcome> {
        self.config.validate()?;
        let mut run = Run::new(on_progress);
        if let Err(err) = request.validate() {
            run.enter(ExportState::Failed)?;
            return Err(err);
        }

        let result = self.run(request, &mut run, cancel).await;
        self.cleanup(&run.files).await;

        match result {
            Ok(artifact) => {
                run.enter(ExportState::Complete)?;
                run.report(100.0, "Export complete");
                tracing::info!(
                    file = %artifact.file_name,
                    bytes = artifact.bytes.len(),
                    "export complete"
                );
                Ok(ExportOutcome::Complete(artifact))
            }
            Err(err) if err.is_cancelled() => {
                run.enter(ExportState::Cancelled)?;
                tracing::info!("export cancelled");
                Ok(ExportOutcome::Cancelled)
            }
            Err(err) => {
                run.enter(ExportState::Failed)?;
                tracing::error!(error = %err, "export failed");
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        request: &ExportRequest,
        run: &mut Run<'_>,
        cancel: &CancelToken,
    ) -> ClipforgeResult<ExportArtifact> {
        checkpoint(cancel)?;
        run.enter(ExportState::Preparing)?;
        run.report(0.0, "Loading media engine");
        self.prepare(cancel).await?;

        checkpoint(cancel)?;
        run.enter(ExportState::Planning)?;
        let plan = self.build_plan(request)?;
        run.files = plan.files();
        tracing::info!(
            steps = plan.steps.len(),
            estimated_secs = plan.estimated_secs,
            "plan ready"
        );

        checkpoint(cancel)?;
        run.enter(ExportState::Staging)?;
        self.stage(&plan, run, cancel).await?;

        checkpoint(cancel)?;
        run.enter(ExportState::Executing)?;
        let bands = self.config.progress;
        let shared: &Run<'_> = run;
        let on_step = |p: &StepProgress| {
            shared.report(bands.executing(p.index - 1, p.total), p.description.clone());
        };
        let output = execute_plan(&plan, self.engine.as_ref(), Some(&on_step), cancel).await?;
        run.report(bands.executing_end, "Processing complete");

        checkpoint(cancel)?;
        run.enter(ExportState::Finalizing)?;
        let bytes = self
            .engine
            .read_file(&output)
            .await
            .map_err(|e| ClipforgeError::engine(format!("failed to read {output}: {e}")))?;
        if bytes.is_empty() {
            return Err(ClipforgeError::engine(format!("{output} is empty")));
        }
        Ok(ExportArtifact {
            bytes,
            file_name: output_file_name(&request.file_name_hint, plan.container.extension()),
            mime_type: plan.container.mime_type(),
        })
    }

    async fn prepare(&self, cancel: &CancelToken) -> ClipforgeResult<()> {
        if self.engine.is_loaded() {
            return Ok(());
        }
        let sources = &self.config.engine_sources;
        let attempts = self.config.max_init_attempts;
        let mut last_error = None;
        for attempt in 0..attempts {
            let Some(source) = sources.get(attempt as usize % sources.len().max(1)) else {
                break;
            };
            match self.engine.load(source).await {
                Ok(()) => {
                    tracing::info!(source = %source, attempt = attempt + 1, "media engine loaded");
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(
                        source = %source,
                        attempt = attempt + 1,
                        attempts,
                        error = %err,
                        "media engine failed to load"
                    );
                    last_error = Some(err);
                }
            }
            if attempt + 1 < attempts {
                let mut watch = cancel.clone();
                tokio::select! {
                    _ = tokio::time::sleep(self.config.backoff(attempt)) => {}
                    _ = watch.cancelled() => return Err(ClipforgeError::Cancelled),
                }
            }
        }
        Err(ClipforgeError::engine(format!(
            "media engine failed to load after {attempts} attempts: {}",
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    fn build_plan(&self, request: &ExportRequest) -> ClipforgeResult<CompositionPlan> {
        let clips = sort_timeline(&request.clips);
        let classes = classify_clips(&clips)?;

        let pip = pip_roles(&classes).and_then(|roles| {
            let overlay = &clips[roles.overlay];
            let Some(config) = &overlay.pip_config else {
                tracing::warn!(clip = %overlay.id, "webcam clip has no PiP config; exporting without overlay");
                return None;
            };
            Some(request.source_space(config).map(|config| {
                PipComposition::new(roles.background, roles.overlay, config)
            }))
        });

        plan(&clips, &request.settings, pip.transpose()?.as_ref(), &self.config.plan)
    }

    async fn stage(
        &self,
        plan: &CompositionPlan,
        run: &Run<'_>,
        cancel: &CancelToken,
    ) -> ClipforgeResult<()> {
        let bands = self.config.progress;
        let total = plan.staged_inputs.len() + plan.generated_inputs.len();
        let mut done = 0;

        for input in &plan.staged_inputs {
            checkpoint(cancel)?;
            let bytes = self.resolver.resolve(&input.src).await.map_err(|e| match e {
                ClipforgeError::Staging(_) => e,
                other => ClipforgeError::staging(format!("clip {}: {other}", input.clip_id)),
            })?;
            self.write_input(&input.file_name, &bytes).await?;
            done += 1;
            run.report(bands.staging(done, total), format!("Staged {}", input.file_name));
        }
        for input in &plan.generated_inputs {
            checkpoint(cancel)?;
            self.write_input(&input.name, &input.contents).await?;
            done += 1;
            run.report(bands.staging(done, total), format!("Staged {}", input.name));
        }
        Ok(())
    }

    async fn write_input(&self, name: &str, bytes: &[u8]) -> ClipforgeResult<()> {
        tracing::debug!(file = name, bytes = bytes.len(), "staging file");
        self.engine
            .write_file(name, bytes)
            .await
            .map_err(|e| ClipforgeError::staging(format!("failed to write {name}: {e}")))
    }

    async fn cleanup(&self, plan_files: &BTreeSet<String>) {
        let mut files = plan_files.clone();
        if self.engine.is_loaded() {
            match self.engine.list_dir("/").await {
                Ok(names) => files.extend(
                    names
                        .into_iter()
                        .filter(|n| n != "." && n != ".."),
                ),
                Err(err) => tracing::warn!(error = %err, "could not list engine files"),
            }
            for name in &files {
                if let Err(err) = self.engine.delete_file(name).await {
                    tracing::warn!(file = %name, error = %err, "could not delete engine file");
                }
            }
        }
        if let Err(err) = self.engine.terminate().await {
            tracing::warn!(error = %err, "engine terminate failed");
        }
        tracing::debug!(files = files.len(), "engine cleaned up");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/orchestrator.rs"]
mod tests;
