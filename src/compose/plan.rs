//! Composition planning: ordered clips plus export settings (plus an optional PiP overlay)
//! become an ordered list of media-engine steps.
//!
//! [`plan`] is a pure function. It performs no I/O, never reorders or mutates clips, and
//! identical inputs always produce identical step lists.

use std::collections::BTreeSet;

use crate::{
    compose::{
        args::{
            OverlayRect, RingStyle, concat_copy_args, concat_filter_args, concat_list,
            encode_args, mask_args, overlay_args, overlay_graph, trim_args,
        },
        settings::{Container, ExportSettings},
    },
    foundation::core::PixelSize,
    foundation::error::{ClipforgeError, ClipforgeResult},
    foundation::math::parse_hex_color,
    pip::config::{CoordSpace, PipConfig},
    shapes::mask::render_mask,
    timeline::clip::Clip,
};

const MASK_FILE: &str = "pip_mask.png";
const MASK_SVG: &str = "pip_shape.svg";
const MASK_PNG: &str = "pip_shape.png";
const PIP_OUTPUT: &str = "pip_composed.mp4";
const CONCAT_LIST: &str = "concat_list.txt";
const DEFAULT_EXTENSION: &str = "mp4";

const TRIM_COST: f64 = 0.1;
const OVERLAY_COST: f64 = 1.5;
const CONCAT_COST: f64 = 1.2;
const ENCODE_COST: f64 = 2.0;

/// Kind of processing a step performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Stream-copy cut of one clip.
    Trim,
    /// Shape mask rasterization.
    Mask,
    /// Masked PiP composite.
    Overlay,
    /// Concatenation of all clips.
    Concat,
    /// Final encode to the output container.
    Encode,
}

impl StepKind {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trim => "trim",
            Self::Mask => "mask",
            Self::Overlay => "overlay",
            Self::Concat => "concat",
            Self::Encode => "encode",
        }
    }
}

/// One engine invocation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompositionStep {
    /// Step kind.
    #[serde(rename = "type")]
    pub kind: StepKind,
    /// Engine argv.
    pub command: Vec<String>,
    /// Virtual-filesystem names read by the step.
    pub input_files: Vec<String>,
    /// Virtual-filesystem name written by the step.
    pub output_file: String,
    /// Progress label.
    pub description: String,
}

/// A clip source the caller must stage before execution.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StagedInput {
    /// Clip the bytes belong to.
    pub clip_id: String,
    /// Source locator to resolve.
    pub src: String,
    /// Name to write in the engine filesystem.
    pub file_name: String,
}

/// A file the planner produced itself (mask source, concat list).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeneratedInput {
    /// Name to write in the engine filesystem.
    pub name: String,
    /// File contents.
    pub contents: Vec<u8>,
}

/// Ordered, immutable processing plan.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompositionPlan {
    /// Steps in execution order.
    pub steps: Vec<CompositionStep>,
    /// Name of the final artifact; always the last step's output.
    pub output_file: String,
    /// Rough processing time in seconds, for progress display only.
    pub estimated_secs: u64,
    /// Clip sources to stage, one per clip, in clip order.
    pub staged_inputs: Vec<StagedInput>,
    /// Planner-produced files to stage.
    pub generated_inputs: Vec<GeneratedInput>,
    /// Output container.
    pub container: Container,
}

impl CompositionPlan {
    /// Kinds of all steps, in order.
    pub fn step_kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }

    /// Every name the plan reads or writes in the engine filesystem.
    pub fn files(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self
            .staged_inputs
            .iter()
            .map(|s| s.file_name.clone())
            .collect();
        out.extend(self.generated_inputs.iter().map(|g| g.name.clone()));
        for step in &self.steps {
            out.extend(step.input_files.iter().cloned());
            out.insert(step.output_file.clone());
        }
        out
    }

    /// Structural checks: non-empty steps, output declared, positive estimate, and every
    /// step carrying a command, an output and a description. Then [`Self::validate_edges`].
    pub fn validate(&self) -> ClipforgeResult<()> {
        let mut errors = Vec::new();
        if self.steps.is_empty() {
            errors.push("no composition steps defined".to_string());
        }
        if self.output_file.is_empty() {
            errors.push("no output file specified".to_string());
        }
        if self.estimated_secs == 0 {
            errors.push("invalid estimated time".to_string());
        }
        for (i, step) in self.steps.iter().enumerate() {
            if step.command.is_empty() {
                errors.push(format!("step {}: no command specified", i + 1));
            }
            if step.output_file.is_empty() {
                errors.push(format!("step {}: no output file specified", i + 1));
            }
            if step.description.is_empty() {
                errors.push(format!("step {}: no description provided", i + 1));
            }
        }
        if !errors.is_empty() {
            return Err(ClipforgeError::validation(errors.join("; ")));
        }
        self.validate_edges()
    }

    /// Check the total order: each input is staged, generated, or produced by an earlier
    /// step, and the last step is the encode writing [`Self::output_file`].
    pub fn validate_edges(&self) -> ClipforgeResult<()> {
        let mut available: BTreeSet<&str> = self
            .staged_inputs
            .iter()
            .map(|s| s.file_name.as_str())
            .chain(self.generated_inputs.iter().map(|g| g.name.as_str()))
            .collect();

        for (i, step) in self.steps.iter().enumerate() {
            if let Some(missing) = step
                .input_files
                .iter()
                .find(|f| !available.contains(f.as_str()))
            {
                return Err(ClipforgeError::validation(format!(
                    "step {} ({}) reads {missing}, which is neither staged nor produced earlier",
                    i + 1,
                    step.description
                )));
            }
            available.insert(step.output_file.as_str());
        }

        match self.steps.last() {
            Some(last) if last.kind == StepKind::Encode && last.output_file == self.output_file => {
                Ok(())
            }
            _ => Err(ClipforgeError::validation(format!(
                "plan does not end with an encode producing {}",
                self.output_file
            ))),
        }
    }
}

/// How multiple clips are joined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcatMode {
    /// Concat demuxer with `-c copy`; needs matching codecs across clips.
    #[default]
    StreamCopy,
    /// Concat filter with a re-encode; tolerates mixed sources.
    Reencode,
}

/// Format of the staged mask source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskInput {
    /// SVG document; the engine rasterizes it.
    #[default]
    Svg,
    /// PNG rasterized here, for engines built without an SVG decoder.
    Png,
}

/// Planner knobs that do not change what is produced, only how.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlanOptions {
    /// Concatenation strategy.
    pub concat: ConcatMode,
    /// Mask source format.
    pub mask_input: MaskInput,
}

/// Background/overlay pairing for a PiP export. Indices refer to the clip slice given to
/// [`plan`]; the config must be in [`CoordSpace::Source`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PipComposition {
    /// Index of the screen clip; supplies video background and audio.
    pub background: usize,
    /// Index of the webcam clip.
    pub overlay: usize,
    /// Placement in background pixels.
    pub config: PipConfig,
}

impl PipComposition {
    /// Pair `background` and `overlay` under `config`.
    pub fn new(background: usize, overlay: usize, config: PipConfig) -> Self {
        Self {
            background,
            overlay,
            config,
        }
    }
}

/// Extension of a locator's last path segment, lowercased; `mp4` when there is none.
pub fn source_extension(src: &str) -> String {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

#[derive(Default)]
struct PlanBuilder {
    steps: Vec<CompositionStep>,
    generated: Vec<GeneratedInput>,
    estimate: f64,
}

impl PlanBuilder {
    fn push(
        &mut self,
        kind: StepKind,
        command: Vec<String>,
        input_files: Vec<String>,
        output_file: &str,
        description: impl Into<String>,
    ) {
        let description = description.into();
        tracing::debug!(kind = kind.as_str(), %description, command = %command.join(" "), "planned step");
        self.steps.push(CompositionStep {
            kind,
            command,
            input_files,
            output_file: output_file.to_string(),
            description,
        });
    }
}

/// Build the plan for `clips`, which must already be in timeline order.
///
/// Steps: a stream-copy trim per clip that needs one; then either mask + overlay (with `pip`)
/// or a concat (several clips); then the final encode. A `pip` whose indices do not name two
/// distinct clips is dropped with a warning and the export proceeds without it.
#[tracing::instrument(skip(clips, settings, pip, opts), fields(clips = clips.len(), pip = pip.is_some()))]
pub fn plan(
    clips: &[Clip],
    settings: &ExportSettings,
    pip: Option<&PipComposition>,
    opts: &PlanOptions,
) -> ClipforgeResult<CompositionPlan> {
    if clips.is_empty() {
        return Err(ClipforgeError::validation("no clips to export"));
    }
    for clip in clips {
        clip.validate()?;
    }
    let resolved = settings.resolve();
    let mut b = PlanBuilder::default();

    let staged: Vec<StagedInput> = clips
        .iter()
        .enumerate()
        .map(|(i, c)| StagedInput {
            clip_id: c.id.clone(),
            src: c.src.clone(),
            file_name: format!("clip_{i}.{}", source_extension(&c.src)),
        })
        .collect();

    let mut working = Vec::with_capacity(clips.len());
    for (i, (clip, input)) in clips.iter().zip(&staged).enumerate() {
        if !clip.needs_trim() {
            working.push(input.file_name.clone());
            continue;
        }
        let out = format!("processed_clip_{i}.{}", source_extension(&input.file_name));
        b.push(
            StepKind::Trim,
            trim_args(&input.file_name, clip.start_time, clip.end_time, &out),
            vec![input.file_name.clone()],
            &out,
            format!("Trim clip {}", i + 1),
        );
        b.estimate += clip.duration * TRIM_COST;
        working.push(out);
    }

    let pip = pip.filter(|p| {
        let ok = p.background != p.overlay && p.background < clips.len() && p.overlay < clips.len();
        if !ok {
            tracing::warn!(
                background = p.background,
                overlay = p.overlay,
                "PiP roles do not name two clips; exporting without overlay"
            );
        }
        ok
    });

    let (current, final_duration) = if let Some(p) = pip {
        plan_overlay(&mut b, clips, &working, p, opts)?
    } else if clips.len() > 1 {
        let ext = source_extension(&staged[0].file_name);
        let out = format!("concatenated.{ext}");
        match opts.concat {
            ConcatMode::StreamCopy => {
                b.generated.push(GeneratedInput {
                    name: CONCAT_LIST.to_string(),
                    contents: concat_list(&working).into_bytes(),
                });
                let mut inputs = working.clone();
                inputs.push(CONCAT_LIST.to_string());
                b.push(
                    StepKind::Concat,
                    concat_copy_args(CONCAT_LIST, &out),
                    inputs,
                    &out,
                    "Concatenate clips",
                );
            }
            ConcatMode::Reencode => {
                b.push(
                    StepKind::Concat,
                    concat_filter_args(&working, &out),
                    working.clone(),
                    &out,
                    "Concatenate clips",
                );
            }
        }
        let total: f64 = clips.iter().map(|c| c.duration).sum();
        b.estimate += total * CONCAT_COST;
        (out, total)
    } else {
        (working[0].clone(), clips[0].duration)
    };

    let output_file = format!("output.{}", resolved.container.extension());
    b.push(
        StepKind::Encode,
        encode_args(&current, &resolved, &output_file),
        vec![current],
        &output_file,
        "Final encoding",
    );
    b.estimate += final_duration * ENCODE_COST;

    let plan = CompositionPlan {
        steps: b.steps,
        output_file,
        estimated_secs: b.estimate.max(0.0).ceil() as u64,
        staged_inputs: staged,
        generated_inputs: b.generated,
        container: resolved.container,
    };
    plan.validate_edges()?;
    tracing::info!(
        steps = plan.steps.len(),
        estimated_secs = plan.estimated_secs,
        "composition planned"
    );
    Ok(plan)
}

fn plan_overlay(
    b: &mut PlanBuilder,
    clips: &[Clip],
    working: &[String],
    pip: &PipComposition,
    opts: &PlanOptions,
) -> ClipforgeResult<(String, f64)> {
    let cfg = &pip.config;
    cfg.validate()?;
    if cfg.space != CoordSpace::Source {
        return Err(ClipforgeError::validation(
            "PiP config must be in source pixel space for export",
        ));
    }

    let size = PixelSize {
        width: (cfg.size.width.round() as u32).max(1),
        height: (cfg.size.height.round() as u32).max(1),
    };
    let rect = OverlayRect {
        x: cfg.position.x.round() as i64,
        y: cfg.position.y.round() as i64,
        size,
    };
    // A ring wider than half the overlay erodes the whole mask.
    let max_ring = (size.width.min(size.height) / 2).max(1);
    let ring = cfg
        .border
        .as_ref()
        .filter(|border| border.width > 0.0)
        .and_then(|border| {
            parse_hex_color(&border.color).map(|rgb| RingStyle {
                rgb,
                width: (border.width.round() as u32).clamp(1, max_ring),
            })
        });

    let shape = cfg.shape_def();
    let (mask_source, contents) = match opts.mask_input {
        MaskInput::Svg => (
            MASK_SVG,
            shape
                .svg(f64::from(size.width), f64::from(size.height))
                .into_bytes(),
        ),
        MaskInput::Png => (MASK_PNG, render_mask(&shape, size)?.to_png()?),
    };
    b.generated.push(GeneratedInput {
        name: mask_source.to_string(),
        contents,
    });
    b.push(
        StepKind::Mask,
        mask_args(mask_source, size, MASK_FILE),
        vec![mask_source.to_string()],
        MASK_FILE,
        "Create PiP shape mask",
    );

    let background = &working[pip.background];
    let overlay = &working[pip.overlay];
    b.push(
        StepKind::Overlay,
        overlay_args(
            background,
            overlay,
            MASK_FILE,
            &overlay_graph(rect, ring),
            PIP_OUTPUT,
        ),
        vec![background.clone(), overlay.clone(), MASK_FILE.to_string()],
        PIP_OUTPUT,
        "Apply PiP overlay",
    );

    let longest = clips[pip.background]
        .duration
        .max(clips[pip.overlay].duration);
    b.estimate += longest * OVERLAY_COST;

    let dropped = clips.len() - 2;
    if dropped > 0 {
        tracing::warn!(dropped, "PiP export uses only the background and overlay clips");
    }
    Ok((PIP_OUTPUT.to_string(), longest))
}

#[cfg(test)]
#[path = "../../tests/unit/compose/plan.rs"]
mod tests;
