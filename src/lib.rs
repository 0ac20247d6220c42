//! Clipforge is the composition core of a clip-based screen recording editor.
//!
//! It turns an edited timeline of screen and webcam clips into a deterministic list of media
//! engine commands, places a shaped picture-in-picture (PiP) overlay where it hides the least
//! of the screen content, and drives an export end to end.
//!
//! # Pipeline overview
//!
//! 1. **Shape**: `ShapeKind -> ShapeGeometry` (preview clip-path, export path, SVG mask)
//! 2. **Place**: `FrameAnalysis -> Point` (corner candidates scored against UI, text and motion)
//! 3. **Plan**: `Clip[] + ExportSettings + PipComposition -> CompositionPlan`
//! 4. **Execute**: `CompositionPlan -> output file` on a [`MediaEngine`]
//! 5. **Export**: resolve sources, stage, execute, read back, clean up ([`Exporter`])
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Pure planning**: shapes, placement and planning do no I/O and are deterministic.
//! - **Engine at the edge**: every file and process interaction goes through [`MediaEngine`]
//!   and [`BlobResolver`], so tests swap in mocks.
//! - **Fail fast**: a failed step stops the plan; partial output is never returned.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(missing_docs_in_private_items)]

mod analysis;
mod compose;
mod execute;
mod export;
mod foundation;
mod pip;
mod placement;
mod shapes;
mod timeline;

pub use analysis::frame::{
    AnalyzerOpts, EncodedFrame, FrameAnalysis, FrameAnalyzer, FrameBuffer, FrameSource,
};
pub use analysis::heuristics::{HeuristicParams, motion_regions, text_regions, ui_hotspots};
pub use compose::args::{
    OverlayRect, RingStyle, TextOverlay, audio_extract_args, audio_mix_args, concat_copy_args,
    concat_filter_args, concat_list, encode_args, fade_args, flip_args, mask_args, overlay_args,
    overlay_graph, rotate_args, speed_args, text_overlay_args, trim_args, validate_argv,
};
pub use compose::plan::{
    CompositionPlan, CompositionStep, ConcatMode, GeneratedInput, MaskInput, PipComposition,
    PlanOptions, StagedInput, StepKind, plan, source_extension,
};
pub use compose::settings::{
    Container, EXPORT_PRESETS, ExportPreset, ExportSettings, ResolvedSettings,
};
pub use execute::cancel::{CancelHandle, CancelToken, cancel_pair};
pub use execute::engine::MediaEngine;
pub use execute::native::{NativeFfmpegEngine, ffmpeg_available};
pub use execute::runner::{ProgressFn, StepProgress, execute_plan};
pub use export::config::{ExportConfig, ProgressBands};
pub use export::messages::user_message;
pub use export::orchestrator::{
    ExportArtifact, ExportOutcome, ExportProgress, ExportProgressFn, ExportRequest, ExportState,
    Exporter, output_file_name,
};
pub use export::sources::{BlobResolver, DefaultResolver, SourceLocator};
pub use foundation::core::{Affine, BezPath, PixelSize, Point, Rect, Size, Vec2, fmt_num, scale_axis};
pub use foundation::error::{ClipforgeError, ClipforgeResult};
pub use foundation::math::{luminance, mean_abs_rgb_delta, parse_hex_color, rgb_distance};
pub use pip::config::{Border, CoordSpace, PipConfig, Shadow};
pub use pip::state::PipState;
pub use placement::score::{
    EDGE_MARGIN, NEAR_CORNER_OFFSET, ScoredPosition, bottom_right, candidates,
    constrain_to_bounds, fits, rank_candidates, recommended_pip_size, score_position,
    suggest_from_analysis,
};
pub use placement::suggest::{PositionSuggester, SuggestOpts, suggest};
pub use shapes::geometry::{
    ShapeDef, ShapeGeometry, ShapeKind, css_clip_path, ngon_vertices, path_for, svg_for,
};
pub use shapes::mask::{MaskBitmap, render_mask};
pub use timeline::classify::{Classification, InferenceTier, PipRoles, classify_clips, pip_roles};
pub use timeline::clip::{Clip, ClipType};
pub use timeline::edit::{
    MERGE_TOLERANCE, delete_clip, duplicate_clip, merge_clips, move_to_track, renumber,
    reorder_clips, replace_clip, snap_to_grid, sort_timeline, split_clip, trim_clip,
};
pub use timeline::session::{ClipPatch, ClipStore, EditorSession};
pub use timeline::upload::{UploadEvent, UploadState, UploadTracker};
