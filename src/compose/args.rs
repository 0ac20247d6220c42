//! Argument vectors for the media engine's command grammar.
//!
//! Every number is written through [`fmt_num`] so identical inputs give identical argv.

use crate::{
    compose::settings::ResolvedSettings,
    foundation::core::{PixelSize, fmt_num},
    foundation::error::{ClipforgeError, ClipforgeResult},
};

fn argv<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

/// Stream-copy cut of `input` to `[start, end)`; without `end` the cut runs to the natural end.
pub fn trim_args(input: &str, start: f64, end: Option<f64>, output: &str) -> Vec<String> {
    let mut args = argv(["-i", input, "-ss"]);
    args.push(fmt_num(start));
    if let Some(end) = end {
        args.push("-to".to_string());
        args.push(fmt_num(end));
    }
    args.extend(argv(["-c", "copy", output]));
    args
}

/// Rasterize the mask source to a single grayscale PNG frame of `size`.
pub fn mask_args(source: &str, size: PixelSize, output: &str) -> Vec<String> {
    let filter = format!("scale={}:{},format=gray", size.width, size.height);
    argv([
        "-i", source, "-vf", filter.as_str(), "-frames:v", "1", "-c:v", "png", output,
    ])
}

/// Overlay placement in background pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayRect {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Scaled overlay size.
    pub size: PixelSize,
}

/// Border ring drawn along the mask edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingStyle {
    /// `[r, g, b]`.
    pub rgb: [u8; 3],
    /// Ring thickness in pixels, at least 1.
    pub width: u32,
}

/// Filter graph for the masked overlay. Inputs: `0` background, `1` overlay, `2` mask.
///
/// With a ring, the mask is split: one copy gates the overlay, the other is eroded `width`
/// times and subtracted from itself to leave the boundary band, which then gates a solid
/// colour source overlaid at the same position. The result is labelled `[outv]`.
pub fn overlay_graph(rect: OverlayRect, ring: Option<RingStyle>) -> String {
    let OverlayRect { x, y, size } = rect;
    let (w, h) = (size.width, size.height);
    let mut chains = vec![format!("[1:v]scale={w}:{h},format=rgba[pip_scaled]")];

    match ring {
        None => {
            chains.push(format!("[2:v]scale={w}:{h},format=gray[mask]"));
            chains.push("[pip_scaled][mask]alphamerge[masked_pip]".to_string());
            chains.push(format!("[0:v][masked_pip]overlay={x}:{y}[outv]"));
        }
        Some(RingStyle { rgb: [r, g, b], width }) => {
            let erosions = vec!["erosion"; width.max(1) as usize].join(",");
            chains.push(format!(
                "[2:v]scale={w}:{h},format=gray,split=3[mask][ring_outer][ring_src]"
            ));
            chains.push(format!("[ring_src]{erosions}[ring_inner]"));
            chains.push(
                "[ring_outer][ring_inner]blend=all_mode=difference[ring]".to_string(),
            );
            chains.push("[pip_scaled][mask]alphamerge[masked_pip]".to_string());
            chains.push(format!("[0:v][masked_pip]overlay={x}:{y}[base]"));
            chains.push(format!(
                "color=c=0x{r:02x}{g:02x}{b:02x}:s={w}x{h},format=rgba[ring_fill]"
            ));
            chains.push("[ring_fill][ring]alphamerge[border]".to_string());
            chains.push(format!("[base][border]overlay={x}:{y}:shortest=1[outv]"));
        }
    }
    chains.join(";")
}

/// Masked overlay of `overlay` onto `background`; audio from the background only.
pub fn overlay_args(
    background: &str,
    overlay: &str,
    mask: &str,
    graph: &str,
    output: &str,
) -> Vec<String> {
    argv([
        "-i",
        background,
        "-i",
        overlay,
        "-loop",
        "1",
        "-i",
        mask,
        "-filter_complex",
        graph,
        "-map",
        "[outv]",
        "-map",
        "0:a?",
        "-c:v",
        "libx264",
        "-preset",
        "veryfast",
        "-crf",
        "18",
        "-c:a",
        "copy",
        "-shortest",
        output,
    ])
}

/// Contents of a concat-demuxer list file naming `files` in order.
pub fn concat_list(files: &[String]) -> String {
    files
        .iter()
        .map(|f| format!("file '{}'\n", f.replace('\'', r"'\''")))
        .collect()
}

/// Stream-copy concatenation through the concat demuxer.
pub fn concat_copy_args(list_file: &str, output: &str) -> Vec<String> {
    argv([
        "-f", "concat", "-safe", "0", "-i", list_file, "-c", "copy", output,
    ])
}

/// Re-encoding concatenation through the concat filter; each input is passed with `-i`.
pub fn concat_filter_args(inputs: &[String], output: &str) -> Vec<String> {
    let mut args = Vec::with_capacity(inputs.len() * 2 + 12);
    let mut pads = String::new();
    for (i, input) in inputs.iter().enumerate() {
        args.push("-i".to_string());
        args.push(input.clone());
        pads.push_str(&format!("[{i}:v][{i}:a]"));
    }
    let graph = format!("{pads}concat=n={}:v=1:a=1[outv][outa]", inputs.len());
    args.extend(argv([
        "-filter_complex",
        graph.as_str(),
        "-map",
        "[outv]",
        "-map",
        "[outa]",
        "-c:v",
        "libx264",
        "-preset",
        "veryfast",
        "-crf",
        "18",
        "-c:a",
        "aac",
        output,
    ]));
    args
}

/// Final encode to the requested container, size and bitrate.
pub fn encode_args(input: &str, settings: &ResolvedSettings, output: &str) -> Vec<String> {
    let container = settings.container;
    let mut args = argv(["-i", input, "-c:v", container.video_codec()]);
    if let Some(preset) = &settings.encoder_preset {
        args.push("-preset".to_string());
        args.push(preset.clone());
    }
    if let Some(size) = settings.frame_size {
        args.push("-s".to_string());
        args.push(size.to_arg());
    }
    args.extend(argv([
        "-b:v",
        settings.video_bitrate,
        "-c:a",
        container.audio_codec(),
        "-b:a",
        settings.audio_bitrate,
        output,
    ]));
    args
}

/// Audio-only copy of `input`, re-encoded to AAC, optionally cut to `[start, start + duration)`.
pub fn audio_extract_args(
    input: &str,
    start: Option<f64>,
    duration: Option<f64>,
    output: &str,
) -> Vec<String> {
    let mut args = argv(["-i", input]);
    if let Some(start) = start {
        args.push("-ss".to_string());
        args.push(fmt_num(start));
    }
    if let Some(duration) = duration {
        args.push("-t".to_string());
        args.push(fmt_num(duration));
    }
    args.extend(argv(["-vn", "-c:a", "aac", output]));
    args
}

/// Mix the first audio stream of every input into one AAC track.
pub fn audio_mix_args(inputs: &[String], output: &str) -> ClipforgeResult<Vec<String>> {
    if inputs.is_empty() {
        return Err(ClipforgeError::validation("audio mix needs at least one input"));
    }
    let mut args = Vec::with_capacity(inputs.len() * 2 + 7);
    let mut pads = String::new();
    for (i, input) in inputs.iter().enumerate() {
        args.push("-i".to_string());
        args.push(input.clone());
        pads.push_str(&format!("[{i}:a]"));
    }
    let graph = format!("{pads}amix=inputs={}[outa]", inputs.len());
    args.extend(argv([
        "-filter_complex",
        graph.as_str(),
        "-map",
        "[outa]",
        "-c:a",
        "aac",
        output,
    ]));
    Ok(args)
}

/// `atempo` only takes factors in `[0.5, 2]`; larger changes are chained.
fn atempo_chain(mut speed: f64) -> String {
    let mut stages = Vec::new();
    while speed > 2.0 {
        stages.push("atempo=2".to_string());
        speed /= 2.0;
    }
    while speed < 0.5 {
        stages.push("atempo=0.5".to_string());
        speed /= 0.5;
    }
    stages.push(format!("atempo={}", fmt_num(speed)));
    stages.join(",")
}

/// Play `input` at `speed` times its rate, video and audio together.
pub fn speed_args(input: &str, speed: f64, output: &str) -> ClipforgeResult<Vec<String>> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(ClipforgeError::validation(format!(
            "speed must be a positive number, got {speed}"
        )));
    }
    let video = format!("setpts=PTS/{}", fmt_num(speed));
    let audio = atempo_chain(speed);
    Ok(argv([
        "-i",
        input,
        "-filter:v",
        video.as_str(),
        "-filter:a",
        audio.as_str(),
        output,
    ]))
}

/// Caption burned into the video by [`text_overlay_args`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextOverlay {
    /// Literal text; no `%{...}` expansion is applied.
    pub text: String,
    /// Left edge, pixels.
    pub x: f64,
    /// Top edge, pixels.
    pub y: f64,
    /// Font size, pixels.
    #[serde(default = "TextOverlay::default_font_size")]
    pub font_size: u32,
    /// Colour name or `#rrggbb`.
    #[serde(default = "TextOverlay::default_font_color")]
    pub font_color: String,
}

impl TextOverlay {
    fn default_font_size() -> u32 {
        24
    }

    fn default_font_color() -> String {
        "white".to_string()
    }

    /// White 24 px text at `(x, y)`.
    pub fn new(text: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            font_size: Self::default_font_size(),
            font_color: Self::default_font_color(),
        }
    }
}

fn escape_with(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a filter option value, then the filter graph around it.
fn escape_filter_value(value: &str) -> String {
    let option = escape_with(value, &['\\', '\'', ':']);
    escape_with(&option, &['\\', '\'', '[', ']', ',', ';'])
}

/// Burn `overlay` into `input` with `drawtext`.
pub fn text_overlay_args(input: &str, overlay: &TextOverlay, output: &str) -> Vec<String> {
    let filter = format!(
        "drawtext=text={}:x={}:y={}:fontsize={}:fontcolor={}:expansion=none",
        escape_filter_value(&overlay.text),
        fmt_num(overlay.x),
        fmt_num(overlay.y),
        overlay.font_size,
        escape_filter_value(&overlay.font_color),
    );
    argv(["-i", input, "-vf", filter.as_str(), output])
}

/// Rotate the picture by `degrees`, clockwise, inside the original frame.
pub fn rotate_args(input: &str, degrees: f64, output: &str) -> Vec<String> {
    let filter = format!("rotate={}*PI/180", fmt_num(degrees));
    argv(["-i", input, "-vf", filter.as_str(), output])
}

/// Mirror the picture. At least one direction is required.
pub fn flip_args(
    input: &str,
    horizontal: bool,
    vertical: bool,
    output: &str,
) -> ClipforgeResult<Vec<String>> {
    let filters: Vec<&str> = [(horizontal, "hflip"), (vertical, "vflip")]
        .into_iter()
        .filter_map(|(on, f)| on.then_some(f))
        .collect();
    if filters.is_empty() {
        return Err(ClipforgeError::validation(
            "flip needs a horizontal or vertical direction",
        ));
    }
    let filter = filters.join(",");
    Ok(argv(["-i", input, "-vf", filter.as_str(), output]))
}

/// Fade in from black over `fade_in` seconds and out over the last `fade_out` seconds of a
/// `duration`-second input. A zero length disables that fade; at least one is required.
pub fn fade_args(
    input: &str,
    fade_in: f64,
    fade_out: f64,
    duration: f64,
    output: &str,
) -> ClipforgeResult<Vec<String>> {
    let valid = |v: f64| v.is_finite() && v >= 0.0;
    if !valid(fade_in) || !valid(fade_out) || !valid(duration) {
        return Err(ClipforgeError::validation(format!(
            "fade lengths must be non-negative, got in={fade_in} out={fade_out} over {duration}"
        )));
    }
    if fade_in + fade_out > duration {
        return Err(ClipforgeError::validation(format!(
            "fades of {fade_in}s and {fade_out}s do not fit in {duration}s"
        )));
    }
    let mut filters = Vec::new();
    if fade_in > 0.0 {
        filters.push(format!("fade=t=in:st=0:d={}", fmt_num(fade_in)));
    }
    if fade_out > 0.0 {
        filters.push(format!(
            "fade=t=out:st={}:d={}",
            fmt_num(duration - fade_out),
            fmt_num(fade_out)
        ));
    }
    if filters.is_empty() {
        return Err(ClipforgeError::validation("fade needs a fade-in or fade-out length"));
    }
    let filter = filters.join(",");
    Ok(argv(["-i", input, "-vf", filter.as_str(), output]))
}

/// Reject argv without an input or with a trailing flag instead of an output name.
pub fn validate_argv(args: &[String]) -> ClipforgeResult<()> {
    if args.is_empty() {
        return Err(ClipforgeError::validation("command is empty"));
    }
    if !args.iter().any(|a| a == "-i") {
        return Err(ClipforgeError::validation("command has no input file"));
    }
    match args.last() {
        Some(last) if !last.is_empty() && !last.starts_with('-') => Ok(()),
        _ => Err(ClipforgeError::validation("command has no output file")),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/args.rs"]
mod tests;
