use anyhow::Context;
use image::RgbaImage;
use image::imageops::{FilterType, resize};

use crate::{
    analysis::heuristics::{self, HeuristicParams},
    foundation::core::Point,
    foundation::error::{ClipforgeError, ClipforgeResult},
};

/// An RGBA8 (straight alpha) video frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    image: RgbaImage,
}

impl FrameBuffer {
    /// Wrap raw RGBA8 bytes; `data.len()` must be `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> ClipforgeResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(ClipforgeError::validation(format!(
                "frame buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        let image = RgbaImage::from_raw(width, height, data)
            .ok_or_else(|| ClipforgeError::validation("frame buffer does not match its size"))?;
        Ok(Self { image })
    }

    /// Wrap an already-decoded image.
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Decode an encoded still (PNG, JPEG) into a frame.
    pub fn decode(bytes: &[u8]) -> ClipforgeResult<Self> {
        let img = image::load_from_memory(bytes).context("decode frame image")?;
        Ok(Self {
            image: img.to_rgba8(),
        })
    }

    /// A frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, image::Rgba(rgba)),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// RGBA at `(x, y)`. Panics when out of bounds, like [`RgbaImage::get_pixel`].
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// Mutable access to the underlying image.
    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    /// Resample to `floor(dim * scale)` on each axis (at least 1 px).
    pub fn downscaled(&self, scale: f64) -> Self {
        let w = ((f64::from(self.width()) * scale).floor() as u32).max(1);
        let h = ((f64::from(self.height()) * scale).floor() as u32).max(1);
        Self {
            image: resize(&self.image, w, h, FilterType::Triangle),
        }
    }
}

/// Something that can hand out the current visual frame.
pub trait FrameSource {
    /// Read the frame to analyse.
    fn read_frame(&mut self) -> ClipforgeResult<FrameBuffer>;
}

impl FrameSource for FrameBuffer {
    fn read_frame(&mut self) -> ClipforgeResult<FrameBuffer> {
        Ok(self.clone())
    }
}

/// A frame source backed by an encoded still image (e.g. a captured thumbnail).
#[derive(Clone, Debug)]
pub struct EncodedFrame {
    bytes: Vec<u8>,
}

impl EncodedFrame {
    /// Wrap PNG/JPEG bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl FrameSource for EncodedFrame {
    fn read_frame(&mut self) -> ClipforgeResult<FrameBuffer> {
        FrameBuffer::decode(&self.bytes)
    }
}

/// Regions a PiP overlay should avoid, in full-frame coordinates.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameAnalysis {
    /// Centres of cells that changed since the previous frame.
    pub high_motion_regions: Vec<Point>,
    /// Centres of text-like cells.
    pub text_regions: Vec<Point>,
    /// Centres of uniform bright cells.
    pub ui_hotspots: Vec<Point>,
}

impl FrameAnalysis {
    /// `true` when no region of any kind was found.
    pub fn is_empty(&self) -> bool {
        self.high_motion_regions.is_empty() && self.text_regions.is_empty() && self.ui_hotspots.is_empty()
    }

    /// Multiply every coordinate by `(sx, sy)`.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        let map = |v: &[Point]| -> Vec<Point> {
            v.iter().map(|p| Point::new(p.x * sx, p.y * sy)).collect()
        };
        Self {
            high_motion_regions: map(&self.high_motion_regions),
            text_regions: map(&self.text_regions),
            ui_hotspots: map(&self.ui_hotspots),
        }
    }
}

/// Options for [`FrameAnalyzer`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalyzerOpts {
    /// Analyse a downscaled copy of the frame.
    pub lightweight: bool,
    /// Linear scale used when `lightweight` is set.
    pub lightweight_scale: f64,
    /// Grid heuristic thresholds.
    pub params: HeuristicParams,
}

impl Default for AnalyzerOpts {
    fn default() -> Self {
        Self {
            lightweight: true,
            lightweight_scale: 0.25,
            params: HeuristicParams::default(),
        }
    }
}

/// Frame analyzer. Keeps the previously analysed frame so motion can be measured.
#[derive(Clone, Debug, Default)]
pub struct FrameAnalyzer {
    opts: AnalyzerOpts,
    previous: Option<FrameBuffer>,
}

impl FrameAnalyzer {
    /// Build an analyzer with `opts`.
    pub fn new(opts: AnalyzerOpts) -> Self {
        Self {
            opts,
            previous: None,
        }
    }

    /// Active options.
    pub fn opts(&self) -> &AnalyzerOpts {
        &self.opts
    }

    /// Forget the cached previous frame.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Analyse one frame. Coordinates are returned in `frame`'s own resolution.
    #[tracing::instrument(skip(self, frame), fields(w = frame.width(), h = frame.height()))]
    pub fn analyze(&mut self, frame: &FrameBuffer) -> FrameAnalysis {
        let scale = if self.opts.lightweight && self.opts.lightweight_scale > 0.0 {
            self.opts.lightweight_scale.min(1.0)
        } else {
            1.0
        };
        let work = if scale < 1.0 {
            frame.downscaled(scale)
        } else {
            frame.clone()
        };

        let p = &self.opts.params;
        let text_regions = heuristics::text_regions(&work, p);
        let ui_hotspots = heuristics::ui_hotspots(&work, p);
        let high_motion_regions = match &self.previous {
            Some(prev) => heuristics::motion_regions(prev, &work, p),
            None => Vec::new(),
        };
        self.previous = Some(work);

        let analysis = FrameAnalysis {
            high_motion_regions,
            text_regions,
            ui_hotspots,
        };
        tracing::debug!(
            motion = analysis.high_motion_regions.len(),
            text = analysis.text_regions.len(),
            ui = analysis.ui_hotspots.len(),
            "frame analysed"
        );
        if scale < 1.0 {
            analysis.scaled(1.0 / scale, 1.0 / scale)
        } else {
            analysis
        }
    }

    /// Read a frame from `source` and analyse it; read failures yield an empty analysis.
    pub fn analyze_source(&mut self, source: &mut dyn FrameSource) -> FrameAnalysis {
        match source.read_frame() {
            Ok(frame) => self.analyze(&frame),
            Err(err) => {
                tracing::warn!(%err, "frame read failed, analysis skipped");
                FrameAnalysis::default()
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/frame.rs"]
mod tests;
