use rayon::prelude::*;

use crate::{
    analysis::frame::FrameBuffer,
    foundation::core::Point,
    foundation::math::{luminance, mean_abs_rgb_delta, rgb_distance},
};

/// Thresholds for the three grid heuristics, in analysis pixels and 0..=255 units.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HeuristicParams {
    /// Text-likeness cell size.
    pub text_cell: u32,
    /// Sampling stride inside a text cell.
    pub text_stride: u32,
    /// Luminance delta that counts as an edge.
    pub text_edge_delta: f64,
    /// Minimum fraction of samples that must be edges.
    pub text_edge_density: f64,
    /// Minimum average local contrast.
    pub text_min_contrast: f64,
    /// UI-hotspot cell size.
    pub ui_cell: u32,
    /// Sampling stride inside a UI cell.
    pub ui_stride: u32,
    /// Minimum mean brightness.
    pub ui_min_brightness: f64,
    /// Maximum mean colour distance from the cell mean.
    pub ui_max_variance: f64,
    /// Motion cell size.
    pub motion_cell: u32,
    /// Sampling stride inside a motion cell.
    pub motion_stride: u32,
    /// Minimum average RGB delta between frames.
    pub motion_threshold: f64,
}

impl Default for HeuristicParams {
    fn default() -> Self {
        Self {
            text_cell: 100,
            text_stride: 3,
            text_edge_delta: 50.0,
            text_edge_density: 0.15,
            text_min_contrast: 40.0,
            ui_cell: 80,
            ui_stride: 5,
            ui_min_brightness: 180.0,
            ui_max_variance: 50.0,
            motion_cell: 50,
            motion_stride: 5,
            motion_threshold: 30.0,
        }
    }
}

/// Top-left corners of every full `cell`-sized cell, row-major.
///
/// Partial cells at the right and bottom edges are skipped.
fn grid_cells(width: u32, height: u32, cell: u32) -> Vec<(u32, u32)> {
    if cell == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut y = 0;
    while y + cell < height {
        let mut x = 0;
        while x + cell < width {
            out.push((x, y));
            x += cell;
        }
        y += cell;
    }
    out
}

fn cell_center(x: u32, y: u32, cell: u32) -> Point {
    let half = f64::from(cell) / 2.0;
    Point::new(f64::from(x) + half, f64::from(y) + half)
}

fn samples(origin: u32, cell: u32, stride: u32) -> impl Iterator<Item = u32> + Clone {
    (origin..origin + cell).step_by(stride.max(1) as usize)
}

// Cells are scored in parallel; `collect` keeps row-major order.
fn scan<F>(frame: &FrameBuffer, cell: u32, flag: F) -> Vec<Point>
where
    F: Fn(u32, u32) -> bool + Sync,
{
    grid_cells(frame.width(), frame.height(), cell)
        .into_par_iter()
        .filter(|&(x, y)| flag(x, y))
        .map(|(x, y)| cell_center(x, y, cell))
        .collect()
}

/// Cells with dense, high-contrast luminance edges.
///
/// Both the edge-density and the contrast threshold must pass, so flat high-contrast blocks
/// are not reported.
pub fn text_regions(frame: &FrameBuffer, p: &HeuristicParams) -> Vec<Point> {
    let (w, h) = (frame.width(), frame.height());
    let luma = |x: u32, y: u32| {
        let [r, g, b, _] = frame.pixel(x, y);
        luminance(r, g, b)
    };

    scan(frame, p.text_cell, |x0, y0| {
        let mut edges = 0usize;
        let mut contrast = 0.0;
        let mut count = 0usize;
        for y in samples(y0, p.text_cell, p.text_stride) {
            for x in samples(x0, p.text_cell, p.text_stride) {
                if x + 1 >= w || y + 1 >= h {
                    continue;
                }
                let l = luma(x, y);
                let dx = (l - luma(x + 1, y)).abs();
                let dy = (l - luma(x, y + 1)).abs();
                if dx > p.text_edge_delta || dy > p.text_edge_delta {
                    edges += 1;
                }
                contrast += dx.max(dy);
                count += 1;
            }
        }
        if count == 0 {
            return false;
        }
        let density = edges as f64 / count as f64;
        density > p.text_edge_density && contrast / count as f64 > p.text_min_contrast
    })
}

/// Cells that are uniformly bright: a proxy for buttons and controls.
pub fn ui_hotspots(frame: &FrameBuffer, p: &HeuristicParams) -> Vec<Point> {
    scan(frame, p.ui_cell, |x0, y0| {
        let mut colors: Vec<[f64; 3]> = Vec::new();
        let mut brightness = 0.0;
        for y in samples(y0, p.ui_cell, p.ui_stride) {
            for x in samples(x0, p.ui_cell, p.ui_stride) {
                let [r, g, b, _] = frame.pixel(x, y);
                brightness += luminance(r, g, b);
                colors.push([f64::from(r), f64::from(g), f64::from(b)]);
            }
        }
        if colors.is_empty() {
            return false;
        }
        let n = colors.len() as f64;
        let mut mean = [0.0; 3];
        for c in &colors {
            mean[0] += c[0] / n;
            mean[1] += c[1] / n;
            mean[2] += c[2] / n;
        }
        let variance = colors.iter().map(|c| rgb_distance(*c, mean)).sum::<f64>() / n;
        brightness / n > p.ui_min_brightness && variance < p.ui_max_variance
    })
}

/// Cells whose average RGB change between `previous` and `current` exceeds the threshold.
///
/// Both frames must share dimensions; mismatched frames report no motion.
pub fn motion_regions(
    previous: &FrameBuffer,
    current: &FrameBuffer,
    p: &HeuristicParams,
) -> Vec<Point> {
    if previous.width() != current.width() || previous.height() != current.height() {
        return Vec::new();
    }
    scan(current, p.motion_cell, |x0, y0| {
        let mut total = 0.0;
        let mut count = 0usize;
        for y in samples(y0, p.motion_cell, p.motion_stride) {
            for x in samples(x0, p.motion_cell, p.motion_stride) {
                let [r0, g0, b0, _] = previous.pixel(x, y);
                let [r1, g1, b1, _] = current.pixel(x, y);
                total += mean_abs_rgb_delta([r0, g0, b0], [r1, g1, b1]);
                count += 1;
            }
        }
        count > 0 && total / count as f64 > p.motion_threshold
    })
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/heuristics.rs"]
mod tests;
