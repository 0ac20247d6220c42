use crate::{
    analysis::frame::FrameAnalysis,
    foundation::core::{Point, Size},
};

/// Distance kept between a corner candidate and the container edges.
pub const EDGE_MARGIN: f64 = 20.0;
/// Extra inset of the near-corner candidates.
pub const NEAR_CORNER_OFFSET: f64 = 30.0;

const BASE_SCORE: f64 = 100.0;
const CORNER_ZONE: f64 = 150.0;

/// Penalty coefficient and overlap-radius padding for one region kind.
#[derive(Clone, Copy, Debug, PartialEq)]
struct RegionWeight {
    coefficient: f64,
    radius_pad: f64,
}

const MOTION: RegionWeight = RegionWeight {
    coefficient: 40.0,
    radius_pad: 50.0,
};
const TEXT: RegionWeight = RegionWeight {
    coefficient: 25.0,
    radius_pad: 100.0,
};
const UI: RegionWeight = RegionWeight {
    coefficient: 50.0,
    radius_pad: 80.0,
};

/// The eight candidate top-left positions, before bounds filtering.
///
/// Order: the four corners (TL, TR, BL, BR), then their offset variants in the same order.
/// Ties during selection go to the earliest entry.
pub fn candidates(overlay: Size, container: Size) -> [Point; 8] {
    let left = EDGE_MARGIN;
    let top = EDGE_MARGIN;
    let right = container.width - overlay.width - EDGE_MARGIN;
    let bottom = container.height - overlay.height - EDGE_MARGIN;
    let o = NEAR_CORNER_OFFSET;
    [
        Point::new(left, top),
        Point::new(right, top),
        Point::new(left, bottom),
        Point::new(right, bottom),
        Point::new(left + o, top + o),
        Point::new(right - o, top + o),
        Point::new(left + o, bottom - o),
        Point::new(right - o, bottom - o),
    ]
}

/// The bottom-right corner candidate, used when nothing fits.
pub fn bottom_right(overlay: Size, container: Size) -> Point {
    Point::new(
        container.width - overlay.width - EDGE_MARGIN,
        container.height - overlay.height - EDGE_MARGIN,
    )
}

/// `true` when an overlay at `position` lies entirely inside the container.
pub fn fits(position: Point, overlay: Size, container: Size) -> bool {
    position.x >= 0.0
        && position.y >= 0.0
        && position.x + overlay.width <= container.width
        && position.y + overlay.height <= container.height
}

fn region_penalty(center: Point, regions: &[Point], overlay: Size, w: RegionWeight) -> f64 {
    let radius = overlay.width.max(overlay.height) / 2.0 + w.radius_pad;
    regions
        .iter()
        .map(|r| center.distance(*r))
        .filter(|d| *d < radius)
        .map(|d| (w.coefficient * (1.0 - d / radius)).max(0.0))
        .sum()
}

fn corner_bonus(position: Point, overlay: Size, container: Size) -> f64 {
    let near_left = position.x < CORNER_ZONE;
    let near_top = position.y < CORNER_ZONE;
    let near_right = position.x > container.width - overlay.width - CORNER_ZONE;
    let near_bottom = position.y > container.height - overlay.height - CORNER_ZONE;

    if near_right && near_bottom {
        15.0
    } else if near_left && near_bottom {
        12.0
    } else if near_right && near_top {
        8.0
    } else if near_left && near_top {
        5.0
    } else {
        0.0
    }
}

/// Score an overlay placement; higher is better and never negative.
///
/// `analysis` must already be in container coordinates.
pub fn score_position(
    position: Point,
    analysis: &FrameAnalysis,
    overlay: Size,
    container: Size,
) -> f64 {
    let center = Point::new(
        position.x + overlay.width / 2.0,
        position.y + overlay.height / 2.0,
    );

    let mut score = BASE_SCORE;
    score -= region_penalty(center, &analysis.high_motion_regions, overlay, MOTION);
    score -= region_penalty(center, &analysis.text_regions, overlay, TEXT);
    score -= region_penalty(center, &analysis.ui_hotspots, overlay, UI);

    score += corner_bonus(position, overlay, container);
    if position.x > container.width / 2.0 {
        score += 3.0;
    }

    let frame_center = Point::new(container.width / 2.0, container.height / 2.0);
    let center_radius = container.width.min(container.height) / 4.0;
    let d = center.distance(frame_center);
    if center_radius > 0.0 && d < center_radius {
        score -= 20.0 * (1.0 - d / center_radius);
    }

    score.max(0.0)
}

/// A scored placement.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoredPosition {
    /// Top-left corner of the overlay.
    pub position: Point,
    /// Score from [`score_position`].
    pub score: f64,
}

/// Score every in-bounds candidate, in candidate order.
pub fn rank_candidates(
    analysis: &FrameAnalysis,
    overlay: Size,
    container: Size,
) -> Vec<ScoredPosition> {
    candidates(overlay, container)
        .into_iter()
        .filter(|p| fits(*p, overlay, container))
        .map(|position| ScoredPosition {
            position,
            score: score_position(position, analysis, overlay, container),
        })
        .collect()
}

/// Best placement for `overlay` given an analysis already in container coordinates.
///
/// Falls back to the bottom-right corner (clamped into the container) when no candidate fits.
pub fn suggest_from_analysis(analysis: &FrameAnalysis, overlay: Size, container: Size) -> Point {
    let mut best: Option<ScoredPosition> = None;
    for c in rank_candidates(analysis, overlay, container) {
        match best {
            Some(b) if c.score <= b.score => {}
            _ => best = Some(c),
        }
    }
    match best {
        Some(b) => b.position,
        None => {
            tracing::debug!("no placement candidate fits, using bottom-right");
            constrain_to_bounds(bottom_right(overlay, container), overlay, container)
        }
    }
}

/// Default overlay size for a container: 18% of the width at 16:9, clamped.
pub fn recommended_pip_size(container: Size) -> Size {
    const ASPECT: f64 = 16.0 / 9.0;
    const MIN: f64 = 150.0;
    let max = container.width.min(container.height) * 0.3;
    let width = container.width * 0.18;
    let height = width / ASPECT;
    Size::new(
        MIN.max(max.min(width)),
        MIN.max((max / ASPECT).min(height)),
    )
}

/// Clamp a dragged overlay so it stays inside the container.
pub fn constrain_to_bounds(position: Point, overlay: Size, container: Size) -> Point {
    let max_x = (container.width - overlay.width).max(0.0);
    let max_y = (container.height - overlay.height).max(0.0);
    Point::new(position.x.clamp(0.0, max_x), position.y.clamp(0.0, max_y))
}

#[cfg(test)]
#[path = "../../tests/unit/placement/score.rs"]
mod tests;
