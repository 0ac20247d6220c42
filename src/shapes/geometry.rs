use std::f64::consts::PI;
use std::fmt::Write as _;

use kurbo::{PathEl, Shape as _};

use crate::foundation::core::{Affine, BezPath, Point, Rect, fmt_num};

/// Mask shapes an overlay can be clipped to.
///
/// Parsing is total: unknown names fall back to [`ShapeKind::Circle`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShapeKind {
    /// Circle of radius `min(w, h) / 2`.
    #[default]
    Circle,
    /// The full bounding box.
    Square,
    /// Fixed cubic heart outline.
    Heart,
    /// Regular hexagon.
    Hexagon,
    /// Five-pointed star.
    Star,
    /// Rhombus touching the box edge midpoints.
    Diamond,
    /// Apex top-centre, base on the bottom edge.
    Triangle,
    /// Regular pentagon.
    Pentagon,
    /// Regular octagon.
    Octagon,
    /// Ellipse filling the box.
    Ellipse,
    /// Rounded rectangle.
    Rounded,
    /// User-supplied path, see [`ShapeDef::custom_path`].
    Custom,
}

impl ShapeKind {
    /// Every shape, in declaration order.
    pub const ALL: [ShapeKind; 12] = [
        ShapeKind::Circle,
        ShapeKind::Square,
        ShapeKind::Heart,
        ShapeKind::Hexagon,
        ShapeKind::Star,
        ShapeKind::Diamond,
        ShapeKind::Triangle,
        ShapeKind::Pentagon,
        ShapeKind::Octagon,
        ShapeKind::Ellipse,
        ShapeKind::Rounded,
        ShapeKind::Custom,
    ];

    /// Parse a shape identifier, case-insensitively, accepting the common aliases.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "circle" => Self::Circle,
            "square" | "rect" | "rectangle" => Self::Square,
            "heart" => Self::Heart,
            "hexagon" | "hex" => Self::Hexagon,
            "star" => Self::Star,
            "diamond" => Self::Diamond,
            "triangle" => Self::Triangle,
            "pentagon" => Self::Pentagon,
            "octagon" => Self::Octagon,
            "ellipse" | "oval" => Self::Ellipse,
            "rounded" | "rounded-rect" | "rounded_rect" => Self::Rounded,
            "custom" => Self::Custom,
            other => {
                tracing::debug!(shape = other, "unknown shape, using circle");
                Self::Circle
            }
        }
    }

    /// Canonical lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Square => "square",
            Self::Heart => "heart",
            Self::Hexagon => "hexagon",
            Self::Star => "star",
            Self::Diamond => "diamond",
            Self::Triangle => "triangle",
            Self::Pentagon => "pentagon",
            Self::Octagon => "octagon",
            Self::Ellipse => "ellipse",
            Self::Rounded => "rounded",
            Self::Custom => "custom",
        }
    }
}

impl From<String> for ShapeKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ShapeKind> for String {
    fn from(value: ShapeKind) -> Self {
        value.as_str().to_string()
    }
}

/// A shape plus the user path that backs [`ShapeKind::Custom`].
///
/// Custom paths are SVG path data in a 100x100 unit box.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShapeDef {
    /// Shape identifier.
    pub kind: ShapeKind,
    /// Unit-box path data, only read for [`ShapeKind::Custom`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
}

impl From<ShapeKind> for ShapeDef {
    fn from(kind: ShapeKind) -> Self {
        Self {
            kind,
            custom_path: None,
        }
    }
}

/// Parametric outline of a shape inside a bounding box.
///
/// Every output form (absolute path, SVG document, CSS clip-path, raster mask) is derived from
/// this value, so preview and export agree.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeGeometry {
    /// Axis-aligned ellipse; circles have `rx == ry`.
    Ellipse {
        /// Centre point.
        center: Point,
        /// Horizontal radius.
        rx: f64,
        /// Vertical radius.
        ry: f64,
    },
    /// Closed polygon, vertices in drawing order.
    Polygon(Vec<Point>),
    /// Rectangle with uniformly rounded corners.
    RoundedRect {
        /// Outer box.
        rect: Rect,
        /// Corner radius.
        radius: f64,
    },
    /// Arbitrary closed outline (heart, custom).
    Curve(BezPath),
}

const UNIT: f64 = 100.0;
const STAR_INNER_RATIO: f64 = 0.4;
const ROUNDED_RADIUS_RATIO: f64 = 0.2;

// Heart outline in a 100x100 box: start point then six cubic segments.
const HEART_START: (f64, f64) = (50.0, 20.0);
const HEART_CURVES: [[(f64, f64); 3]; 6] = [
    [(50.0, 20.0), (30.0, 5.0), (20.0, 15.0)],
    [(10.0, 25.0), (10.0, 40.0), (20.0, 50.0)],
    [(30.0, 60.0), (50.0, 80.0), (50.0, 80.0)],
    [(50.0, 80.0), (70.0, 60.0), (80.0, 50.0)],
    [(90.0, 40.0), (90.0, 25.0), (80.0, 15.0)],
    [(70.0, 5.0), (50.0, 20.0), (50.0, 20.0)],
];

/// Vertices of an `n`-gon: vertex `i` sits at angle `i * 2π/n - π/2`.
pub fn ngon_vertices(n: usize, center: Point, rx: f64, ry: f64) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let a = (i as f64) * 2.0 * PI / (n as f64) - PI / 2.0;
            Point::new(center.x + rx * a.cos(), center.y + ry * a.sin())
        })
        .collect()
}

fn star_vertices(center: Point, outer: f64) -> Vec<Point> {
    let inner = outer * STAR_INNER_RATIO;
    (0..10)
        .map(|i| {
            let r = if i % 2 == 0 { outer } else { inner };
            let a = (i as f64) * PI / 5.0 - PI / 2.0;
            Point::new(center.x + r * a.cos(), center.y + r * a.sin())
        })
        .collect()
}

fn unit_box_to(rect: Rect) -> Affine {
    Affine::translate((rect.x0, rect.y0))
        * Affine::scale_non_uniform(rect.width() / UNIT, rect.height() / UNIT)
}

fn heart_path(rect: Rect) -> BezPath {
    let mut p = BezPath::new();
    p.move_to(HEART_START);
    for [c1, c2, end] in HEART_CURVES {
        p.curve_to(c1, c2, end);
    }
    p.close_path();
    p.apply_affine(unit_box_to(rect));
    p
}

fn custom_path(data: Option<&str>, rect: Rect) -> Option<BezPath> {
    let data = data?.trim();
    if data.is_empty() {
        return None;
    }
    match BezPath::from_svg(data) {
        Ok(mut p) if !p.elements().is_empty() => {
            p.apply_affine(unit_box_to(rect));
            Some(p)
        }
        Ok(_) => None,
        Err(err) => {
            tracing::warn!(%err, "custom shape path does not parse, using circle");
            None
        }
    }
}

impl ShapeGeometry {
    /// Resolve a shape into `rect`.
    pub fn new(shape: &ShapeDef, rect: Rect) -> Self {
        let rect = rect.abs();
        let center = rect.center();
        let hw = rect.width() / 2.0;
        let hh = rect.height() / 2.0;
        let r = hw.min(hh);

        match shape.kind {
            ShapeKind::Circle => Self::Ellipse { center, rx: r, ry: r },
            ShapeKind::Ellipse => Self::Ellipse {
                center,
                rx: hw,
                ry: hh,
            },
            ShapeKind::Square => Self::Polygon(vec![
                Point::new(rect.x0, rect.y0),
                Point::new(rect.x1, rect.y0),
                Point::new(rect.x1, rect.y1),
                Point::new(rect.x0, rect.y1),
            ]),
            ShapeKind::Diamond => Self::Polygon(ngon_vertices(4, center, hw, hh)),
            ShapeKind::Triangle => Self::Polygon(vec![
                Point::new(center.x, rect.y0),
                Point::new(rect.x1, rect.y1),
                Point::new(rect.x0, rect.y1),
            ]),
            ShapeKind::Pentagon => Self::Polygon(ngon_vertices(5, center, r, r)),
            ShapeKind::Hexagon => Self::Polygon(ngon_vertices(6, center, r, r)),
            ShapeKind::Octagon => Self::Polygon(ngon_vertices(8, center, r, r)),
            ShapeKind::Star => Self::Polygon(star_vertices(center, r)),
            ShapeKind::Heart => Self::Curve(heart_path(rect)),
            ShapeKind::Rounded => Self::RoundedRect {
                rect,
                radius: ROUNDED_RADIUS_RATIO * rect.width().min(rect.height()),
            },
            ShapeKind::Custom => match custom_path(shape.custom_path.as_deref(), rect) {
                Some(p) => Self::Curve(p),
                None => Self::Ellipse { center, rx: r, ry: r },
            },
        }
    }

    /// Absolute path data (SVG / canvas `Path2D` syntax).
    pub fn to_path_string(&self) -> String {
        let mut out = String::new();
        match self {
            Self::Ellipse { center, rx, ry } => {
                let (rx_s, ry_s) = (fmt_num(*rx), fmt_num(*ry));
                let left = fmt_num(center.x - rx);
                let right = fmt_num(center.x + rx);
                let cy = fmt_num(center.y);
                let _ = write!(
                    out,
                    "M {left},{cy} A {rx_s},{ry_s} 0 1,0 {right},{cy} A {rx_s},{ry_s} 0 1,0 {left},{cy} Z"
                );
            }
            Self::Polygon(points) => {
                for (i, p) in points.iter().enumerate() {
                    let cmd = if i == 0 { "M" } else { " L" };
                    let _ = write!(out, "{cmd} {},{}", fmt_num(p.x), fmt_num(p.y));
                }
                out.push_str(" Z");
            }
            Self::RoundedRect { rect, radius } => {
                let r = radius.min(rect.width() / 2.0).min(rect.height() / 2.0);
                let rs = fmt_num(r);
                let f = fmt_num;
                let _ = write!(
                    out,
                    "M {},{} H {} A {rs},{rs} 0 0,1 {},{} V {} A {rs},{rs} 0 0,1 {},{} H {} A {rs},{rs} 0 0,1 {},{} V {} A {rs},{rs} 0 0,1 {},{} Z",
                    f(rect.x0 + r),
                    f(rect.y0),
                    f(rect.x1 - r),
                    f(rect.x1),
                    f(rect.y0 + r),
                    f(rect.y1 - r),
                    f(rect.x1 - r),
                    f(rect.y1),
                    f(rect.x0 + r),
                    f(rect.x0),
                    f(rect.y1 - r),
                    f(rect.y0 + r),
                    f(rect.x0 + r),
                    f(rect.y0),
                );
            }
            Self::Curve(path) => {
                let pt = |p: Point| format!("{},{}", fmt_num(p.x), fmt_num(p.y));
                let parts: Vec<String> = path
                    .elements()
                    .iter()
                    .map(|el| match *el {
                        PathEl::MoveTo(p) => format!("M {}", pt(p)),
                        PathEl::LineTo(p) => format!("L {}", pt(p)),
                        PathEl::QuadTo(a, p) => format!("Q {} {}", pt(a), pt(p)),
                        PathEl::CurveTo(a, b, p) => format!("C {} {} {}", pt(a), pt(b), pt(p)),
                        PathEl::ClosePath => "Z".to_string(),
                    })
                    .collect();
                out = parts.join(" ");
            }
        }
        out
    }

    /// CSS `clip-path` value for an element whose box is `(0, 0, width, height)`.
    ///
    /// The geometry must have been resolved against that same local box.
    pub fn to_css_clip_path(&self, width: f64, height: f64) -> String {
        let pct = |v: f64, extent: f64| {
            if extent > 0.0 {
                format!("{}%", fmt_num(v / extent * 100.0))
            } else {
                "0%".to_string()
            }
        };
        match self {
            Self::Ellipse { center, rx, ry } if (rx - ry).abs() < 1e-9 => format!(
                "circle({}px at {} {})",
                fmt_num(*rx),
                pct(center.x, width),
                pct(center.y, height)
            ),
            Self::Ellipse { center, rx, ry } => format!(
                "ellipse({} {} at {} {})",
                pct(*rx, width),
                pct(*ry, height),
                pct(center.x, width),
                pct(center.y, height)
            ),
            Self::Polygon(points) => {
                let parts: Vec<String> = points
                    .iter()
                    .map(|p| format!("{} {}", pct(p.x, width), pct(p.y, height)))
                    .collect();
                format!("polygon({})", parts.join(", "))
            }
            Self::RoundedRect { radius, .. } => format!("inset(0 round {}px)", fmt_num(*radius)),
            Self::Curve(_) => format!("path('{}')", self.to_path_string()),
        }
    }

    /// Outline as a kurbo path, used for rasterization and hit tests.
    pub fn to_bez_path(&self) -> BezPath {
        const TOLERANCE: f64 = 0.1;
        match self {
            Self::Ellipse { center, rx, ry } => {
                kurbo::Ellipse::new(*center, (*rx, *ry), 0.0).to_path(TOLERANCE)
            }
            Self::Polygon(points) => {
                let mut p = BezPath::new();
                for (i, v) in points.iter().enumerate() {
                    if i == 0 {
                        p.move_to(*v);
                    } else {
                        p.line_to(*v);
                    }
                }
                p.close_path();
                p
            }
            Self::RoundedRect { rect, radius } => {
                kurbo::RoundedRect::from_rect(*rect, *radius).to_path(TOLERANCE)
            }
            Self::Curve(p) => p.clone(),
        }
    }

    /// `true` when `point` lies inside the outline.
    pub fn contains(&self, point: Point) -> bool {
        match self {
            Self::Ellipse { center, rx, ry } => {
                if *rx <= 0.0 || *ry <= 0.0 {
                    return false;
                }
                let dx = (point.x - center.x) / rx;
                let dy = (point.y - center.y) / ry;
                dx * dx + dy * dy <= 1.0
            }
            _ => self.to_bez_path().contains(point),
        }
    }
}

impl ShapeDef {
    /// Resolve this shape into the box `(x, y, width, height)`.
    pub fn geometry(&self, x: f64, y: f64, width: f64, height: f64) -> ShapeGeometry {
        ShapeGeometry::new(self, Rect::new(x, y, x + width, y + height))
    }

    /// Absolute path data for the box `(x, y, width, height)`.
    pub fn path(&self, x: f64, y: f64, width: f64, height: f64) -> String {
        self.geometry(x, y, width, height).to_path_string()
    }

    /// Standalone SVG mask document: the shape in white on black, `viewBox="0 0 w h"`.
    pub fn svg(&self, width: f64, height: f64) -> String {
        let (w, h) = (fmt_num(width), fmt_num(height));
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\"><rect width=\"{w}\" height=\"{h}\" fill=\"black\"/><path d=\"{}\" fill=\"white\"/></svg>",
            self.path(0.0, 0.0, width, height)
        )
    }

    /// CSS clip-path for a preview element of `width` x `height` pixels.
    pub fn css_clip_path(&self, width: f64, height: f64) -> String {
        self.geometry(0.0, 0.0, width, height)
            .to_css_clip_path(width, height)
    }
}

/// Absolute path data for `shape` inside `(x, y, width, height)`.
pub fn path_for(shape: ShapeKind, x: f64, y: f64, width: f64, height: f64) -> String {
    ShapeDef::from(shape).path(x, y, width, height)
}

/// Standalone SVG mask document for `shape` at `width` x `height`.
pub fn svg_for(shape: ShapeKind, width: f64, height: f64) -> String {
    ShapeDef::from(shape).svg(width, height)
}

/// CSS clip-path for `shape` on a `width` x `height` preview element.
pub fn css_clip_path(shape: ShapeKind, width: f64, height: f64) -> String {
    ShapeDef::from(shape).css_clip_path(width, height)
}

#[cfg(test)]
#[path = "../../tests/unit/shapes/geometry.rs"]
mod tests;
