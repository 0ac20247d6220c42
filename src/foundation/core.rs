use crate::foundation::error::{ClipforgeError, ClipforgeResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Size, Vec2};

/// Integer pixel dimensions of a video frame, mask, or export target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Build a non-empty pixel size.
    pub fn new(width: u32, height: u32) -> ClipforgeResult<Self> {
        if width == 0 || height == 0 {
            return Err(ClipforgeError::validation(format!(
                "pixel size must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// The same dimensions as a floating-point [`Size`].
    pub fn to_size(self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// `WxH`, the form the media engine's `-s` flag expects.
    pub fn to_arg(self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Map a length from one axis extent to another: `value * target / source`.
///
/// A non-positive `source` leaves the value unchanged.
pub fn scale_axis(value: f64, source: f64, target: f64) -> f64 {
    if source <= 0.0 || !source.is_finite() {
        return value;
    }
    value * (target / source)
}

/// Format a number with at most three decimals and no trailing zeros.
///
/// Every path string and command argument goes through this, so equal inputs always yield
/// byte-identical output (`2.0 -> "2"`, `0.1 + 0.2 -> "0.3"`, `-0.0 -> "0"`).
pub fn fmt_num(v: f64) -> String {
    let mut s = format!("{v:.3}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
