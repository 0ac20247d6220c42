use crate::{
    foundation::core::{PixelSize, Point, Rect, Size, scale_axis},
    foundation::error::{ClipforgeError, ClipforgeResult},
    foundation::math::parse_hex_color,
    shapes::geometry::{ShapeDef, ShapeKind},
};

/// Coordinate space a [`PipConfig`]'s position and size are expressed in.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoordSpace {
    /// Pixels of the live preview container with the given extent.
    Preview {
        /// Container width in pixels.
        width: f64,
        /// Container height in pixels.
        height: f64,
    },
    /// Pixels of the background source video (export resolution).
    Source,
}

/// Stroke drawn along the shape outline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Border {
    /// `#rrggbb` or `#rgb`.
    pub color: String,
    /// Stroke width in the config's coordinate space.
    pub width: f64,
}

/// Drop shadow behind the overlay. Preview-only; the export does not render it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Shadow {
    /// Whether the shadow is drawn.
    pub enabled: bool,
    /// Blur radius in pixels.
    pub blur: f64,
    /// CSS colour.
    pub color: String,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            enabled: true,
            blur: 10.0,
            color: "rgba(0, 0, 0, 0.5)".to_string(),
        }
    }
}

/// Placement and appearance of a picture-in-picture overlay.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PipConfig {
    /// Mask shape.
    pub shape: ShapeKind,
    /// Unit-box path for [`ShapeKind::Custom`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
    /// Top-left corner.
    pub position: Point,
    /// Overlay extent.
    pub size: Size,
    /// Space `position`, `size` and `border.width` are expressed in.
    pub space: CoordSpace,
    /// Optional outline stroke.
    #[serde(default)]
    pub border: Option<Border>,
    /// Optional drop shadow.
    #[serde(default)]
    pub shadow: Option<Shadow>,
}

impl PipConfig {
    /// A borderless, shadowless config.
    pub fn new(shape: ShapeKind, position: Point, size: Size, space: CoordSpace) -> Self {
        Self {
            shape,
            custom_path: None,
            position,
            size,
            space,
            border: None,
            shadow: None,
        }
    }

    /// Builder-style border setter.
    pub fn with_border(mut self, color: impl Into<String>, width: f64) -> Self {
        self.border = Some(Border {
            color: color.into(),
            width,
        });
        self
    }

    /// The shape plus its custom path, as the geometry library takes it.
    pub fn shape_def(&self) -> ShapeDef {
        ShapeDef {
            kind: self.shape,
            custom_path: self.custom_path.clone(),
        }
    }

    /// Overlay rectangle in the config's own space.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Reject configs that cannot be rendered.
    pub fn validate(&self) -> ClipforgeResult<()> {
        let finite = [
            self.position.x,
            self.position.y,
            self.size.width,
            self.size.height,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(ClipforgeError::validation("PiP position/size must be finite"));
        }
        if self.size.width <= 0.0 || self.size.height <= 0.0 {
            return Err(ClipforgeError::validation(format!(
                "PiP size must be positive, got {}x{}",
                self.size.width, self.size.height
            )));
        }
        if let CoordSpace::Preview { width, height } = self.space
            && !(width > 0.0 && height > 0.0)
        {
            return Err(ClipforgeError::validation(
                "PiP preview space must have a positive extent",
            ));
        }
        if let Some(border) = &self.border {
            if !border.width.is_finite() || border.width < 0.0 {
                return Err(ClipforgeError::validation(
                    "PiP border width must be a non-negative number",
                ));
            }
            if parse_hex_color(&border.color).is_none() {
                return Err(ClipforgeError::validation(format!(
                    "PiP border colour {:?} is not a hex colour",
                    border.color
                )));
            }
        }
        Ok(())
    }

    /// Re-express the config in the pixel space of a `source`-sized video.
    ///
    /// Each axis scales by `source / preview` independently; border width follows the smaller
    /// ratio so strokes never grow thicker than the shape allows.
    pub fn to_source_space(&self, source: PixelSize) -> Self {
        let CoordSpace::Preview { width, height } = self.space else {
            return self.clone();
        };
        let (tw, th) = (f64::from(source.width), f64::from(source.height));
        let mut out = self.clone();
        out.position = Point::new(
            scale_axis(self.position.x, width, tw),
            scale_axis(self.position.y, height, th),
        );
        out.size = Size::new(
            scale_axis(self.size.width, width, tw),
            scale_axis(self.size.height, height, th),
        );
        if let Some(border) = &mut out.border {
            let ratio = scale_axis(1.0, width, tw).min(scale_axis(1.0, height, th));
            border.width *= ratio;
        }
        out.space = CoordSpace::Source;
        out
    }

    /// Re-express a source-space config in a `preview`-sized container.
    pub fn to_preview_space(&self, source: PixelSize, preview: Size) -> Self {
        if let CoordSpace::Preview { .. } = self.space {
            return self.clone();
        }
        let (sw, sh) = (f64::from(source.width), f64::from(source.height));
        let mut out = self.clone();
        out.position = Point::new(
            scale_axis(self.position.x, sw, preview.width),
            scale_axis(self.position.y, sh, preview.height),
        );
        out.size = Size::new(
            scale_axis(self.size.width, sw, preview.width),
            scale_axis(self.size.height, sh, preview.height),
        );
        if let Some(border) = &mut out.border {
            let ratio = scale_axis(1.0, sw, preview.width).min(scale_axis(1.0, sh, preview.height));
            border.width *= ratio;
        }
        out.space = CoordSpace::Preview {
            width: preview.width,
            height: preview.height,
        };
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pip/config.rs"]
mod tests;
