use crate::{
    foundation::core::{Point, Size},
    foundation::error::{ClipforgeError, ClipforgeResult},
    pip::config::{Border, CoordSpace, PipConfig, Shadow},
    placement::score::constrain_to_bounds,
    shapes::geometry::ShapeKind,
};

const DEFAULT_SIZE_RATIO: f64 = 0.25;
const DEFAULT_POSITION_RATIO: f64 = 0.70;
const DEFAULT_BORDER_COLOR: &str = "#ffffff";
const DEFAULT_BORDER_WIDTH: f64 = 3.0;

/// The editor's current PiP overlay, in preview-container space.
///
/// One instance per editor session; UI actions and auto-placement mutate it between exports.
#[derive(Clone, Debug, PartialEq)]
pub struct PipState {
    container: Size,
    clip_id: Option<String>,
    config: Option<PipConfig>,
    auto_position: bool,
}

impl PipState {
    /// Empty state for a preview container of `container` pixels.
    pub fn new(container: Size) -> Self {
        Self {
            container,
            clip_id: None,
            config: None,
            auto_position: true,
        }
    }

    /// The overlay config, if a shape has been applied.
    pub fn config(&self) -> Option<&PipConfig> {
        self.config.as_ref()
    }

    /// Clip the overlay decorates.
    pub fn clip_id(&self) -> Option<&str> {
        self.clip_id.as_deref()
    }

    /// `true` when a shape is applied.
    pub fn is_active(&self) -> bool {
        self.config.is_some()
    }

    /// Whether auto-placement results are still applied.
    pub fn auto_position(&self) -> bool {
        self.auto_position
    }

    /// Preview container extent.
    pub fn container(&self) -> Size {
        self.container
    }

    /// Resize the preview container, keeping the overlay proportionally placed.
    pub fn resize_container(&mut self, container: Size) {
        if let Some(cfg) = &mut self.config
            && self.container.width > 0.0
            && self.container.height > 0.0
        {
            let sx = container.width / self.container.width;
            let sy = container.height / self.container.height;
            cfg.position = Point::new(cfg.position.x * sx, cfg.position.y * sy);
            cfg.size = Size::new(cfg.size.width * sx, cfg.size.height * sy);
            cfg.space = CoordSpace::Preview {
                width: container.width,
                height: container.height,
            };
        }
        self.container = container;
    }

    /// Assign `shape` to the overlay on `clip_id`.
    ///
    /// Re-shaping the same clip keeps its placement; a new clip starts from the defaults
    /// (quarter-size, lower-right, white 3px border, shadow on).
    pub fn apply_shape(&mut self, clip_id: impl Into<String>, shape: ShapeKind) {
        let clip_id = clip_id.into();
        if let Some(cfg) = &mut self.config
            && self.clip_id.as_deref() == Some(clip_id.as_str())
        {
            cfg.shape = shape;
            tracing::debug!(clip = %clip_id, shape = shape.as_str(), "PiP shape changed");
            return;
        }

        let size = Size::new(
            self.container.width * DEFAULT_SIZE_RATIO,
            self.container.height * DEFAULT_SIZE_RATIO,
        );
        let position = constrain_to_bounds(
            Point::new(
                self.container.width * DEFAULT_POSITION_RATIO,
                self.container.height * DEFAULT_POSITION_RATIO,
            ),
            size,
            self.container,
        );
        let mut cfg = PipConfig::new(
            shape,
            position,
            size,
            CoordSpace::Preview {
                width: self.container.width,
                height: self.container.height,
            },
        )
        .with_border(DEFAULT_BORDER_COLOR, DEFAULT_BORDER_WIDTH);
        cfg.shadow = Some(Shadow::default());

        tracing::debug!(clip = %clip_id, shape = shape.as_str(), "PiP shape applied");
        self.config = Some(cfg);
        self.clip_id = Some(clip_id);
        self.auto_position = true;
    }

    /// Reinstate a persisted overlay. Preview-space configs saved against another container
    /// size are rescaled; the placement counts as manual.
    pub fn restore(&mut self, clip_id: impl Into<String>, mut config: PipConfig) {
        if let CoordSpace::Preview { width, height } = config.space
            && width > 0.0
            && height > 0.0
        {
            let sx = self.container.width / width;
            let sy = self.container.height / height;
            config.position = Point::new(config.position.x * sx, config.position.y * sy);
            config.size = Size::new(config.size.width * sx, config.size.height * sy);
            config.space = CoordSpace::Preview {
                width: self.container.width,
                height: self.container.height,
            };
        }
        self.clip_id = Some(clip_id.into());
        self.config = Some(config);
        self.auto_position = false;
    }

    /// Set the custom outline used by [`ShapeKind::Custom`].
    pub fn set_custom_path(&mut self, path: impl Into<String>) -> ClipforgeResult<()> {
        let cfg = self.active_mut()?;
        cfg.custom_path = Some(path.into());
        Ok(())
    }

    /// Manual placement (drag). Clamped to the container; disables auto-placement.
    pub fn set_position(&mut self, position: Point) -> ClipforgeResult<()> {
        let container = self.container;
        let cfg = self.active_mut()?;
        cfg.position = constrain_to_bounds(position, cfg.size, container);
        self.auto_position = false;
        Ok(())
    }

    /// Manual resize; the position is re-clamped so the overlay stays visible.
    pub fn set_size(&mut self, size: Size) -> ClipforgeResult<()> {
        if !(size.width > 0.0 && size.height > 0.0) {
            return Err(ClipforgeError::validation("PiP size must be positive"));
        }
        let container = self.container;
        let cfg = self.active_mut()?;
        cfg.size = size;
        cfg.position = constrain_to_bounds(cfg.position, size, container);
        Ok(())
    }

    /// Replace the border. A zero width removes it.
    pub fn update_border(&mut self, color: impl Into<String>, width: f64) -> ClipforgeResult<()> {
        let color = color.into();
        if width > 0.0 && crate::foundation::math::parse_hex_color(&color).is_none() {
            return Err(ClipforgeError::validation(format!(
                "PiP border colour {color:?} is not a hex colour"
            )));
        }
        let cfg = self.active_mut()?;
        cfg.border = (width > 0.0).then_some(Border { color, width });
        Ok(())
    }

    /// Flip the shadow on or off.
    pub fn toggle_shadow(&mut self) -> ClipforgeResult<()> {
        let cfg = self.active_mut()?;
        match &mut cfg.shadow {
            Some(s) => s.enabled = !s.enabled,
            None => cfg.shadow = Some(Shadow::default()),
        }
        Ok(())
    }

    /// Apply an auto-placement result, unless the user has placed the overlay by hand.
    ///
    /// Returns whether the position changed.
    pub fn apply_suggestion(&mut self, position: Point) -> bool {
        if !self.auto_position {
            return false;
        }
        let container = self.container;
        match &mut self.config {
            Some(cfg) => {
                cfg.position = constrain_to_bounds(position, cfg.size, container);
                true
            }
            None => false,
        }
    }

    /// Re-enable auto-placement after a manual drag.
    pub fn reset_to_suggested(&mut self) {
        self.auto_position = true;
    }

    /// Remove the overlay.
    pub fn clear(&mut self) {
        self.config = None;
        self.clip_id = None;
        self.auto_position = true;
    }

    fn active_mut(&mut self) -> ClipforgeResult<&mut PipConfig> {
        self.config
            .as_mut()
            .ok_or_else(|| ClipforgeError::validation("no PiP overlay is active"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pip/state.rs"]
mod tests;
