use std::io::Cursor;

use anyhow::Context;

use crate::{
    foundation::core::PixelSize,
    foundation::error::{ClipforgeError, ClipforgeResult},
    shapes::geometry::ShapeDef,
};

/// An 8-bit grayscale mask: 255 inside the shape, 0 outside, anti-aliased at the edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskBitmap {
    /// Mask dimensions.
    pub size: PixelSize,
    /// Row-major coverage values, `width * height` bytes.
    pub coverage: Vec<u8>,
}

impl MaskBitmap {
    /// Coverage at `(x, y)`, `None` when out of bounds.
    pub fn at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let idx = (y as usize) * (self.size.width as usize) + (x as usize);
        self.coverage.get(idx).copied()
    }

    /// Encode as a grayscale PNG, the format the overlay step reads.
    pub fn to_png(&self) -> ClipforgeResult<Vec<u8>> {
        let img = image::GrayImage::from_raw(
            self.size.width,
            self.size.height,
            self.coverage.clone(),
        )
        .ok_or_else(|| ClipforgeError::validation("mask buffer does not match its size"))?;

        let mut buf = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("encode mask png")?;
        Ok(buf)
    }
}

/// Rasterize the SVG mask document for `shape` at `size`.
#[tracing::instrument(skip(shape), fields(shape = shape.kind.as_str()))]
pub fn render_mask(shape: &ShapeDef, size: PixelSize) -> ClipforgeResult<MaskBitmap> {
    let svg = shape.svg(f64::from(size.width), f64::from(size.height));
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(svg.as_bytes(), &opts).context("parse mask svg")?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width, size.height)
        .ok_or_else(|| ClipforgeError::validation("failed to allocate mask pixmap"))?;
    let sx = (size.width as f32) / tree.size().width();
    let sy = (size.height as f32) / tree.size().height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    // White-on-black, opaque: the red channel is the coverage.
    let coverage = pixmap.data().chunks_exact(4).map(|px| px[0]).collect();
    Ok(MaskBitmap { size, coverage })
}

#[cfg(test)]
#[path = "../../tests/unit/shapes/mask.rs"]
mod tests;
