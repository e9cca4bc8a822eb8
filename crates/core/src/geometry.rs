//! Canvas geometry for slideshow editing and frame export.
//!
//! Slide positions are stored against a fixed-width editor canvas whose
//! height follows the slideshow's aspect ratio. Export resolution is a
//! fixed upscale of the same geometry.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Logical width of the editor canvas. All stored positions are
/// expressed against this width.
pub const CANVAS_BASE_WIDTH: u32 = 300;

/// Width of exported frames. Frames are upscaled from editor geometry
/// to this resolution at encode time.
pub const EXPORT_WIDTH: u32 = 1080;

/// Margin (logical pixels) that text bounding boxes must keep from
/// every canvas edge.
pub const SAFE_MARGIN: f64 = 40.0;

// ---------------------------------------------------------------------------
// CanvasGeometry
// ---------------------------------------------------------------------------

/// Editor and export dimensions derived from an aspect-ratio string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasGeometry {
    /// Editor canvas width (always [`CANVAS_BASE_WIDTH`]).
    pub width: u32,
    /// Editor canvas height, derived from the aspect ratio.
    pub height: u32,
    /// Exported frame width (always [`EXPORT_WIDTH`]).
    pub export_width: u32,
    /// Exported frame height, derived from the aspect ratio.
    pub export_height: u32,
}

impl CanvasGeometry {
    /// Derive geometry from an aspect-ratio string like `"9:16"`.
    ///
    /// Heights are rounded to the nearest pixel.
    pub fn from_aspect(aspect: &str) -> Result<Self, CoreError> {
        let (w, h) = aspect
            .split_once(':')
            .ok_or_else(|| invalid_aspect(aspect))?;
        let w: u32 = w.trim().parse().map_err(|_| invalid_aspect(aspect))?;
        let h: u32 = h.trim().parse().map_err(|_| invalid_aspect(aspect))?;
        if w == 0 || h == 0 {
            return Err(invalid_aspect(aspect));
        }

        Ok(Self {
            width: CANVAS_BASE_WIDTH,
            height: scale_height(CANVAS_BASE_WIDTH, w, h),
            export_width: EXPORT_WIDTH,
            export_height: scale_height(EXPORT_WIDTH, w, h),
        })
    }
}

/// Compute `width * h / w` rounded to the nearest integer.
fn scale_height(width: u32, w: u32, h: u32) -> u32 {
    let width = width as u64;
    let (w, h) = (w as u64, h as u64);
    ((width * h + w / 2) / w) as u32
}

fn invalid_aspect(aspect: &str) -> CoreError {
    CoreError::Validation(format!(
        "Invalid aspect ratio '{aspect}'. Expected 'W:H' with positive integers"
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portrait_9_16() {
        let g = CanvasGeometry::from_aspect("9:16").unwrap();
        assert_eq!(g.width, 300);
        assert_eq!(g.height, 533);
        assert_eq!(g.export_width, 1080);
        assert_eq!(g.export_height, 1920);
    }

    #[test]
    fn square_1_1() {
        let g = CanvasGeometry::from_aspect("1:1").unwrap();
        assert_eq!(g.height, 300);
        assert_eq!(g.export_height, 1080);
    }

    #[test]
    fn landscape_16_9() {
        let g = CanvasGeometry::from_aspect("16:9").unwrap();
        assert_eq!(g.height, 169);
        assert_eq!(g.export_height, 608);
    }

    #[test]
    fn tolerates_whitespace() {
        assert!(CanvasGeometry::from_aspect(" 4 : 5 ").is_ok());
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(CanvasGeometry::from_aspect("916").is_err());
    }

    #[test]
    fn rejects_zero_component() {
        assert!(CanvasGeometry::from_aspect("0:16").is_err());
        assert!(CanvasGeometry::from_aspect("9:0").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(CanvasGeometry::from_aspect("nine:sixteen").is_err());
    }
}
