//! Overlay geometry: contain-scaling and anchor resolution.
//!
//! All overlays are fitted into the central 80% of the canvas and then
//! anchored horizontally centered, with a vertical rule chosen by
//! [`OverlayPosition`].

use clipcraft_common::error::GeometryError;
use clipcraft_model::{Dimensions, OverlayPosition, Position, ScaledDimensions};

/// Fraction of each canvas axis an overlay may occupy.
pub const CONTAIN_RATIO: f64 = 0.8;

/// Vertical margin for top/bottom anchors, as a fraction of canvas height.
pub const ANCHOR_MARGIN_RATIO: f64 = 0.10;

/// Scale `element` so it fits inside 80% of both canvas axes, preserving
/// aspect ratio.
///
/// Elements smaller than the box are scaled up to touch it on one axis.
/// An element with an empty axis yields [`ScaledDimensions::ZERO`].
pub fn compute_contain_scale(canvas: Dimensions, element: Dimensions) -> ScaledDimensions {
    if element.is_empty() {
        return ScaledDimensions::ZERO;
    }

    let target_width = canvas.width as f64 * CONTAIN_RATIO;
    let target_height = canvas.height as f64 * CONTAIN_RATIO;
    let scale_x = target_width / element.width as f64;
    let scale_y = target_height / element.height as f64;
    let scale = scale_x.min(scale_y);

    ScaledDimensions {
        // f64::round rounds half away from zero.
        width: (element.width as f64 * scale).round() as u32,
        height: (element.height as f64 * scale).round() as u32,
        scale,
    }
}

/// Top-left offset for an overlay of size `scaled` placed at `position`.
pub fn resolve_anchor(
    position: OverlayPosition,
    canvas: Dimensions,
    scaled: Dimensions,
) -> Result<Position, GeometryError> {
    let canvas_w = canvas.width as f64;
    let canvas_h = canvas.height as f64;
    let x = ((canvas_w - scaled.width as f64) / 2.0).round() as i32;

    let y = match position {
        OverlayPosition::Center => ((canvas_h - scaled.height as f64) / 2.0).round(),
        OverlayPosition::TopCenter => (canvas_h * ANCHOR_MARGIN_RATIO).round(),
        OverlayPosition::BottomCenter => {
            (canvas_h - scaled.height as f64 - canvas_h * ANCHOR_MARGIN_RATIO).round()
        }
        OverlayPosition::Custom => {
            return Err(GeometryError::UnsupportedAnchor { position });
        }
    } as i32;

    Ok(Position::new(x, y))
}

/// Size and offset of one overlay on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scaled: ScaledDimensions,
    pub position: Position,
}

/// Contain-scale `element` and anchor it in one step.
pub fn place_overlay(
    position: OverlayPosition,
    canvas: Dimensions,
    element: Dimensions,
) -> Result<Placement, GeometryError> {
    let scaled = compute_contain_scale(canvas, element);
    let position = resolve_anchor(position, canvas, scaled.dimensions())?;
    Ok(Placement { scaled, position })
}
