//! Percentage geometry shared by every consumer of a template.
//!
//! Field positions and sizes are percentages (0–100) of the card's own width and height. Both
//! renderers map them to pixels through [`field_rect_px`]; nothing else converts percentages.

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Rect, Size};

/// Smallest width a field may be resized to, in percent of the card width.
pub const MIN_WIDTH_PCT: f64 = 5.0;
/// Smallest height a field may be resized to, in percent of the card height.
pub const MIN_HEIGHT_PCT: f64 = 3.0;

/// Position and size of a field in card percentages.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FieldGeometry {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(self) -> f64 {
        self.y + self.height
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// `0 <= x`, `0 <= y`, `x + width <= 100`, `y + height <= 100` and the minimum sizes.
    pub fn is_contained(self) -> bool {
        const EPS: f64 = 1e-9;
        self.x >= -EPS
            && self.y >= -EPS
            && self.right() <= 100.0 + EPS
            && self.bottom() <= 100.0 + EPS
            && self.width >= MIN_WIDTH_PCT - EPS
            && self.height >= MIN_HEIGHT_PCT - EPS
    }

    /// Force the geometry into the card: sizes into `[min, 100]`, then origins so the far edges
    /// stay inside.
    pub fn contained(self) -> Self {
        let width = clamp_pct(self.width, MIN_WIDTH_PCT, 100.0);
        let height = clamp_pct(self.height, MIN_HEIGHT_PCT, 100.0);
        Self {
            x: clamp_pct(self.x, 0.0, 100.0 - width),
            y: clamp_pct(self.y, 0.0, 100.0 - height),
            width,
            height,
        }
    }

    /// Round every edge to a whole percent, then re-contain.
    ///
    /// Edges snap rather than sizes, so an edge that a resize held fixed stays where it was.
    pub fn snapped(self) -> Self {
        let (x0, x1) = (self.x.round(), (self.x + self.width).round());
        let (y0, y1) = (self.y.round(), (self.y + self.height).round());
        Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
        .contained()
    }
}

/// Clamp that tolerates `lo > hi` by preferring `hi`.
///
/// `f64::clamp` panics on inverted bounds; geometry authored outside the editor can produce them.
pub(crate) fn clamp_pct(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// Map percentage geometry into a pixel rectangle inside a container of `container` pixels.
pub fn field_rect_px(geometry: FieldGeometry, container: Size) -> Rect {
    let x0 = geometry.x / 100.0 * container.width;
    let y0 = geometry.y / 100.0 * container.height;
    let w = geometry.width / 100.0 * container.width;
    let h = geometry.height / 100.0 * container.height;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

/// Convert a pointer delta in container pixels into a percentage delta.
///
/// Returns `None` for a degenerate container.
pub fn pixel_delta_to_pct(dx_px: f64, dy_px: f64, container: Size) -> Option<(f64, f64)> {
    if !(container.width > 0.0 && container.height > 0.0) {
        return None;
    }
    Some((
        dx_px / container.width * 100.0,
        dy_px / container.height * 100.0,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/template/geometry.rs"]
mod tests;
