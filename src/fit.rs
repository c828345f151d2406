//! Image-fit math shared by both renderers.
//!
//! Every background image and every interactive-view image placement goes through
//! [`compute_fit`]; the renderers must never re-derive these rectangles on their own.

use serde::Serialize;

use crate::foundation::core::Rect;
use crate::template::model::BackgroundFit;

/// Where to sample from the image and where to draw it inside the box.
///
/// `source` is in image pixels; `dest` is relative to the box's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FitRects {
    pub source: Rect,
    pub dest: Rect,
}

impl FitRects {
    /// `dest` moved so the box starts at `(x, y)`.
    pub fn offset(self, x: f64, y: f64) -> Self {
        Self {
            source: self.source,
            dest: self.dest + kurbo::Vec2::new(x, y),
        }
    }
}

/// Map an `image_w`×`image_h` image into a `box_w`×`box_h` box.
///
/// Returns `None` when either size is empty or non-finite; there is nothing sensible to draw.
pub fn compute_fit(
    image_w: f64,
    image_h: f64,
    box_w: f64,
    box_h: f64,
    mode: BackgroundFit,
) -> Option<FitRects> {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !(positive(image_w) && positive(image_h) && positive(box_w) && positive(box_h)) {
        return None;
    }

    let full_source = Rect::new(0.0, 0.0, image_w, image_h);
    let full_dest = Rect::new(0.0, 0.0, box_w, box_h);

    // Compare aspect ratios by cross-multiplying so equal ratios take the exact path.
    let image_cross = image_w * box_h;
    let box_cross = box_w * image_h;

    let rects = match mode {
        BackgroundFit::Fill => FitRects {
            source: full_source,
            dest: full_dest,
        },
        BackgroundFit::Cover => {
            let source = if image_cross > box_cross {
                let sw = image_h * box_w / box_h;
                let sx = (image_w - sw) / 2.0;
                Rect::new(sx, 0.0, sx + sw, image_h)
            } else if image_cross < box_cross {
                let sh = image_w * box_h / box_w;
                let sy = (image_h - sh) / 2.0;
                Rect::new(0.0, sy, image_w, sy + sh)
            } else {
                full_source
            };
            FitRects {
                source,
                dest: full_dest,
            }
        }
        BackgroundFit::Contain => {
            let dest = if image_cross > box_cross {
                let dh = box_w * image_h / image_w;
                let dy = (box_h - dh) / 2.0;
                Rect::new(0.0, dy, box_w, dy + dh)
            } else if image_cross < box_cross {
                let dw = box_h * image_w / image_h;
                let dx = (box_w - dw) / 2.0;
                Rect::new(dx, 0.0, dx + dw, box_h)
            } else {
                full_dest
            };
            FitRects {
                source: full_source,
                dest,
            }
        }
    };
    Some(rects)
}

#[cfg(test)]
#[path = "../tests/unit/fit.rs"]
mod tests;
