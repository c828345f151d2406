//! Pointer-driven geometry editing.
//!
//! The machine owns exactly one drag slot. A press starts a gesture only from [`GestureState::Idle`];
//! release always resolves the gesture and returns to idle. All clamping happens here, so every
//! geometry leaving this module satisfies the containment invariant.

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Point, Rect, Size};
use crate::template::geometry::{
    FieldGeometry, MIN_HEIGHT_PCT, MIN_WIDTH_PCT, clamp_pct, pixel_delta_to_pct,
};

/// Pointer travel, in container pixels, below which a gesture is a click.
pub const DRAG_THRESHOLD_PX: f64 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    Nw,
    Ne,
    Sw,
    Se,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::Nw, Corner::Ne, Corner::Sw, Corner::Se];

    /// Whether dragging this corner moves the left edge (otherwise the right edge moves).
    pub fn moves_left(self) -> bool {
        matches!(self, Corner::Nw | Corner::Sw)
    }

    /// Whether dragging this corner moves the top edge (otherwise the bottom edge moves).
    pub fn moves_top(self) -> bool {
        matches!(self, Corner::Nw | Corner::Ne)
    }

    /// The corner's position on `r`.
    pub fn point_on(self, r: Rect) -> Point {
        let x = if self.moves_left() { r.x0 } else { r.x1 };
        let y = if self.moves_top() { r.y0 } else { r.y1 };
        Point::new(x, y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "corner")]
pub enum DragKind {
    Move,
    Resize(Corner),
}

/// The single active drag.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveDrag {
    pub field_id: String,
    pub kind: DragKind,
    pub start_geometry: FieldGeometry,
    pub start_pointer: Point,
    pub current: FieldGeometry,
    pub exceeded_threshold: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum GestureState {
    #[default]
    Idle,
    /// Press on a field that cannot be dragged; resolves to a click.
    Pressing { field_id: String },
    Dragging(ActiveDrag),
}

/// What a pointer release resolved to.
#[derive(Clone, Debug, PartialEq)]
pub enum GestureOutcome {
    /// No gesture was active.
    None,
    /// The pointer never travelled past [`DRAG_THRESHOLD_PX`].
    Click { field_id: String },
    Commit {
        field_id: String,
        kind: DragKind,
        geometry: FieldGeometry,
    },
}

#[derive(Clone, Debug, Default)]
pub struct GestureMachine {
    state: GestureState,
}

impl GestureMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, GestureState::Idle)
    }

    /// Press on a field body. Ignored unless idle; returns whether a gesture started.
    pub fn press_field(
        &mut self,
        field_id: &str,
        geometry: FieldGeometry,
        pointer: Point,
        draggable: bool,
    ) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.state = if draggable {
            GestureState::Dragging(ActiveDrag {
                field_id: field_id.to_owned(),
                kind: DragKind::Move,
                start_geometry: geometry,
                start_pointer: pointer,
                current: geometry,
                exceeded_threshold: false,
            })
        } else {
            GestureState::Pressing {
                field_id: field_id.to_owned(),
            }
        };
        true
    }

    /// Press on a corner handle of the selected field. Ignored unless idle.
    pub fn press_handle(
        &mut self,
        field_id: &str,
        corner: Corner,
        geometry: FieldGeometry,
        pointer: Point,
    ) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.state = GestureState::Dragging(ActiveDrag {
            field_id: field_id.to_owned(),
            kind: DragKind::Resize(corner),
            start_geometry: geometry,
            start_pointer: pointer,
            current: geometry,
            exceeded_threshold: false,
        });
        true
    }

    /// Feed a pointer position; returns the live geometry while a drag is past the threshold.
    ///
    /// `container` is the rendered card size in pixels at the time of the move.
    pub fn pointer_move(&mut self, pointer: Point, container: Size) -> Option<FieldGeometry> {
        let GestureState::Dragging(drag) = &mut self.state else {
            return None;
        };
        let delta = pointer - drag.start_pointer;
        if !drag.exceeded_threshold {
            if delta.hypot() <= DRAG_THRESHOLD_PX {
                return None;
            }
            drag.exceeded_threshold = true;
        }
        let (dx, dy) = pixel_delta_to_pct(delta.x, delta.y, container)?;
        drag.current = match drag.kind {
            DragKind::Move => apply_move(drag.start_geometry, dx, dy),
            DragKind::Resize(corner) => apply_resize(drag.start_geometry, corner, dx, dy),
        };
        Some(drag.current)
    }

    /// Live geometry of the dragged field, for rendering mid-gesture.
    pub fn live_geometry(&self) -> Option<(&str, FieldGeometry)> {
        match &self.state {
            GestureState::Dragging(drag) if drag.exceeded_threshold => {
                Some((drag.field_id.as_str(), drag.current))
            }
            _ => None,
        }
    }

    /// Resolve the current gesture and return to idle.
    pub fn release(&mut self) -> GestureOutcome {
        match std::mem::take(&mut self.state) {
            GestureState::Idle => GestureOutcome::None,
            GestureState::Pressing { field_id } => GestureOutcome::Click { field_id },
            GestureState::Dragging(drag) if !drag.exceeded_threshold => GestureOutcome::Click {
                field_id: drag.field_id,
            },
            GestureState::Dragging(drag) => GestureOutcome::Commit {
                field_id: drag.field_id,
                kind: drag.kind,
                geometry: drag.current,
            },
        }
    }

    /// Abandon the gesture without committing anything.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }
}

/// Translate `start` by a percentage delta, keeping the far edges inside the card.
pub fn apply_move(start: FieldGeometry, dx_pct: f64, dy_pct: f64) -> FieldGeometry {
    FieldGeometry {
        x: clamp_pct(start.x + dx_pct, 0.0, (100.0 - start.width).max(0.0)),
        y: clamp_pct(start.y + dy_pct, 0.0, (100.0 - start.height).max(0.0)),
        ..start
    }
}

/// Resize `start` from `corner`, holding the opposite edges fixed.
pub fn apply_resize(start: FieldGeometry, corner: Corner, dx_pct: f64, dy_pct: f64) -> FieldGeometry {
    let (x, width) = resize_axis(start.x, start.width, dx_pct, corner.moves_left(), MIN_WIDTH_PCT);
    let (y, height) = resize_axis(start.y, start.height, dy_pct, corner.moves_top(), MIN_HEIGHT_PCT);
    FieldGeometry {
        x,
        y,
        width,
        height,
    }
    .contained()
}

/// One axis of a resize: returns the new origin and size.
fn resize_axis(origin: f64, size: f64, delta: f64, moves_near_edge: bool, min: f64) -> (f64, f64) {
    if moves_near_edge {
        let far = origin + size;
        let origin = clamp_pct(origin + delta, 0.0, (far - min).max(0.0));
        (origin, (far - origin).max(min))
    } else {
        let size = clamp_pct(size + delta, min, (100.0 - origin).max(min));
        (origin.min(100.0 - size).max(0.0), size)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/interactive/gesture.rs"]
mod tests;
