pub mod editor;
pub mod gesture;
pub mod view;

pub use editor::{CardEditor, EditorCallbacks, EditorEvent, EditorOptions};
pub use gesture::{
    Corner, DRAG_THRESHOLD_PX, DragKind, GestureMachine, GestureOutcome, GestureState, apply_move,
    apply_resize,
};
pub use view::{CardView, FieldContent, FieldView, HitTarget, ViewOptions};
