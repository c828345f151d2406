use crate::foundation::core::{Point, Size};
use crate::foundation::error::CardResult;
use crate::interactive::gesture::{DragKind, GestureMachine, GestureOutcome};
use crate::interactive::view::{CardView, HitTarget, ViewOptions};
use crate::template::geometry::FieldGeometry;
use crate::template::model::{FieldType, FieldValues, TemplateDefinition, TemplateField};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditorOptions {
    /// Round committed geometry to whole percentages.
    pub snap_to_whole_percent: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            snap_to_whole_percent: true,
        }
    }
}

type SelectFn = Box<dyn FnMut(Option<&str>)>;
type FieldFn = Box<dyn FnMut(&str)>;
type GeometryFn = Box<dyn FnMut(&str, FieldGeometry)>;
type ChangeFn = Box<dyn FnMut(&TemplateDefinition)>;

/// Hooks the host wires in. Supplying `on_move` or `on_resize` makes the surface editable.
#[derive(Default)]
pub struct EditorCallbacks {
    pub on_select: Option<SelectFn>,
    pub on_move: Option<GeometryFn>,
    pub on_resize: Option<GeometryFn>,
    pub on_illustration_click: Option<FieldFn>,
    /// Receives every new definition; this is where persistence plugs in.
    pub on_change: Option<ChangeFn>,
}

impl std::fmt::Debug for EditorCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorCallbacks")
            .field("on_select", &self.on_select.is_some())
            .field("on_move", &self.on_move.is_some())
            .field("on_resize", &self.on_resize.is_some())
            .field("on_illustration_click", &self.on_illustration_click.is_some())
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

/// What a pointer event did, for hosts that prefer polling to callbacks.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    None,
    Selected(Option<String>),
    IllustrationClicked(String),
    Moved { field_id: String, geometry: FieldGeometry },
    Resized { field_id: String, geometry: FieldGeometry },
}

/// Editing session over one template definition.
///
/// The definition is replaced wholesale on every commit, never mutated in place.
#[derive(Debug)]
pub struct CardEditor {
    definition: TemplateDefinition,
    values: FieldValues,
    scale: f64,
    selected: Option<String>,
    gestures: GestureMachine,
    options: EditorOptions,
    callbacks: EditorCallbacks,
}

impl CardEditor {
    pub fn new(definition: TemplateDefinition, values: FieldValues, scale: f64) -> CardResult<Self> {
        definition.validate()?;
        Ok(Self {
            definition,
            values,
            scale,
            selected: None,
            gestures: GestureMachine::new(),
            options: EditorOptions::default(),
            callbacks: EditorCallbacks::default(),
        })
    }

    pub fn with_options(mut self, options: EditorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_callbacks(mut self, callbacks: EditorCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn definition(&self) -> &TemplateDefinition {
        &self.definition
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn set_values(&mut self, values: FieldValues) {
        self.values = values;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub fn selected_field_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn gestures(&self) -> &GestureMachine {
        &self.gestures
    }

    pub fn is_editable(&self) -> bool {
        self.can_move() || self.can_resize()
    }

    fn can_move(&self) -> bool {
        self.callbacks.on_move.is_some()
    }

    fn can_resize(&self) -> bool {
        self.callbacks.on_resize.is_some()
    }

    /// Rendered card size in pixels.
    pub fn container_size(&self) -> Size {
        Size::new(self.definition.width * self.scale, self.definition.height * self.scale)
    }

    /// The current view, with any in-flight drag geometry applied.
    pub fn view(&self) -> CardResult<CardView> {
        let opts = ViewOptions {
            scale: self.scale,
            selected_field_id: self.selected.clone(),
            resizable: self.can_resize(),
            placeholders: true,
        };
        match self.gestures.live_geometry() {
            Some((id, geometry)) => {
                let live = self.definition.with_field_geometry(id, geometry);
                CardView::build(&live, &self.values, &opts)
            }
            None => CardView::build(&self.definition, &self.values, &opts),
        }
    }

    /// Change the selection, firing `on_select` when it actually changes.
    pub fn select(&mut self, field_id: Option<&str>) {
        self.apply_selection(field_id, false);
    }

    fn apply_selection(&mut self, field_id: Option<&str>, always_notify: bool) {
        let next = field_id
            .filter(|id| self.definition.field(id).is_some())
            .map(str::to_owned);
        if next == self.selected && !always_notify {
            return;
        }
        self.selected = next;
        if let Some(cb) = self.callbacks.on_select.as_mut() {
            cb(self.selected.as_deref());
        }
    }

    pub fn pointer_down(&mut self, p: Point) -> CardResult<EditorEvent> {
        if !self.gestures.is_idle() {
            return Ok(EditorEvent::None);
        }
        let view = self.view()?;
        match view.hit_test(p) {
            HitTarget::Handle { field_id, corner } => {
                if let Some(f) = self.definition.field(&field_id) {
                    let geometry = f.geometry;
                    self.gestures.press_handle(&field_id, corner, geometry, p);
                }
                Ok(EditorEvent::None)
            }
            HitTarget::Field { field_id } => {
                if let Some(f) = self.definition.field(&field_id) {
                    let geometry = f.geometry;
                    let draggable = self.can_move();
                    self.gestures.press_field(&field_id, geometry, p, draggable);
                }
                Ok(EditorEvent::None)
            }
            HitTarget::Background => {
                if self.selected.is_some() {
                    self.select(None);
                    return Ok(EditorEvent::Selected(None));
                }
                Ok(EditorEvent::None)
            }
            HitTarget::Outside => Ok(EditorEvent::None),
        }
    }

    /// Returns the live geometry of the dragged field, if any.
    pub fn pointer_move(&mut self, p: Point) -> Option<FieldGeometry> {
        let container = self.container_size();
        self.gestures.pointer_move(p, container)
    }

    pub fn pointer_up(&mut self) -> EditorEvent {
        match self.gestures.release() {
            GestureOutcome::None => EditorEvent::None,
            GestureOutcome::Click { field_id } => self.click(field_id),
            GestureOutcome::Commit {
                field_id,
                kind,
                geometry,
            } => self.commit(field_id, kind, geometry),
        }
    }

    pub fn cancel_gesture(&mut self) {
        self.gestures.cancel();
    }

    fn click(&mut self, field_id: String) -> EditorEvent {
        self.apply_selection(Some(&field_id), true);
        let is_illustration = self
            .definition
            .field(&field_id)
            .is_some_and(|f| f.field_type.is_image());
        if is_illustration && let Some(cb) = self.callbacks.on_illustration_click.as_mut() {
            cb(&field_id);
            return EditorEvent::IllustrationClicked(field_id);
        }
        EditorEvent::Selected(Some(field_id))
    }

    fn commit(&mut self, field_id: String, kind: DragKind, geometry: FieldGeometry) -> EditorEvent {
        let geometry = if self.options.snap_to_whole_percent {
            geometry.snapped()
        } else {
            geometry
        };
        tracing::debug!(field_id = %field_id, ?kind, ?geometry, "commit field geometry");
        self.replace_definition(self.definition.with_field_geometry(&field_id, geometry));

        match kind {
            DragKind::Move => {
                if let Some(cb) = self.callbacks.on_move.as_mut() {
                    cb(&field_id, geometry);
                }
                EditorEvent::Moved { field_id, geometry }
            }
            DragKind::Resize(_) => {
                if let Some(cb) = self.callbacks.on_resize.as_mut() {
                    cb(&field_id, geometry);
                }
                EditorEvent::Resized { field_id, geometry }
            }
        }
    }

    fn replace_definition(&mut self, next: TemplateDefinition) {
        self.definition = next;
        if let Some(cb) = self.callbacks.on_change.as_mut() {
            cb(&self.definition);
        }
    }

    /// Append a new field of `field_type`, select it, and return its id.
    pub fn add_field(&mut self, field_type: FieldType) -> String {
        let (next, id) = self.definition.with_field_added(field_type);
        self.replace_definition(next);
        self.select(Some(&id));
        id
    }

    pub fn remove_field(&mut self, field_id: &str) {
        self.replace_definition(self.definition.without_field(field_id));
        if self.selected.as_deref() == Some(field_id) {
            self.select(None);
        }
    }

    pub fn toggle_visibility(&mut self, field_id: &str) {
        self.replace_definition(self.definition.with_visibility_toggled(field_id));
    }

    pub fn move_field_to(&mut self, field_id: &str, index: usize) {
        self.replace_definition(self.definition.with_field_moved(field_id, index));
    }

    /// Replace a field's attributes (style, label, ...). Invalid results are rejected.
    pub fn update_field(&mut self, field: TemplateField) -> CardResult<()> {
        let next = self.definition.with_field_replaced(field);
        next.validate()?;
        self.replace_definition(next);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/interactive/editor.rs"]
mod tests;
