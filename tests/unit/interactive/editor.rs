use std::cell::RefCell;
use std::rc::Rc;

use super::*;

#[derive(Default)]
struct Log {
    selected: Vec<Option<String>>,
    moved: Vec<(String, FieldGeometry)>,
    resized: Vec<(String, FieldGeometry)>,
    illustration_clicks: Vec<String>,
    saves: usize,
}

fn editable(log: &Rc<RefCell<Log>>) -> EditorCallbacks {
    let (a, b, c, d, e) = (
        log.clone(),
        log.clone(),
        log.clone(),
        log.clone(),
        log.clone(),
    );
    EditorCallbacks {
        on_select: Some(Box::new(move |id: Option<&str>| a.borrow_mut().selected.push(id.map(str::to_owned)))),
        on_move: Some(Box::new(move |id: &str, g: FieldGeometry| b.borrow_mut().moved.push((id.to_owned(), g)))),
        on_resize: Some(Box::new(move |id: &str, g: FieldGeometry| c.borrow_mut().resized.push((id.to_owned(), g)))),
        on_illustration_click: Some(Box::new(move |id: &str| {
            d.borrow_mut().illustration_clicks.push(id.to_owned())
        })),
        on_change: Some(Box::new(move |_: &TemplateDefinition| e.borrow_mut().saves += 1)),
    }
}

fn editor(log: &Rc<RefCell<Log>>) -> CardEditor {
    CardEditor::new(TemplateDefinition::default_card(), FieldValues::new(), 1.0)
        .unwrap()
        .with_callbacks(editable(log))
}

// "type" field: x 12.5..125, y 189..210 at scale 1.
const TYPE_BODY: Point = Point::new(50.0, 200.0);

#[test]
fn click_selects_without_moving() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut ed = editor(&log);
    assert!(ed.is_editable());

    ed.pointer_down(TYPE_BODY).unwrap();
    ed.pointer_move(TYPE_BODY + kurbo::Vec2::new(1.0, 1.0));
    let ev = ed.pointer_up();

    assert_eq!(ev, EditorEvent::Selected(Some("type".to_owned())));
    assert_eq!(ed.selected_field_id(), Some("type"));
    let log = log.borrow();
    assert!(log.moved.is_empty());
    assert_eq!(log.saves, 0);
    assert_eq!(log.selected, vec![Some("type".to_owned())]);
}

#[test]
fn drag_moves_and_commits_snapped_geometry() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut ed = editor(&log);
    let before = ed.definition().clone();

    ed.pointer_down(TYPE_BODY).unwrap();
    // 26px right is 10.4% of 250px; 35px down is 10% of 350px.
    let live = ed
        .pointer_move(TYPE_BODY + kurbo::Vec2::new(26.0, 35.0))
        .unwrap();
    assert!((live.x - 15.4).abs() < 1e-9);
    assert!(ed.view().unwrap().field("type").unwrap().rect.x0 > 38.0);

    let ev = ed.pointer_up();
    let expected = FieldGeometry::new(15.0, 64.0, 45.0, 6.0);
    assert_eq!(
        ev,
        EditorEvent::Moved {
            field_id: "type".to_owned(),
            geometry: expected
        }
    );
    assert_eq!(ed.definition().field("type").unwrap().geometry, expected);
    // The old snapshot is untouched.
    assert_eq!(before.field("type").unwrap().geometry.x, 5.0);

    let log = log.borrow();
    assert_eq!(log.moved, vec![("type".to_owned(), expected)]);
    assert_eq!(log.saves, 1);
    assert!(log.selected.is_empty());
}

#[test]
fn resize_from_selected_handle() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut ed = editor(&log);
    ed.select(Some("type"));

    // SE corner of "type" sits at (125, 210).
    ed.pointer_down(Point::new(125.0, 210.0)).unwrap();
    ed.pointer_move(Point::new(150.0, 245.0));
    let ev = ed.pointer_up();

    assert_eq!(
        ev,
        EditorEvent::Resized {
            field_id: "type".to_owned(),
            geometry: FieldGeometry::new(5.0, 54.0, 55.0, 16.0)
        }
    );
    assert_eq!(log.borrow().resized.len(), 1);
}

#[test]
fn snapping_can_be_disabled() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut ed = editor(&log).with_options(EditorOptions {
        snap_to_whole_percent: false,
    });
    ed.pointer_down(TYPE_BODY).unwrap();
    ed.pointer_move(TYPE_BODY + kurbo::Vec2::new(26.0, 0.0));
    ed.pointer_up();
    let x = ed.definition().field("type").unwrap().geometry.x;
    assert!((x - 15.4).abs() < 1e-9);
}

#[test]
fn read_only_surface_only_selects() {
    let selected = Rc::new(RefCell::new(Vec::new()));
    let sink = selected.clone();
    let mut ed = CardEditor::new(TemplateDefinition::default_card(), FieldValues::new(), 1.0)
        .unwrap()
        .with_callbacks(EditorCallbacks {
            on_select: Some(Box::new(move |id: Option<&str>| sink.borrow_mut().push(id.map(str::to_owned)))),
            ..EditorCallbacks::default()
        });
    assert!(!ed.is_editable());

    ed.pointer_down(TYPE_BODY).unwrap();
    assert_eq!(ed.pointer_move(TYPE_BODY + kurbo::Vec2::new(80.0, 80.0)), None);
    assert_eq!(ed.pointer_up(), EditorEvent::Selected(Some("type".to_owned())));
    assert_eq!(ed.definition(), &TemplateDefinition::default_card());

    // Re-clicking the selected field still notifies.
    ed.pointer_down(TYPE_BODY).unwrap();
    ed.pointer_up();
    assert_eq!(selected.borrow().len(), 2);
    // No handles without a resize callback.
    assert!(ed.view().unwrap().field("type").unwrap().handles.is_empty());
}

#[test]
fn illustration_click_fires_its_own_callback() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut ed = editor(&log);
    ed.pointer_down(Point::new(125.0, 100.0)).unwrap();
    assert_eq!(
        ed.pointer_up(),
        EditorEvent::IllustrationClicked("illustration".to_owned())
    );
    assert_eq!(log.borrow().illustration_clicks, vec!["illustration".to_owned()]);
}

#[test]
fn background_press_clears_selection() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut ed = editor(&log);
    ed.select(Some("name"));
    assert_eq!(
        ed.pointer_down(Point::new(2.0, 345.0)).unwrap(),
        EditorEvent::Selected(None)
    );
    assert_eq!(ed.selected_field_id(), None);
}

#[test]
fn second_press_during_drag_is_ignored() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut ed = editor(&log);
    ed.pointer_down(TYPE_BODY).unwrap();
    ed.pointer_down(Point::new(125.0, 100.0)).unwrap();
    ed.pointer_move(TYPE_BODY + kurbo::Vec2::new(0.0, 35.0));
    match ed.pointer_up() {
        EditorEvent::Moved { field_id, .. } => assert_eq!(field_id, "type"),
        other => panic!("expected move, got {other:?}"),
    }
}

#[test]
fn field_list_edits_go_through_save_callback() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut ed = editor(&log);

    let id = ed.add_field(FieldType::Power);
    assert_eq!(ed.selected_field_id(), Some(id.as_str()));
    ed.toggle_visibility(&id);
    assert!(!ed.definition().field(&id).unwrap().visible);
    ed.move_field_to(&id, 0);
    assert_eq!(ed.definition().fields[0].id, id);

    let mut f = ed.definition().field(&id).unwrap().clone();
    f.font_color = "not a colour".to_owned();
    assert!(ed.update_field(f.clone()).is_err());
    f.font_color = "#000".to_owned();
    ed.update_field(f).unwrap();

    ed.remove_field(&id);
    assert!(ed.definition().field(&id).is_none());
    assert_eq!(ed.selected_field_id(), None);

    assert_eq!(log.borrow().saves, 5);
}
