use pretty_assertions::assert_eq;

use super::*;

#[test]
fn scale_comes_from_render_width() {
    let def = TemplateDefinition::default_card();
    let plan = RasterPlan::build(&def, &FieldValues::new(), 500.0, false).unwrap();
    assert_eq!(plan.scale, 2.0);
    assert_eq!(plan.canvas, Size::new(500.0, 700.0));
    assert_eq!((plan.width_px, plan.height_px), (500, 700));
    assert_eq!(plan.fields.len(), 8);
    assert_eq!(plan.fields[0].rect, Rect::new(25.0, 14.0, 475.0, 70.0));

    match plan.background {
        BackgroundPlan::Solid {
            fill,
            corner_radius,
            border,
        } => {
            assert_eq!(fill, Some(Rgba8::WHITE));
            assert_eq!(corner_radius, 24.0);
            assert_eq!(
                border,
                Some(BorderPlan {
                    color: Rgba8::opaque(0xd1, 0xd5, 0xdb),
                    width: 4.0
                })
            );
        }
        other => panic!("expected solid background, got {other:?}"),
    }
}

#[test]
fn export_mode_paints_only_bound_values() {
    let def = TemplateDefinition::default_card();
    let mut values = FieldValues::new();
    values.insert("name".to_owned(), "Ember Drake".to_owned());

    let plan = RasterPlan::build(&def, &values, 250.0, false).unwrap();
    let name = &plan.fields[0];
    match &name.paint {
        FieldPaint::Text(t) => {
            assert_eq!(t.text, "Ember Drake");
            assert_eq!(t.font_px, 20.0);
            assert_eq!(t.padding, 4.0);
        }
        other => panic!("expected text, got {other:?}"),
    }
    assert!(plan.fields[2..].iter().all(|f| f.paint == FieldPaint::Empty));

    let preview = RasterPlan::build(&def, &values, 250.0, true).unwrap();
    assert!(matches!(preview.fields[2].paint, FieldPaint::Text(_)));
}

#[test]
fn unbound_illustration_is_an_empty_box() {
    let def = TemplateDefinition::default_card();
    let plan = RasterPlan::build(&def, &FieldValues::new(), 250.0, true).unwrap();
    let illus = &plan.fields[1];
    assert_eq!(illus.paint, FieldPaint::Empty);
    assert_eq!(illus.fill, Some(Rgba8::opaque(0xe5, 0xe7, 0xeb)));
    assert!(plan.image_references().is_empty());
}

#[test]
fn image_references_follow_paint_order() {
    let mut def = TemplateDefinition::default_card();
    def.background_image = Some("bg.png".to_owned());
    let mut values = FieldValues::new();
    values.insert("illustration".to_owned(), "art.png".to_owned());

    let plan = RasterPlan::build(&def, &values, 250.0, false).unwrap();
    assert_eq!(plan.image_references(), vec!["bg.png", "art.png"]);
    assert_eq!(plan.illustration_references(), vec!["art.png".to_owned()]);
    assert!(matches!(
        plan.background,
        BackgroundPlan::Image {
            fit: BackgroundFit::Cover,
            fallback_fill: Some(Rgba8::WHITE),
            ..
        }
    ));
}

#[test]
fn odd_render_width_rounds_pixels_but_not_geometry() {
    let def = TemplateDefinition::default_card();
    let plan = RasterPlan::build(&def, &FieldValues::new(), 333.0, false).unwrap();
    assert_eq!(plan.width_px, 333);
    assert_eq!(plan.height_px, 466);
    assert!((plan.canvas.height - 466.2).abs() < 1e-9);
}

#[test]
fn rejects_bad_render_width_and_huge_canvases() {
    let def = TemplateDefinition::default_card();
    assert!(RasterPlan::build(&def, &FieldValues::new(), 0.0, false).is_err());
    assert!(RasterPlan::build(&def, &FieldValues::new(), f64::NAN, false).is_err());
    assert!(RasterPlan::build(&def, &FieldValues::new(), 100_000.0, false).is_err());
}

#[test]
fn illustration_sharing_the_background_is_not_listed() {
    let mut def = TemplateDefinition::default_card();
    def.background_image = Some("bg.png".to_owned());
    let mut values = FieldValues::new();
    values.insert("illustration".to_owned(), "bg.png".to_owned());

    let plan = RasterPlan::build(&def, &values, 250.0, false).unwrap();
    assert!(plan.illustration_references().is_empty());
}
