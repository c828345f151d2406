use std::collections::BTreeMap;

use pretty_assertions::assert_eq;

use super::*;

fn square_template() -> TemplateDefinition {
    let mut t = TemplateDefinition::default_card();
    t.width = 100.0;
    t.height = 100.0;
    t
}

fn cards(n: usize, template_id: &str) -> Vec<PrintCard> {
    (0..n)
        .map(|i| PrintCard {
            id: format!("card-{i}"),
            template_id: template_id.to_owned(),
            field_values: FieldValues::new(),
        })
        .collect()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn cards_per_row_must_be_two_to_four() {
    assert!(PrintSettings::new(PageSize::A4, 1).is_err());
    assert!(PrintSettings::new(PageSize::A4, 5).is_err());
    for n in 2..=4 {
        PrintSettings::new(PageSize::Letter, n).unwrap();
    }
    let err = PrintSettings::new(PageSize::A4, 7).unwrap_err();
    assert!(matches!(err, CardError::Layout(_)));
    assert!(PrintSettings::new(PageSize::A4, 2).unwrap().with_spacing(-1.0, 4.0).is_err());
}

#[test]
fn a4_grid_dimensions() {
    let settings = PrintSettings::new(PageSize::A4, 3).unwrap();
    let grid = PageGrid::new(&settings, 1.4).unwrap();
    assert!(approx(grid.card_width_mm, 182.0 / 3.0));
    assert!(approx(grid.card_height_mm, 182.0 / 3.0 * 1.4));
    assert_eq!(grid.rows_per_page, 3);
    assert_eq!(grid.cards_per_page(), 9);

    let p = grid.placement(4);
    assert_eq!((p.page, p.row, p.column), (0, 1, 1));
    assert!(approx(p.x_mm, 10.0 + grid.card_width_mm + 4.0));
    assert!(approx(p.y_mm, 10.0 + grid.card_height_mm + 4.0));

    let p = grid.placement(9);
    assert_eq!((p.page, p.row, p.column), (1, 0, 0));
    assert!(approx(p.x_mm, 10.0) && approx(p.y_mm, 10.0));
}

#[test]
fn tall_cards_still_get_one_row() {
    let settings = PrintSettings::new(PageSize::Letter, 2).unwrap();
    let grid = PageGrid::new(&settings, 10.0).unwrap();
    assert_eq!(grid.rows_per_page, 1);
    assert_eq!(grid.page_count(5), 3);
}

#[test]
fn pagination_fills_pages_of_twelve() {
    let mut templates = BTreeMap::new();
    templates.insert("sq".to_owned(), square_template());
    let settings = PrintSettings::new(PageSize::A4, 3).unwrap();

    for n in [1usize, 12, 13, 24, 30] {
        let layout = plan_print_layout(&cards(n, "sq"), &templates, &settings).unwrap();
        assert_eq!(layout.grid.rows_per_page, 4);
        assert_eq!(layout.page_count, n.div_ceil(12));

        let mut per_page = vec![0usize; layout.page_count];
        for c in &layout.cards {
            per_page[c.placement.page] += 1;
        }
        let (last, full) = per_page.split_last().unwrap();
        assert!(full.iter().all(|&k| k == 12));
        assert_eq!(*last, if n % 12 == 0 { 12 } else { n % 12 });
    }
}

#[test]
fn missing_templates_are_skipped_without_consuming_slots() {
    let mut templates = BTreeMap::new();
    templates.insert("sq".to_owned(), square_template());
    let mut batch = cards(3, "sq");
    batch.insert(1, PrintCard {
        id: "orphan".to_owned(),
        template_id: "deleted".to_owned(),
        field_values: FieldValues::new(),
    });

    let settings = PrintSettings::new(PageSize::A4, 2).unwrap();
    let layout = plan_print_layout(&batch, &templates, &settings).unwrap();
    assert_eq!(layout.skipped, vec!["orphan".to_owned()]);
    let slots: Vec<_> = layout
        .cards
        .iter()
        .map(|c| (c.card_index, c.placement.row, c.placement.column))
        .collect();
    assert_eq!(slots, vec![(0, 0, 0), (2, 0, 1), (3, 1, 0)]);
}

#[test]
fn first_card_sets_aspect_with_fallback() {
    let mut templates = BTreeMap::new();
    templates.insert("sq".to_owned(), square_template());
    templates.insert("tall".to_owned(), TemplateDefinition::default_card());
    let settings = PrintSettings::new(PageSize::A4, 2).unwrap();

    let mut batch = cards(1, "sq");
    batch.extend(cards(1, "tall"));
    let layout = plan_print_layout(&batch, &templates, &settings).unwrap();
    assert!(approx(layout.grid.card_height_mm, layout.grid.card_width_mm));

    let mut batch = cards(1, "missing");
    batch.extend(cards(1, "sq"));
    let layout = plan_print_layout(&batch, &templates, &settings).unwrap();
    assert!(approx(
        layout.grid.card_height_mm,
        layout.grid.card_width_mm * FALLBACK_ASPECT_RATIO
    ));
    assert_eq!(layout.cards.len(), 1);
}

#[test]
fn empty_batch_has_no_pages() {
    let templates: BTreeMap<String, TemplateDefinition> = BTreeMap::new();
    let settings = PrintSettings::new(PageSize::Letter, 4).unwrap();
    let layout = plan_print_layout(&[], &templates, &settings).unwrap();
    assert_eq!(layout.page_count, 0);
    assert!(layout.cards.is_empty());
}

#[test]
fn page_size_tokens() {
    assert_eq!(serde_json::to_string(&PageSize::Letter).unwrap(), "\"Letter\"");
    let s: PrintSettings = serde_json::from_str(r#"{"pageSize":"A4","cardsPerRow":3}"#).unwrap();
    assert_eq!(s.margin_mm, DEFAULT_MARGIN_MM);
    assert_eq!(PageSize::Letter.dimensions_mm(), (215.9, 279.4));
}
