use std::collections::BTreeMap;

use async_trait::async_trait;

use super::*;
use crate::assets::fonts::FontBook;
use crate::assets::loader::ImageLoader;
use crate::print::layout::PageSize;
use crate::template::model::{FieldValues, TemplateDefinition};

struct NoImages;

#[async_trait]
impl ImageLoader for NoImages {
    async fn load_bytes(&self, reference: &str) -> CardResult<Vec<u8>> {
        Err(CardError::asset(format!("no images in tests: {reference}")))
    }
}

fn rasterizer() -> Arc<CardRasterizer> {
    Arc::new(CardRasterizer::new(Arc::new(NoImages), Arc::new(FontBook::new())))
}

fn card(id: &str, template_id: &str) -> PrintCard {
    PrintCard {
        id: id.to_owned(),
        template_id: template_id.to_owned(),
        field_values: FieldValues::new(),
    }
}

fn options(cards_per_row: u32) -> ExportOptions {
    ExportOptions::new(PrintSettings::new(PageSize::A4, cards_per_row).unwrap())
}

#[test]
fn render_width_scales_with_card_width() {
    let opts = options(3);
    assert_eq!(opts.render_width_px(50.0), 378.0);
    assert_eq!(opts.render_width_px(0.0), 1.0);
}

#[tokio::test]
async fn exports_pages_in_layout_order() {
    let mut templates = BTreeMap::new();
    templates.insert("std".to_owned(), TemplateDefinition::default_card());
    let cards: Vec<_> = (0..7).map(|i| card(&format!("c{i}"), "std")).collect();

    // A4 with 4 per row and aspect 1.4 fits 4 rows: 16 per page.
    let mut opts = options(4);
    opts.max_concurrent_cards = 2;
    opts.supersample = 1.0;
    let out = export_pdf(&cards, &templates, rasterizer(), &opts).await.unwrap();

    assert_eq!(out.layout.page_count, 1);
    assert_eq!(out.layout.cards.len(), 7);
    let doc = lopdf::Document::load_mem(&out.bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[tokio::test]
async fn missing_templates_do_not_fail_the_batch() {
    let mut templates = BTreeMap::new();
    templates.insert("std".to_owned(), TemplateDefinition::default_card());
    let cards = vec![card("a", "std"), card("gone", "deleted"), card("b", "std")];

    let mut opts = options(2);
    opts.supersample = 0.5;
    let out = export_pdf(&cards, &templates, rasterizer(), &opts).await.unwrap();
    assert_eq!(out.layout.skipped, vec!["gone".to_owned()]);
    assert_eq!(out.layout.cards.len(), 2);
}

#[tokio::test]
async fn a_broken_card_fails_the_whole_export() {
    let mut broken = TemplateDefinition::default_card();
    broken.background_color = "definitely not a colour".to_owned();
    let mut templates = BTreeMap::new();
    templates.insert("std".to_owned(), TemplateDefinition::default_card());
    templates.insert("broken".to_owned(), broken);
    let cards = vec![card("ok", "std"), card("bad", "broken")];

    let err = export_pdf(&cards, &templates, rasterizer(), &options(2))
        .await
        .unwrap_err();
    match err {
        CardError::Export(msg) => assert!(msg.contains("bad"), "{msg}"),
        other => panic!("expected export error, got {other:?}"),
    }
}

#[tokio::test]
async fn nothing_printable_is_an_error() {
    let templates: BTreeMap<String, TemplateDefinition> = BTreeMap::new();
    let err = export_pdf(&[card("x", "nope")], &templates, rasterizer(), &options(2))
        .await
        .unwrap_err();
    assert!(matches!(err, CardError::Export(_)));
}
