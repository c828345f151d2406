use std::collections::HashMap;
use std::io::Cursor;

use async_trait::async_trait;

use super::*;

const REGULAR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/fonts/DejaVuSans.ttf");

fn solid_png(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

struct MapLoader(HashMap<String, Vec<u8>>);

#[async_trait]
impl ImageLoader for MapLoader {
    async fn load_bytes(&self, reference: &str) -> CardResult<Vec<u8>> {
        self.0
            .get(reference)
            .cloned()
            .ok_or_else(|| CardError::asset(format!("missing {reference}")))
    }
}

fn rasterizer(images: &[(&str, Vec<u8>)], fonts: FontBook) -> CardRasterizer {
    let map = images
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect();
    CardRasterizer::new(Arc::new(MapLoader(map)), Arc::new(fonts))
}

struct TallyLoader {
    bytes: Vec<u8>,
    calls: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl ImageLoader for TallyLoader {
    async fn load_bytes(&self, reference: &str) -> CardResult<Vec<u8>> {
        self.calls.lock().unwrap().push(reference.to_owned());
        tokio::task::yield_now().await;
        Ok(self.bytes.clone())
    }
}

impl TallyLoader {
    fn count(&self, reference: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| *r == reference).count()
    }
}

fn straight(r: &CardRaster, x: u32, y: u32) -> Rgba8 {
    r.pixel(x, y).unwrap().to_straight()
}

#[tokio::test]
async fn solid_background_border_and_rounded_corners() {
    let r = rasterizer(&[], FontBook::new());
    let def = TemplateDefinition::default_card();
    let raster = r.rasterize(&def, &FieldValues::new(), 250.0).await.unwrap();

    assert_eq!((raster.width, raster.height), (250, 350));
    assert_eq!(raster.data.len(), 250 * 350 * 4);
    // Gap between the name and illustration boxes.
    assert_eq!(straight(&raster, 125, 38), Rgba8::WHITE);
    // Border stroke along the top edge.
    assert_eq!(straight(&raster, 125, 1), Rgba8::opaque(0xd1, 0xd5, 0xdb));
    // Outside the rounded corner.
    assert_eq!(raster.pixel(0, 0).unwrap().a, 0);
    // Export mode: unbound illustration is just its fill.
    assert_eq!(straight(&raster, 125, 100), Rgba8::opaque(0xe5, 0xe7, 0xeb));
    assert_eq!(raster.pixel(250, 0), None);
}

#[tokio::test]
async fn illustration_fills_its_box_and_respects_ellipse_clip() {
    let art = solid_png(8, 3, [200, 0, 0, 255]);
    let r = rasterizer(&[("art.png", art)], FontBook::new());
    let mut def = TemplateDefinition::default_card();
    let mut values = FieldValues::new();
    values.insert("illustration".to_owned(), "art.png".to_owned());

    let raster = r.rasterize(&def, &values, 250.0).await.unwrap();
    // Rect x 12.5..237.5, y 42..182; a non-matching aspect still covers the corners.
    assert_eq!(straight(&raster, 125, 100), Rgba8::opaque(200, 0, 0));
    assert_eq!(straight(&raster, 15, 45), Rgba8::opaque(200, 0, 0));

    let mut illus = def.field("illustration").unwrap().clone();
    illus.clip_shape = Some(ClipShape::Ellipse);
    def = def.with_field_replaced(illus);
    let raster = r.rasterize(&def, &values, 250.0).await.unwrap();
    assert_eq!(straight(&raster, 125, 100), Rgba8::opaque(200, 0, 0));
    assert_eq!(straight(&raster, 14, 44), Rgba8::opaque(0xe5, 0xe7, 0xeb));
}

#[tokio::test]
async fn broken_images_degrade_without_failing() {
    let r = rasterizer(&[], FontBook::new());
    let mut def = TemplateDefinition::default_card();
    def.background_image = Some("gone.png".to_owned());
    let mut values = FieldValues::new();
    values.insert("illustration".to_owned(), "also-gone.png".to_owned());

    let raster = r.rasterize(&def, &values, 250.0).await.unwrap();
    // Fallback fill covers the whole canvas, corners included.
    assert_eq!(straight(&raster, 0, 0), Rgba8::WHITE);
    assert_eq!(straight(&raster, 125, 100), Rgba8::opaque(0xe5, 0xe7, 0xeb));
}

#[tokio::test]
async fn background_image_covers_canvas() {
    let bg = solid_png(4, 4, [0, 0, 180, 255]);
    let r = rasterizer(&[("bg.png", bg)], FontBook::new());
    let mut def = TemplateDefinition::default_card();
    def.background_image = Some("bg.png".to_owned());

    let raster = r.rasterize(&def, &FieldValues::new(), 250.0).await.unwrap();
    assert_eq!(straight(&raster, 0, 0), Rgba8::opaque(0, 0, 180));
    assert_eq!(straight(&raster, 249, 349), Rgba8::opaque(0, 0, 180));
    assert_eq!(straight(&raster, 125, 38), Rgba8::opaque(0, 0, 180));
}

#[tokio::test]
async fn text_is_painted_with_registered_font() {
    let mut fonts = FontBook::new();
    fonts.load_default(REGULAR).unwrap();
    let r = rasterizer(&[], fonts);
    let def = TemplateDefinition::default_card();
    let mut values = FieldValues::new();
    values.insert("name".to_owned(), "WWWW".to_owned());

    let raster = r.rasterize(&def, &values, 250.0).await.unwrap();
    // Name box: x 12.5..237.5, y 7..35.
    let inked = (7..35)
        .flat_map(|y| (13..237).map(move |x| (x, y)))
        .filter(|&(x, y)| straight(&raster, x, y) != Rgba8::WHITE)
        .count();
    assert!(inked > 20, "expected glyph coverage, got {inked} pixels");

    // Nothing is painted outside the name box row band.
    assert_eq!(straight(&raster, 125, 38), Rgba8::WHITE);
}

#[tokio::test]
async fn missing_font_skips_text() {
    let r = rasterizer(&[], FontBook::new());
    let def = TemplateDefinition::default_card();
    let mut values = FieldValues::new();
    values.insert("name".to_owned(), "WWWW".to_owned());
    let raster = r.rasterize(&def, &values, 250.0).await.unwrap();
    let blank = r
        .rasterize(&def, &FieldValues::new(), 250.0)
        .await
        .unwrap();
    assert_eq!(raster, blank);
}

#[tokio::test]
async fn rasterizing_twice_is_deterministic() {
    let mut fonts = FontBook::new();
    fonts.load_default(REGULAR).unwrap();
    let r = rasterizer(&[], fonts).with_options(RasterOptions { placeholders: true });
    let def = TemplateDefinition::default_card();
    let a = r.rasterize(&def, &FieldValues::new(), 300.0).await.unwrap();
    let b = r.rasterize(&def, &FieldValues::new(), 300.0).await.unwrap();
    assert_eq!(a, b);
    assert_eq!((a.width, a.height), (300, 420));
}

#[test]
fn rgb_on_white_and_png_encoding() {
    let raster = CardRaster {
        width: 2,
        height: 1,
        data: vec![0, 0, 0, 0, 128, 0, 0, 128],
    };
    assert_eq!(raster.to_rgb_on_white(), vec![255, 255, 255, 255, 127, 127]);

    let png = raster.encode_png().unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(1, 0).0, [255, 0, 0, 128]);
}

#[test]
fn pixmap_rejects_mismatched_buffers() {
    assert!(pixmap_from_premul_bytes(&[0; 8], 2, 1).is_ok());
    assert!(pixmap_from_premul_bytes(&[0; 7], 2, 1).is_err());
    assert!(pixmap_from_premul_bytes(&[], 70_000, 0).is_err());
}

#[tokio::test]
async fn background_stays_cached_while_illustrations_are_released() {
    let loader = Arc::new(TallyLoader {
        bytes: solid_png(4, 4, [0, 90, 0, 255]),
        calls: std::sync::Mutex::new(Vec::new()),
    });
    let r = CardRasterizer::new(loader.clone(), Arc::new(FontBook::new()));
    let mut def = TemplateDefinition::default_card();
    def.background_image = Some("bg.png".to_owned());
    let mut values = FieldValues::new();
    values.insert("illustration".to_owned(), "art.png".to_owned());

    r.rasterize(&def, &values, 100.0).await.unwrap();
    r.rasterize(&def, &values, 100.0).await.unwrap();
    assert_eq!(loader.count("bg.png"), 1);
    assert_eq!(loader.count("art.png"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_cards_fetch_a_shared_background_once() {
    let loader = Arc::new(TallyLoader {
        bytes: solid_png(4, 4, [0, 0, 90, 255]),
        calls: std::sync::Mutex::new(Vec::new()),
    });
    let r = Arc::new(CardRasterizer::new(loader.clone(), Arc::new(FontBook::new())));
    let mut def = TemplateDefinition::default_card();
    def.background_image = Some("bg.png".to_owned());
    let def = Arc::new(def);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..4 {
        let (r, def) = (Arc::clone(&r), Arc::clone(&def));
        tasks.spawn(async move { r.rasterize(&def, &FieldValues::new(), 60.0).await });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }
    assert_eq!(loader.count("bg.png"), 1);
}
