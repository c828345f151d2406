use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::foundation::error::{CardError, CardResult};
use crate::print::layout::{PageSize, Placement};
use crate::render::cpu::CardRaster;

const PT_PER_MM: f64 = 72.0 / 25.4;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

/// A raster and the page rectangle it should cover, in millimetres from the top-left.
#[derive(Clone, Copy, Debug)]
pub struct PlacedRaster<'a> {
    pub raster: &'a CardRaster,
    pub placement: Placement,
}

/// Multi-page PDF writer. Each card becomes one flate-compressed RGB image XObject.
pub struct PdfComposer {
    document: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    page_width_pt: f64,
    page_height_pt: f64,
}

impl PdfComposer {
    pub fn new(page_size: PageSize) -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        let (w, h) = page_size.dimensions_mm();
        Self {
            document,
            pages_id,
            page_ids: Vec::new(),
            page_width_pt: mm_to_pt(w),
            page_height_pt: mm_to_pt(h),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn add_page(&mut self, cards: &[PlacedRaster<'_>]) -> CardResult<()> {
        let mut xobjects = Dictionary::new();
        let mut content = Content {
            operations: Vec::with_capacity(cards.len() * 4),
        };

        for (i, card) in cards.iter().enumerate() {
            let name = format!("Im{i}");
            let image_id = self.add_image(card.raster)?;
            xobjects.set(name.as_bytes().to_vec(), image_id);

            let p = card.placement;
            let w = mm_to_pt(p.width_mm);
            let h = mm_to_pt(p.height_mm);
            let x = mm_to_pt(p.x_mm);
            // PDF user space grows upwards from the bottom-left.
            let y = self.page_height_pt - mm_to_pt(p.y_mm + p.height_mm);

            content.operations.push(Operation::new("q", vec![]));
            content.operations.push(Operation::new(
                "cm",
                vec![
                    (w as f32).into(),
                    0.into(),
                    0.into(),
                    (h as f32).into(),
                    (x as f32).into(),
                    (y as f32).into(),
                ],
            ));
            content
                .operations
                .push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
            content.operations.push(Operation::new("Q", vec![]));
        }

        let encoded = content
            .encode()
            .map_err(|e| CardError::export(format!("encode page content: {e}")))?;
        let content_stream = Stream::new(dictionary! { "Filter" => "FlateDecode" }, deflate(&encoded)?);
        let content_id = self.document.add_object(content_stream);

        let page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                (self.page_width_pt as f32).into(),
                (self.page_height_pt as f32).into(),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        };
        let page_id = self.document.add_object(page_dict);
        self.page_ids.push(page_id);
        Ok(())
    }

    fn add_image(&mut self, raster: &CardRaster) -> CardResult<ObjectId> {
        let rgb = raster.to_rgb_on_white();
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(raster.width),
            "Height" => i64::from(raster.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        };
        Ok(self.document.add_object(Stream::new(dict, deflate(&rgb)?)))
    }

    /// Write the page tree and serialize the document.
    pub fn finish(mut self) -> CardResult<Vec<u8>> {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::from(*id)).collect();
        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        self.document
            .save_to(&mut out)
            .map_err(|e| CardError::export(format!("write pdf: {e}")))?;
        Ok(out)
    }
}

fn deflate(bytes: &[u8]) -> CardResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| CardError::export(format!("deflate stream: {e}")))?;
    encoder
        .finish()
        .map_err(|e| CardError::export(format!("deflate stream: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/print/pdf.rs"]
mod tests;
