//! Export rasterizer on `vello_cpu`.
//!
//! Rasterization runs in two phases. Images are loaded first, one at a time in paint order,
//! through the async [`ImageCache`]. The paint pass then runs on the blocking pool against a
//! private `RenderContext`, so later fields always paint over earlier ones and no runtime worker
//! is held for the length of a raster.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use kurbo::Shape;

use crate::assets::decode::PreparedImage;
use crate::assets::fonts::{FontBook, FontFace, GlyphBrush, TextLayoutEngine};
use crate::assets::loader::{ImageCache, ImageLoader, short_ref};
use crate::fit::compute_fit;
use crate::foundation::core::{Affine, Rect, Rgba8, Rgba8Premul};
use crate::foundation::error::{CardError, CardResult};
use crate::render::plan::{BackgroundPlan, FieldPaint, FieldPlan, RasterPlan, TextPlan};
use crate::template::model::{BackgroundFit, ClipShape, FieldValues, TemplateDefinition, TextAlign};

/// Curve flattening tolerance for rounded rects and ellipses.
const PATH_TOLERANCE: f64 = 0.1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterOptions {
    /// Paint type placeholders for unbound fields, as the editor preview does.
    pub placeholders: bool,
}

/// A finished card surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardRaster {
    pub width: u32,
    pub height: u32,
    /// Row-major premultiplied RGBA8.
    pub data: Vec<u8>,
}

impl CardRaster {
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8Premul> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some(Rgba8Premul {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        })
    }

    /// Straight-alpha copy for encoding.
    pub fn to_rgba_image(&self) -> CardResult<image::RgbaImage> {
        let mut straight = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            let c = Rgba8Premul {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            }
            .to_straight();
            straight.extend_from_slice(&[c.r, c.g, c.b, c.a]);
        }
        image::RgbaImage::from_raw(self.width, self.height, straight)
            .ok_or_else(|| CardError::render("raster buffer does not match its dimensions"))
    }

    pub fn encode_png(&self) -> CardResult<Vec<u8>> {
        let img = self.to_rgba_image()?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| CardError::render(format!("encode png: {e}")))?;
        Ok(buf)
    }

    /// Opaque RGB8 composited over white, as embedded in PDF pages.
    pub fn to_rgb_on_white(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() / 4 * 3);
        for px in self.data.chunks_exact(4) {
            // Premultiplied source-over white: c + (255 - a).
            let inv = 255 - px[3];
            out.extend(px[..3].iter().map(|&c| c.saturating_add(inv)));
        }
        out
    }
}

/// Flattens a template and its values into a [`CardRaster`].
///
/// Holds a decoded-image cache, so rasterizing a batch through one instance decodes shared
/// images once.
pub struct CardRasterizer {
    images: ImageCache,
    fonts: Arc<FontBook>,
    opts: RasterOptions,
}

impl CardRasterizer {
    pub fn new(loader: Arc<dyn ImageLoader>, fonts: Arc<FontBook>) -> Self {
        Self {
            images: ImageCache::new(loader),
            fonts,
            opts: RasterOptions::default(),
        }
    }

    pub fn with_options(mut self, opts: RasterOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn options(&self) -> RasterOptions {
        self.opts
    }

    /// Natural size of an image reference, loading it if needed.
    pub async fn image_size(&self, reference: &str) -> Option<kurbo::Size> {
        self.images
            .get(reference)
            .await
            .ok()
            .map(|img| img.natural_size())
    }

    #[tracing::instrument(skip(self, def, values), fields(fields = def.fields.len()))]
    pub async fn rasterize(
        &self,
        def: &TemplateDefinition,
        values: &FieldValues,
        render_width: f64,
    ) -> CardResult<CardRaster> {
        let plan = RasterPlan::build(def, values, render_width, self.opts.placeholders)?;
        tracing::debug!(
            width = plan.width_px,
            height = plan.height_px,
            fields = plan.fields.len(),
            "raster plan"
        );

        let mut loaded = HashMap::new();
        for reference in plan.image_references() {
            if loaded.contains_key(reference) {
                continue;
            }
            match self.images.get(reference).await {
                Ok(img) => {
                    loaded.insert(reference.to_owned(), img);
                }
                Err(e) => {
                    tracing::warn!(reference = short_ref(reference), error = %e, "image unavailable, skipping");
                }
            }
        }
        let illustrations = plan.illustration_references();

        let fonts = Arc::clone(&self.fonts);
        let span = tracing::Span::current();
        let raster = tokio::task::spawn_blocking(move || {
            span.in_scope(|| paint(&plan, &loaded, &fonts))
        })
        .await
        .map_err(|e| CardError::render(format!("paint task failed: {e}")))??;

        // Illustrations are usually unique per card; backgrounds stay cached for the batch.
        for reference in &illustrations {
            self.images.evict(reference).await;
        }
        Ok(raster)
    }
}

struct Painter<'a> {
    ctx: vello_cpu::RenderContext,
    images: &'a HashMap<String, Arc<PreparedImage>>,
    pixmaps: HashMap<String, Arc<vello_cpu::Pixmap>>,
    fonts: &'a FontBook,
    text: TextLayoutEngine,
    font_data: HashMap<usize, vello_cpu::peniko::FontData>,
}

/// Synchronous paint pass over an already-loaded image set.
pub(crate) fn paint(
    plan: &RasterPlan,
    images: &HashMap<String, Arc<PreparedImage>>,
    fonts: &FontBook,
) -> CardResult<CardRaster> {
    let w = to_u16(plan.width_px, "canvas width")?;
    let h = to_u16(plan.height_px, "canvas height")?;

    let mut painter = Painter {
        ctx: vello_cpu::RenderContext::new(w, h),
        images,
        pixmaps: HashMap::new(),
        fonts,
        text: TextLayoutEngine::new(),
        font_data: HashMap::new(),
    };
    painter.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

    painter.background(plan)?;
    for field in &plan.fields {
        painter.field(field)?;
    }

    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    painter.ctx.flush();
    painter.ctx.render_to_pixmap(&mut pixmap);

    Ok(CardRaster {
        width: plan.width_px,
        height: plan.height_px,
        data: pixmap.data_as_u8_slice().to_vec(),
    })
}

impl Painter<'_> {
    fn background(&mut self, plan: &RasterPlan) -> CardResult<()> {
        let canvas = Rect::from_origin_size((0.0, 0.0), plan.canvas);
        match &plan.background {
            BackgroundPlan::Solid {
                fill,
                corner_radius,
                border,
            } => {
                if let Some(c) = fill {
                    self.fill_shape(canvas, *corner_radius, *c);
                }
                if let Some(b) = border {
                    let inset = canvas.inset(-b.width / 2.0);
                    let path = rounded_path(inset, *corner_radius);
                    self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                    self.ctx.set_stroke(vello_cpu::kurbo::Stroke::new(b.width));
                    self.ctx.set_paint(color_to_cpu(b.color));
                    self.ctx.stroke_path(&path);
                }
            }
            BackgroundPlan::Image {
                reference,
                fit,
                fallback_fill,
            } => {
                if !self.draw_image_fit(reference, canvas, *fit)? {
                    if let Some(c) = fallback_fill {
                        self.fill_shape(canvas, 0.0, *c);
                    }
                }
            }
        }
        Ok(())
    }

    fn field(&mut self, field: &FieldPlan) -> CardResult<()> {
        if let Some(c) = field.fill {
            self.fill_shape(field.rect, field.corner_radius, c);
        }
        match &field.paint {
            FieldPaint::Empty => {}
            FieldPaint::Image { reference, clip } => {
                let clip_path = match clip {
                    ClipShape::Ellipse => ellipse_path(field.rect),
                    ClipShape::Rectangle => rounded_path(field.rect, field.corner_radius),
                };
                self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                self.ctx.push_clip_layer(&clip_path);
                let drawn = self.draw_image_fit(reference, field.rect, BackgroundFit::Fill);
                self.ctx.pop_layer();
                drawn?;
            }
            FieldPaint::Text(text) => self.draw_text(field.rect, text)?,
        }
        Ok(())
    }

    fn fill_shape(&mut self, rect: Rect, radius: f64, color: Rgba8) {
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(color_to_cpu(color));
        if radius > 0.0 {
            self.ctx.fill_path(&rounded_path(rect, radius));
        } else {
            self.ctx.fill_rect(&rect_to_cpu(rect));
        }
    }

    /// Draw an image into `target` with `fit`. Returns `false` if the image was not loaded.
    fn draw_image_fit(&mut self, reference: &str, target: Rect, fit: BackgroundFit) -> CardResult<bool> {
        let Some(prepared) = self.images.get(reference).cloned() else {
            return Ok(false);
        };
        let size = prepared.natural_size();
        let Some(rects) = compute_fit(size.width, size.height, target.width(), target.height(), fit)
            .map(|r| r.offset(target.x0, target.y0))
        else {
            return Ok(false);
        };

        let pixmap = self.pixmap_for(reference, &prepared)?;
        let (src, dst) = (rects.source, rects.dest);
        let tr = Affine::translate((dst.x0, dst.y0))
            * Affine::scale_non_uniform(dst.width() / src.width(), dst.height() / src.height())
            * Affine::translate((-src.x0, -src.y0));

        self.ctx.set_transform(affine_to_cpu(tr));
        self.ctx.set_paint(vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(pixmap),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        });
        self.ctx.fill_rect(&rect_to_cpu(src));
        Ok(true)
    }

    fn pixmap_for(
        &mut self,
        reference: &str,
        prepared: &PreparedImage,
    ) -> CardResult<Arc<vello_cpu::Pixmap>> {
        if let Some(p) = self.pixmaps.get(reference) {
            return Ok(Arc::clone(p));
        }
        let pixmap = Arc::new(pixmap_from_premul_bytes(
            &prepared.rgba8_premul,
            prepared.width,
            prepared.height,
        )?);
        self.pixmaps.insert(reference.to_owned(), Arc::clone(&pixmap));
        Ok(pixmap)
    }

    fn font_data_for(&mut self, face: &FontFace) -> vello_cpu::peniko::FontData {
        let key = Arc::as_ptr(&face.bytes) as usize;
        self.font_data
            .entry(key)
            .or_insert_with(|| {
                vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(face.bytes.as_ref().clone()),
                    0,
                )
            })
            .clone()
    }

    fn draw_text(&mut self, rect: Rect, text: &TextPlan) -> CardResult<()> {
        if text.font_px <= 0.0 {
            return Ok(());
        }
        let Some(face) = self.fonts.resolve(&text.font_family, &text.font_weight).cloned() else {
            tracing::warn!(family = %text.font_family, "no font registered, skipping text");
            return Ok(());
        };

        let layout = self.text.layout_line(
            &text.text,
            &face,
            text.font_px as f32,
            GlyphBrush::from(text.color),
        )?;
        let font = self.font_data_for(&face);

        let line_w = f64::from(layout.width());
        let line_h = f64::from(layout.height());
        let x = match text.align {
            TextAlign::Left => rect.x0 + text.padding,
            TextAlign::Center => rect.center().x - line_w / 2.0,
            TextAlign::Right => rect.x1 - text.padding - line_w,
        };
        let y = rect.center().y - line_h / 2.0;

        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.push_clip_layer(&rounded_path(rect, 0.0));
        self.ctx
            .set_transform(affine_to_cpu(Affine::translate((x, y))));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                self.ctx
                    .glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        self.ctx.pop_layer();
        Ok(())
    }
}

fn to_u16(v: u32, what: &str) -> CardResult<u16> {
    v.try_into()
        .map_err(|_| CardError::render(format!("{what} {v} exceeds u16")))
}

fn color_to_cpu(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn shape_to_cpu(shape: &impl Shape) -> vello_cpu::kurbo::BezPath {
    let mut p = vello_cpu::kurbo::BezPath::new();
    for el in shape.path_elements(PATH_TOLERANCE) {
        p.push(el);
    }
    p
}

fn rounded_path(rect: Rect, radius: f64) -> vello_cpu::kurbo::BezPath {
    let radius = radius.max(0.0).min(rect.width().min(rect.height()) / 2.0);
    shape_to_cpu(&kurbo::RoundedRect::from_rect(rect, radius))
}

fn ellipse_path(rect: Rect) -> vello_cpu::kurbo::BezPath {
    shape_to_cpu(&kurbo::Ellipse::from_rect(rect))
}

fn pixmap_from_premul_bytes(bytes: &[u8], width: u32, height: u32) -> CardResult<vello_cpu::Pixmap> {
    let w = to_u16(width, "image width")?;
    let h = to_u16(height, "image height")?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(CardError::render("pixmap byte len mismatch"));
    }
    // Pixmap stores PremulRgba8; our bytes are already premultiplied.
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
