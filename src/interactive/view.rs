//! The interactive renderer: a positioned render tree for the live editing surface.
//!
//! A [`CardView`] is what a UI layer draws and hit-tests against. It is rebuilt on every change;
//! building is cheap and involves no I/O. Percentages map to pixels through
//! [`field_rect_px`], and background images go through [`compute_fit`], the same way the export
//! rasterizer places them.

use serde::Serialize;

use crate::assets::color::{EMPTY_IMAGE_FILL, parse_css_color, parse_css_color_or};
use crate::fit::{FitRects, compute_fit};
use crate::foundation::core::{Point, Rect, Rgba8, Size};
use crate::foundation::error::CardResult;
use crate::interactive::gesture::Corner;
use crate::template::geometry::field_rect_px;
use crate::template::model::{
    BackgroundFit, ClipShape, FieldType, FieldValues, TemplateDefinition, TemplateField, TextAlign,
};

/// Side length of a corner resize handle, in view pixels.
pub const HANDLE_SIZE_PX: f64 = 10.0;

const SELECTION_COLOR: Rgba8 = Rgba8::opaque(0x3b, 0x82, 0xf6);
const EMPTY_IMAGE_GLYPH_COLOR: Rgba8 = Rgba8::opaque(0x9c, 0xa3, 0xaf);

#[derive(Clone, Debug, PartialEq)]
pub struct ViewOptions {
    pub scale: f64,
    pub selected_field_id: Option<String>,
    /// Show resize handles on the selected field.
    pub resizable: bool,
    /// Substitute type placeholders for unbound values.
    pub placeholders: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            selected_field_id: None,
            resizable: false,
            placeholders: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardView {
    pub size: Size,
    pub scale: f64,
    pub background: BackgroundView,
    pub fields: Vec<FieldView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackgroundView {
    Solid {
        color: Option<Rgba8>,
        corner_radius: f64,
        border: Option<BorderView>,
    },
    Image {
        reference: String,
        fit: BackgroundFit,
        /// Known only when the caller supplied the image's natural size.
        placement: Option<FitRects>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BorderView {
    pub color: Rgba8,
    pub width: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldView {
    pub field_id: String,
    pub field_type: FieldType,
    pub label: String,
    pub rect: Rect,
    /// `rect` minus the text padding.
    pub content_rect: Rect,
    pub corner_radius: f64,
    pub fill: Option<Rgba8>,
    pub content: FieldContent,
    pub selected: bool,
    pub outline: Option<OutlineView>,
    pub handles: Vec<HandleView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldContent {
    /// Single line, clipped to the field and truncated.
    Text {
        text: String,
        font_px: f64,
        font_family: String,
        font_weight: String,
        color: Rgba8,
        align: TextAlign,
    },
    Image {
        reference: String,
        clip: ClipShape,
        placement: Option<FitRects>,
    },
    EmptyImage {
        glyph: &'static str,
        font_px: f64,
        color: Rgba8,
        fill: Rgba8,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OutlineView {
    /// Inner edge of the outline stroke.
    pub rect: Rect,
    pub width: f64,
    pub color: Rgba8,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HandleView {
    pub corner: Corner,
    pub rect: Rect,
}

/// What lies under a pointer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HitTarget {
    Handle { field_id: String, corner: Corner },
    Field { field_id: String },
    Background,
    Outside,
}

impl CardView {
    /// Build the view with no image sizes known.
    pub fn build(
        def: &TemplateDefinition,
        values: &FieldValues,
        opts: &ViewOptions,
    ) -> CardResult<Self> {
        Self::build_with_image_sizes(def, values, opts, |_| None)
    }

    /// Build the view; `image_size` reports natural pixel sizes of already-loaded images so
    /// placements can be resolved.
    pub fn build_with_image_sizes(
        def: &TemplateDefinition,
        values: &FieldValues,
        opts: &ViewOptions,
        image_size: impl Fn(&str) -> Option<Size>,
    ) -> CardResult<Self> {
        def.validate()?;
        let scale = opts.scale;
        let size = Size::new(def.width * scale, def.height * scale);

        let background = match def.background_image_ref() {
            Some(reference) => {
                let fit = def.background_fit();
                let placement = image_size(reference)
                    .and_then(|s| compute_fit(s.width, s.height, size.width, size.height, fit));
                BackgroundView::Image {
                    reference: reference.to_owned(),
                    fit,
                    placement,
                }
            }
            None => {
                let border = parse_css_color(&def.border_color)?
                    .filter(|_| def.border_width > 0.0)
                    .map(|color| BorderView {
                        color,
                        width: def.border_width * scale,
                    });
                BackgroundView::Solid {
                    color: parse_css_color(&def.background_color)?,
                    corner_radius: def.border_radius * scale,
                    border,
                }
            }
        };

        let mut fields = Vec::with_capacity(def.fields.len());
        for field in def.visible_fields() {
            fields.push(field_view(field, values, opts, size, &image_size)?);
        }

        Ok(Self {
            size,
            scale,
            background,
            fields,
        })
    }

    pub fn field(&self, id: &str) -> Option<&FieldView> {
        self.fields.iter().find(|f| f.field_id == id)
    }

    /// Resolve what a pointer at `p` (view pixels) would press.
    ///
    /// Handles win over field bodies; among fields the topmost (last painted) wins.
    pub fn hit_test(&self, p: Point) -> HitTarget {
        for f in &self.fields {
            for h in &f.handles {
                if h.rect.contains(p) {
                    return HitTarget::Handle {
                        field_id: f.field_id.clone(),
                        corner: h.corner,
                    };
                }
            }
        }
        if let Some(f) = self.fields.iter().rev().find(|f| f.rect.contains(p)) {
            return HitTarget::Field {
                field_id: f.field_id.clone(),
            };
        }
        if Rect::from_origin_size(Point::ZERO, self.size).contains(p) {
            HitTarget::Background
        } else {
            HitTarget::Outside
        }
    }
}

fn field_view(
    field: &TemplateField,
    values: &FieldValues,
    opts: &ViewOptions,
    container: Size,
    image_size: &impl Fn(&str) -> Option<Size>,
) -> CardResult<FieldView> {
    let scale = opts.scale;
    let rect = field_rect_px(field.geometry, container);
    let pad_x = 4.0 * scale;
    let pad_y = 2.0 * scale;
    let content_rect = Rect::new(
        rect.x0 + pad_x,
        rect.y0 + pad_y,
        (rect.x1 - pad_x).max(rect.x0 + pad_x),
        (rect.y1 - pad_y).max(rect.y0 + pad_y),
    );
    let fill = parse_css_color(&field.background_color)?;
    let value = field.display_value(values, opts.placeholders);

    let content = if field.field_type.is_image() {
        if value.is_empty() {
            FieldContent::EmptyImage {
                glyph: "IMG",
                font_px: field.font_size * scale * 0.5,
                color: EMPTY_IMAGE_GLYPH_COLOR,
                fill: fill.unwrap_or(EMPTY_IMAGE_FILL),
            }
        } else {
            // Illustrations always fill their box.
            let placement = image_size(value).and_then(|s| {
                compute_fit(s.width, s.height, rect.width(), rect.height(), BackgroundFit::Fill)
                    .map(|r| r.offset(rect.x0, rect.y0))
            });
            FieldContent::Image {
                reference: value.to_owned(),
                clip: field.clip_shape.unwrap_or_default(),
                placement,
            }
        }
    } else {
        FieldContent::Text {
            text: value.to_owned(),
            font_px: field.font_size * scale,
            font_family: field.font_family.clone(),
            font_weight: field.font_weight.clone(),
            color: parse_css_color_or(&field.font_color, Rgba8::BLACK)?,
            align: field.text_align,
        }
    };

    let selected = opts.selected_field_id.as_deref() == Some(field.id.as_str());
    let outline = selected.then(|| OutlineView {
        rect: rect.inflate(scale, scale),
        width: 2.0 * scale,
        color: SELECTION_COLOR,
    });
    let handles = if selected && opts.resizable {
        Corner::ALL
            .iter()
            .map(|&corner| HandleView {
                corner,
                rect: Rect::from_center_size(
                    corner.point_on(rect),
                    Size::new(HANDLE_SIZE_PX, HANDLE_SIZE_PX),
                ),
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(FieldView {
        field_id: field.id.clone(),
        field_type: field.field_type,
        label: field.label.clone(),
        rect,
        content_rect,
        corner_radius: field.border_radius * scale,
        fill,
        content,
        selected,
        outline,
        handles,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/interactive/view.rs"]
mod tests;
