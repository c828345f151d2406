use serde::Serialize;

use crate::assets::color::{EMPTY_IMAGE_FILL, parse_css_color, parse_css_color_or};
use crate::foundation::core::{Rect, Rgba8, Size};
use crate::foundation::error::{CardError, CardResult};
use crate::template::geometry::field_rect_px;
use crate::template::model::{
    BackgroundFit, ClipShape, FieldValues, TemplateDefinition, TemplateField, TextAlign,
};

/// Horizontal text inset in design units; multiplied by the render scale.
pub const TEXT_PADDING: f64 = 4.0;

/// Everything the paint pass needs, resolved to pixels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RasterPlan {
    pub scale: f64,
    /// Unrounded canvas size; field rectangles are computed against this.
    pub canvas: Size,
    pub width_px: u32,
    pub height_px: u32,
    pub background: BackgroundPlan,
    pub fields: Vec<FieldPlan>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackgroundPlan {
    Solid {
        fill: Option<Rgba8>,
        corner_radius: f64,
        border: Option<BorderPlan>,
    },
    Image {
        reference: String,
        fit: BackgroundFit,
        /// Painted over the whole canvas if the image cannot be loaded.
        fallback_fill: Option<Rgba8>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BorderPlan {
    pub color: Rgba8,
    pub width: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldPlan {
    pub field_id: String,
    pub rect: Rect,
    pub corner_radius: f64,
    pub fill: Option<Rgba8>,
    pub paint: FieldPaint,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldPaint {
    /// Background fill only.
    Empty,
    Text(TextPlan),
    Image { reference: String, clip: ClipShape },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextPlan {
    pub text: String,
    pub font_px: f64,
    pub font_family: String,
    pub font_weight: String,
    pub color: Rgba8,
    pub align: TextAlign,
    pub padding: f64,
}

impl RasterPlan {
    /// Resolve `def` and `values` at `render_width` pixels.
    ///
    /// With `placeholders` unset, unbound fields paint nothing but their background.
    pub fn build(
        def: &TemplateDefinition,
        values: &FieldValues,
        render_width: f64,
        placeholders: bool,
    ) -> CardResult<Self> {
        def.validate()?;
        if !(render_width.is_finite() && render_width > 0.0) {
            return Err(CardError::render(format!(
                "render width must be finite and positive, got {render_width}"
            )));
        }

        let scale = render_width / def.width;
        let canvas = Size::new(def.width * scale, def.height * scale);
        let width_px = pixel_extent(canvas.width)?;
        let height_px = pixel_extent(canvas.height)?;

        let background = match def.background_image_ref() {
            Some(reference) => BackgroundPlan::Image {
                reference: reference.to_owned(),
                fit: def.background_fit(),
                fallback_fill: parse_css_color(&def.background_color)?,
            },
            None => BackgroundPlan::Solid {
                fill: parse_css_color(&def.background_color)?,
                corner_radius: def.border_radius * scale,
                border: parse_css_color(&def.border_color)?
                    .filter(|_| def.border_width > 0.0)
                    .map(|color| BorderPlan {
                        color,
                        width: def.border_width * scale,
                    }),
            },
        };

        let fields = def
            .visible_fields()
            .map(|f| field_plan(f, values, scale, canvas, placeholders))
            .collect::<CardResult<Vec<_>>>()?;

        Ok(Self {
            scale,
            canvas,
            width_px,
            height_px,
            background,
            fields,
        })
    }

    /// Image references in paint order: background first, then illustrations.
    pub fn image_references(&self) -> Vec<&str> {
        let background = match &self.background {
            BackgroundPlan::Image { reference, .. } => Some(reference.as_str()),
            BackgroundPlan::Solid { .. } => None,
        };
        background
            .into_iter()
            .chain(self.fields.iter().filter_map(|f| match &f.paint {
                FieldPaint::Image { reference, .. } => Some(reference.as_str()),
                _ => None,
            }))
            .collect()
    }

    /// Image references bound to fields, minus the background reference.
    pub fn illustration_references(&self) -> Vec<String> {
        let background = match &self.background {
            BackgroundPlan::Image { reference, .. } => Some(reference.as_str()),
            BackgroundPlan::Solid { .. } => None,
        };
        let mut refs: Vec<String> = Vec::new();
        for field in &self.fields {
            if let FieldPaint::Image { reference, .. } = &field.paint
                && Some(reference.as_str()) != background
                && !refs.contains(reference)
            {
                refs.push(reference.clone());
            }
        }
        refs
    }
}

fn pixel_extent(v: f64) -> CardResult<u32> {
    let px = v.round();
    if !(px >= 1.0 && px <= f64::from(u16::MAX)) {
        return Err(CardError::render(format!(
            "canvas dimension {v} is outside 1..={}",
            u16::MAX
        )));
    }
    Ok(px as u32)
}

fn field_plan(
    field: &TemplateField,
    values: &FieldValues,
    scale: f64,
    canvas: Size,
    placeholders: bool,
) -> CardResult<FieldPlan> {
    let value = field.display_value(values, placeholders);
    let paint = if value.is_empty() {
        FieldPaint::Empty
    } else if field.field_type.is_image() {
        FieldPaint::Image {
            reference: value.to_owned(),
            clip: field.clip_shape.unwrap_or_default(),
        }
    } else {
        FieldPaint::Text(TextPlan {
            text: value.to_owned(),
            font_px: field.font_size * scale,
            font_family: field.font_family.clone(),
            font_weight: field.font_weight.clone(),
            color: parse_css_color_or(&field.font_color, Rgba8::BLACK)?,
            align: field.text_align,
            padding: TEXT_PADDING * scale,
        })
    };

    let mut fill = parse_css_color(&field.background_color)?;
    if field.field_type.is_image() && paint == FieldPaint::Empty {
        fill = fill.or(Some(EMPTY_IMAGE_FILL));
    }

    Ok(FieldPlan {
        field_id: field.id.clone(),
        rect: field_rect_px(field.geometry, canvas),
        corner_radius: field.border_radius * scale,
        fill,
        paint,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/plan.rs"]
mod tests;
