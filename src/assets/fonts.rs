use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{CardError, CardResult};

/// Numeric CSS weight for a template `fontWeight` string.
///
/// Unknown keywords fall back to 400 rather than failing; the weight only steers face selection.
pub fn parse_font_weight(s: &str) -> u16 {
    let s = s.trim();
    match s.to_ascii_lowercase().as_str() {
        "" | "normal" | "regular" => 400,
        "bold" | "bolder" => 700,
        "lighter" | "light" => 300,
        "thin" => 100,
        "medium" => 500,
        "semibold" => 600,
        "black" => 900,
        other => other
            .parse::<f64>()
            .ok()
            .filter(|w| w.is_finite())
            .map(|w| w.round().clamp(1.0, 1000.0) as u16)
            .unwrap_or(400),
    }
}

/// A single font face: raw bytes plus the family/weight it answers to.
#[derive(Clone, Debug)]
pub struct FontFace {
    pub family: String,
    pub weight: u16,
    pub bytes: Arc<Vec<u8>>,
}

/// Registry mapping CSS family names and weights to font files.
///
/// The renderer has no system font lookup; every face must be registered here. Lookups that find
/// nothing fall back to the default face.
#[derive(Clone, Debug, Default)]
pub struct FontBook {
    faces: Vec<FontFace>,
    default_face: Option<FontFace>,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty() && self.default_face.is_none()
    }

    pub fn add_face(&mut self, family: impl Into<String>, weight: u16, bytes: Vec<u8>) {
        self.faces.push(FontFace {
            family: family.into().trim().to_ascii_lowercase(),
            weight,
            bytes: Arc::new(bytes),
        });
    }

    pub fn load_face(
        &mut self,
        family: impl Into<String>,
        weight: u16,
        path: impl AsRef<Path>,
    ) -> CardResult<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("read font {}", path.display()))?;
        self.add_face(family, weight, bytes);
        Ok(())
    }

    pub fn set_default(&mut self, bytes: Vec<u8>) {
        self.default_face = Some(FontFace {
            family: String::new(),
            weight: 400,
            bytes: Arc::new(bytes),
        });
    }

    pub fn load_default(&mut self, path: impl AsRef<Path>) -> CardResult<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("read font {}", path.display()))?;
        self.set_default(bytes);
        Ok(())
    }

    /// Pick a face for a CSS family list (`"Georgia, serif"`) and weight keyword.
    ///
    /// Families are tried in order; within a family the nearest weight wins, ties going to the
    /// heavier face.
    pub fn resolve(&self, family_list: &str, weight: &str) -> Option<&FontFace> {
        let want = i32::from(parse_font_weight(weight));
        family_list
            .split(',')
            .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\'').to_ascii_lowercase())
            .filter(|f| !f.is_empty())
            .find_map(|family| {
                self.faces
                    .iter()
                    .filter(|face| face.family == family)
                    .min_by_key(|face| {
                        let w = i32::from(face.weight);
                        ((w - want).abs(), -w)
                    })
            })
            .or(self.default_face.as_ref())
    }
}

/// Straight-alpha fill carried through Parley as the glyph brush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlyphBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Rgba8> for GlyphBrush {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Stateful helper for building single-line Parley layouts from registered font faces.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<GlyphBrush>,
    // Keyed by the face's byte buffer; the Arc keeps the key address alive.
    family_names: HashMap<usize, (Arc<Vec<u8>>, String)>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            family_names: HashMap::new(),
        }
    }

    fn family_name_for(&mut self, face: &FontFace) -> CardResult<String> {
        let key = Arc::as_ptr(&face.bytes) as usize;
        if let Some((_, name)) = self.family_names.get(&key) {
            return Ok(name.clone());
        }

        let families = self.font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(face.bytes.as_ref().clone()),
            None,
        );
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| CardError::validation("no font families registered from font bytes"))?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| CardError::validation("registered font family has no name"))?
            .to_string();

        self.family_names
            .insert(key, (Arc::clone(&face.bytes), name.clone()));
        Ok(name)
    }

    /// Shape `text` as one unwrapped line.
    pub fn layout_line(
        &mut self,
        text: &str,
        face: &FontFace,
        size_px: f32,
        brush: GlyphBrush,
    ) -> CardResult<parley::Layout<GlyphBrush>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CardError::validation("text size_px must be finite and > 0"));
        }
        let family_name = self.family_name_for(face)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(f32::from(face.weight)),
        ));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<GlyphBrush> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;
