use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assets::color::parse_css_color;
use crate::foundation::error::{CardError, CardResult};
use crate::template::geometry::FieldGeometry;

/// Bound content per field id. Absent entries fall back to placeholders where the caller asks.
pub type FieldValues = BTreeMap<String, String>;

/// Complete layout and style description of a card, independent of any card's data.
///
/// Treated as an immutable snapshot: every edit goes through one of the `with_*` methods, which
/// return a new definition and leave `self` untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDefinition {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub border_color: String,
    #[serde(default)]
    pub border_width: f64,
    #[serde(default)]
    pub border_radius: f64,
    #[serde(default)]
    pub fields: Vec<TemplateField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image_fit: Option<BackgroundFit>,
}

/// One positioned content slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateField {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(flatten)]
    pub geometry: FieldGeometry,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_weight")]
    pub font_weight: String,
    #[serde(default = "default_font_color")]
    pub font_color: String,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub border_radius: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_shape: Option<ClipShape>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_id: Option<String>,
}

fn default_font_size() -> f64 {
    14.0
}

fn default_font_family() -> String {
    "sans-serif".to_owned()
}

fn default_font_weight() -> String {
    "normal".to_owned()
}

fn default_font_color() -> String {
    "#1f2937".to_owned()
}

fn default_visible() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Name,
    Illustration,
    Description,
    Stat,
    Type,
    Rarity,
    Power,
    Tribe,
    CustomText,
}

impl FieldType {
    pub const ALL: [FieldType; 9] = [
        FieldType::Name,
        FieldType::Illustration,
        FieldType::Description,
        FieldType::Stat,
        FieldType::Type,
        FieldType::Rarity,
        FieldType::Power,
        FieldType::Tribe,
        FieldType::CustomText,
    ];

    /// Only illustration fields carry an image.
    pub fn is_image(self) -> bool {
        matches!(self, FieldType::Illustration)
    }

    /// Preview text shown for a field with no bound value.
    pub fn placeholder(self) -> &'static str {
        match self {
            FieldType::Name => "Card Name",
            FieldType::Illustration => "",
            FieldType::Description => {
                "This is a sample card description that shows how text will appear on the card."
            }
            FieldType::Stat => "10",
            FieldType::Type => "Creature",
            FieldType::Rarity => "Rare",
            FieldType::Power => "Fireball",
            FieldType::Tribe => "Dragon",
            FieldType::CustomText => "Custom",
        }
    }

    pub fn default_label(self) -> &'static str {
        match self {
            FieldType::Name => "Name",
            FieldType::Illustration => "Illustration",
            FieldType::Description => "Description",
            FieldType::Stat => "Stat",
            FieldType::Type => "Type",
            FieldType::Rarity => "Rarity",
            FieldType::Power => "Power",
            FieldType::Tribe => "Tribe",
            FieldType::CustomText => "Custom Text",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            FieldType::Name => "name",
            FieldType::Illustration => "illustration",
            FieldType::Description => "description",
            FieldType::Stat => "stat",
            FieldType::Type => "type",
            FieldType::Rarity => "rarity",
            FieldType::Power => "power",
            FieldType::Tribe => "tribe",
            FieldType::CustomText => "custom_text",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Clip applied to illustration images, on top of the field's corner radius.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipShape {
    #[default]
    Rectangle,
    Ellipse,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundFit {
    #[default]
    Cover,
    Contain,
    Fill,
}

impl TemplateField {
    /// A field with the editor's default style.
    pub fn new(id: impl Into<String>, field_type: FieldType, geometry: FieldGeometry) -> Self {
        Self {
            id: id.into(),
            field_type,
            label: field_type.default_label().to_owned(),
            geometry,
            font_size: default_font_size(),
            font_family: default_font_family(),
            font_weight: default_font_weight(),
            font_color: default_font_color(),
            text_align: TextAlign::Center,
            background_color: String::new(),
            border_radius: 0.0,
            clip_shape: None,
            visible: true,
            attribute_id: None,
        }
    }

    /// The bound value, else the type placeholder when `placeholders` is set, else `""`.
    pub fn display_value<'a>(&self, values: &'a FieldValues, placeholders: bool) -> &'a str {
        match values.get(&self.id) {
            Some(v) => v.as_str(),
            None if placeholders => self.field_type.placeholder(),
            None => "",
        }
    }

    fn validate(&self) -> CardResult<()> {
        let id = &self.id;
        if id.is_empty() {
            return Err(CardError::validation("field id must not be empty"));
        }
        if !self.geometry.is_finite() {
            return Err(CardError::validation(format!(
                "field \"{id}\" has non-finite geometry"
            )));
        }
        if !(self.geometry.width >= 0.0 && self.geometry.height >= 0.0) {
            return Err(CardError::validation(format!(
                "field \"{id}\" has negative size"
            )));
        }
        if !(self.font_size.is_finite() && self.font_size >= 0.0) {
            return Err(CardError::validation(format!(
                "field \"{id}\" has invalid font size {}",
                self.font_size
            )));
        }
        if !(self.border_radius.is_finite() && self.border_radius >= 0.0) {
            return Err(CardError::validation(format!(
                "field \"{id}\" has invalid border radius {}",
                self.border_radius
            )));
        }
        parse_css_color(&self.font_color)?;
        parse_css_color(&self.background_color)?;
        Ok(())
    }
}

impl TemplateDefinition {
    /// The editor's starting template: a 250×350 card with the usual eight slots.
    pub fn default_card() -> Self {
        fn field(
            id: &str,
            field_type: FieldType,
            label: &str,
            geometry: FieldGeometry,
        ) -> TemplateField {
            let mut f = TemplateField::new(id, field_type, geometry);
            f.label = label.to_owned();
            f
        }

        let mut name = field("name", FieldType::Name, "Name", FieldGeometry::new(5.0, 2.0, 90.0, 8.0));
        name.font_size = 20.0;
        name.font_weight = "bold".to_owned();
        name.font_color = "#111827".to_owned();

        let mut illustration = field(
            "illustration",
            FieldType::Illustration,
            "Illustration",
            FieldGeometry::new(5.0, 12.0, 90.0, 40.0),
        );
        illustration.background_color = "#e5e7eb".to_owned();

        let mut card_type = field("type", FieldType::Type, "Type", FieldGeometry::new(5.0, 54.0, 45.0, 6.0));
        card_type.font_size = 12.0;
        card_type.font_color = "#6b7280".to_owned();
        card_type.text_align = TextAlign::Left;

        let mut rarity = field(
            "rarity",
            FieldType::Rarity,
            "Rarity",
            FieldGeometry::new(50.0, 54.0, 45.0, 6.0),
        );
        rarity.font_size = 12.0;
        rarity.font_color = "#6b7280".to_owned();
        rarity.text_align = TextAlign::Right;

        let mut description = field(
            "description",
            FieldType::Description,
            "Description",
            FieldGeometry::new(5.0, 62.0, 90.0, 20.0),
        );
        description.font_size = 11.0;
        description.font_color = "#374151".to_owned();
        description.text_align = TextAlign::Left;

        let stat = |id: &str, label: &str, x: f64, color: &str, bg: &str| {
            let mut f = field(id, FieldType::Stat, label, FieldGeometry::new(x, 85.0, 20.0, 8.0));
            f.font_size = 18.0;
            f.font_weight = "bold".to_owned();
            f.font_color = color.to_owned();
            f.background_color = bg.to_owned();
            f.border_radius = 6.0;
            f
        };
        let atk = stat("atk", "ATK", 5.0, "#dc2626", "#fef2f2");
        let def = stat("def", "DEF", 28.0, "#2563eb", "#eff6ff");

        let mut tribe = field("tribe", FieldType::Tribe, "Tribe", FieldGeometry::new(55.0, 85.0, 40.0, 8.0));
        tribe.font_size = 12.0;
        tribe.font_color = "#4b5563".to_owned();
        tribe.text_align = TextAlign::Right;

        Self {
            width: 250.0,
            height: 350.0,
            background_color: "#ffffff".to_owned(),
            border_color: "#d1d5db".to_owned(),
            border_width: 2.0,
            border_radius: 12.0,
            fields: vec![
                name,
                illustration,
                card_type,
                rarity,
                description,
                atk,
                def,
                tribe,
            ],
            background_image: None,
            background_image_fit: None,
        }
    }

    /// Parse and validate a template from its JSON form.
    pub fn from_json(json: &str) -> CardResult<Self> {
        let def: Self = serde_json::from_str(json)?;
        def.validate()?;
        Ok(def)
    }

    /// Reject data that breaks an invariant the renderers rely on.
    pub fn validate(&self) -> CardResult<()> {
        if !(self.width.is_finite() && self.width > 0.0 && self.height.is_finite() && self.height > 0.0)
        {
            return Err(CardError::validation(format!(
                "card size must be finite and positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.border_width.is_finite() && self.border_width >= 0.0) {
            return Err(CardError::validation(format!(
                "invalid border width {}",
                self.border_width
            )));
        }
        if !(self.border_radius.is_finite() && self.border_radius >= 0.0) {
            return Err(CardError::validation(format!(
                "invalid border radius {}",
                self.border_radius
            )));
        }
        parse_css_color(&self.background_color)?;
        parse_css_color(&self.border_color)?;

        let mut seen = HashSet::with_capacity(self.fields.len());
        for f in &self.fields {
            f.validate()?;
            if !seen.insert(f.id.as_str()) {
                return Err(CardError::validation(format!(
                    "duplicate field id \"{}\"",
                    f.id
                )));
            }
        }
        Ok(())
    }

    /// Height over width.
    pub fn aspect_ratio(&self) -> f64 {
        self.height / self.width
    }

    /// Fit mode for the background image; `cover` when unset.
    pub fn background_fit(&self) -> BackgroundFit {
        self.background_image_fit.unwrap_or_default()
    }

    /// The background image reference, ignoring empty strings.
    pub fn background_image_ref(&self) -> Option<&str> {
        self.background_image.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn field(&self, id: &str) -> Option<&TemplateField> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn visible_fields(&self) -> impl Iterator<Item = &TemplateField> {
        self.fields.iter().filter(|f| f.visible)
    }

    /// Append a default-styled field of `field_type`; returns the new definition and the new id.
    pub fn with_field_added(&self, field_type: FieldType) -> (Self, String) {
        let id = (1..)
            .map(|n| format!("{}-{n}", field_type.slug()))
            .find(|candidate| self.field(candidate).is_none())
            .unwrap_or_else(|| field_type.slug().to_owned());
        let mut next = self.clone();
        next.fields.push(TemplateField::new(
            id.clone(),
            field_type,
            FieldGeometry::new(10.0, 10.0, 80.0, 8.0),
        ));
        (next, id)
    }

    pub fn without_field(&self, id: &str) -> Self {
        let mut next = self.clone();
        next.fields.retain(|f| f.id != id);
        next
    }

    pub fn with_visibility_toggled(&self, id: &str) -> Self {
        self.map_field(id, |f| f.visible = !f.visible)
    }

    /// Replace the field that has `field.id`; unknown ids leave the definition unchanged.
    pub fn with_field_replaced(&self, field: TemplateField) -> Self {
        let id = field.id.clone();
        self.map_field(&id, move |f| *f = field.clone())
    }

    pub fn with_field_geometry(&self, id: &str, geometry: FieldGeometry) -> Self {
        self.map_field(id, |f| f.geometry = geometry)
    }

    /// Move the field with `id` to position `to` in paint order (clamped to the end).
    pub fn with_field_moved(&self, id: &str, to: usize) -> Self {
        let mut next = self.clone();
        if let Some(from) = next.fields.iter().position(|f| f.id == id) {
            let f = next.fields.remove(from);
            let to = to.min(next.fields.len());
            next.fields.insert(to, f);
        }
        next
    }

    fn map_field(&self, id: &str, mut edit: impl FnMut(&mut TemplateField)) -> Self {
        let mut next = self.clone();
        for f in next.fields.iter_mut().filter(|f| f.id == id) {
            edit(f);
        }
        next
    }
}

impl Default for TemplateDefinition {
    fn default() -> Self {
        Self::default_card()
    }
}

/// Looks up template definitions by id for batch export.
pub trait TemplateResolver {
    fn resolve(&self, template_id: &str) -> Option<Arc<TemplateDefinition>>;
}

impl TemplateResolver for HashMap<String, Arc<TemplateDefinition>> {
    fn resolve(&self, template_id: &str) -> Option<Arc<TemplateDefinition>> {
        self.get(template_id).cloned()
    }
}

impl TemplateResolver for BTreeMap<String, Arc<TemplateDefinition>> {
    fn resolve(&self, template_id: &str) -> Option<Arc<TemplateDefinition>> {
        self.get(template_id).cloned()
    }
}

impl TemplateResolver for BTreeMap<String, TemplateDefinition> {
    fn resolve(&self, template_id: &str) -> Option<Arc<TemplateDefinition>> {
        self.get(template_id).map(|d| Arc::new(d.clone()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/model.rs"]
mod tests;
