pub mod geometry;
pub mod model;

pub use geometry::{FieldGeometry, MIN_HEIGHT_PCT, MIN_WIDTH_PCT, field_rect_px, pixel_delta_to_pct};
pub use model::{
    BackgroundFit, ClipShape, FieldType, FieldValues, TemplateDefinition, TemplateField,
    TemplateResolver, TextAlign,
};
