//! Cardforge lays out, edits and rasterizes trading-card templates.
//!
//! A [`TemplateDefinition`] positions text and image fields in percentages of a logical
//! canvas. Two renderers consume it and agree on every field rectangle:
//!
//! - [`CardView`] / [`CardEditor`]: an interactive render tree with hit testing and
//!   drag-move / corner-resize editing
//! - [`CardRasterizer`]: a deterministic `vello_cpu` rasterizer for export
//!
//! [`export_pdf`] packs rasterized cards onto A4 or Letter pages.
#![forbid(unsafe_code)]

mod foundation;

pub mod assets;
pub mod config;
pub mod fit;
pub mod interactive;
pub mod print;
pub mod render;
pub mod template;

pub use crate::foundation::core::{Affine, Point, Rect, Rgba8, Rgba8Premul, Size, Vec2};
pub use crate::foundation::error::{CardError, CardResult};

pub use crate::assets::{DefaultImageLoader, FontBook, ImageLoader};
pub use crate::config::CardforgeConfig;
pub use crate::fit::{FitRects, compute_fit};
pub use crate::interactive::{CardEditor, CardView, EditorCallbacks, EditorEvent, ViewOptions};
pub use crate::print::{
    ExportOptions, ExportedPdf, PageSize, PrintCard, PrintLayout, PrintSettings, export_pdf,
    plan_print_layout,
};
pub use crate::render::{CardRaster, CardRasterizer, RasterOptions, RasterPlan};
pub use crate::template::{
    BackgroundFit, ClipShape, FieldGeometry, FieldType, FieldValues, TemplateDefinition,
    TemplateField, TemplateResolver, TextAlign,
};
