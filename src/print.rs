//! Print export: page grid planning, PDF composition and the batch export driver.

pub mod export;
pub mod layout;
pub mod pdf;

pub use export::{ExportOptions, ExportedPdf, export_pdf};
pub use layout::{
    FALLBACK_ASPECT_RATIO, PageGrid, PageSize, PlacedCard, Placement, PrintCard, PrintLayout,
    PrintSettings, plan_print_layout,
};
pub use pdf::{PdfComposer, PlacedRaster, mm_to_pt};
