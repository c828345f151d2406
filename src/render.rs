pub mod cpu;
pub mod plan;

pub use cpu::{CardRaster, CardRasterizer, RasterOptions};
pub use plan::{BackgroundPlan, BorderPlan, FieldPaint, FieldPlan, RasterPlan, TEXT_PADDING, TextPlan};
