use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::foundation::error::{CardError, CardResult};
use crate::print::layout::{PrintCard, PrintLayout, PrintSettings, plan_print_layout};
use crate::print::pdf::{PdfComposer, PlacedRaster};
use crate::render::cpu::{CardRaster, CardRasterizer};
use crate::template::model::TemplateResolver;

/// CSS reference pixel density (96 dpi).
pub const DEFAULT_PX_PER_MM: f64 = 3.78;
pub const DEFAULT_SUPERSAMPLE: f64 = 2.0;
pub const DEFAULT_MAX_CONCURRENT_CARDS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportOptions {
    pub settings: PrintSettings,
    pub px_per_mm: f64,
    pub supersample: f64,
    pub max_concurrent_cards: usize,
}

impl ExportOptions {
    pub fn new(settings: PrintSettings) -> Self {
        Self {
            settings,
            px_per_mm: DEFAULT_PX_PER_MM,
            supersample: DEFAULT_SUPERSAMPLE,
            max_concurrent_cards: DEFAULT_MAX_CONCURRENT_CARDS,
        }
    }

    /// Pixel width each card is rasterized at.
    pub fn render_width_px(&self, card_width_mm: f64) -> f64 {
        (card_width_mm * self.px_per_mm * self.supersample)
            .round()
            .max(1.0)
    }
}

#[derive(Clone, Debug)]
pub struct ExportedPdf {
    pub bytes: Vec<u8>,
    pub layout: PrintLayout,
}

/// Lay out, rasterize and compose `cards` into one PDF.
///
/// Cards rasterize concurrently, at most `max_concurrent_cards` at a time. Any card failing to
/// rasterize fails the whole export; no partial document is returned.
#[tracing::instrument(skip_all, fields(cards = cards.len(), page_size = ?opts.settings.page_size))]
pub async fn export_pdf<R>(
    cards: &[PrintCard],
    templates: &R,
    rasterizer: Arc<CardRasterizer>,
    opts: &ExportOptions,
) -> CardResult<ExportedPdf>
where
    R: TemplateResolver + ?Sized,
{
    if !(opts.px_per_mm.is_finite() && opts.px_per_mm > 0.0)
        || !(opts.supersample.is_finite() && opts.supersample > 0.0)
    {
        return Err(CardError::export(format!(
            "invalid raster density {} px/mm x{}",
            opts.px_per_mm, opts.supersample
        )));
    }

    let layout = plan_print_layout(cards, templates, &opts.settings)?;
    if layout.cards.is_empty() {
        return Err(CardError::export("no printable cards"));
    }

    let render_width = opts.render_width_px(layout.grid.card_width_mm);
    let rasters = rasterize_all(cards, &layout, rasterizer, render_width, opts.max_concurrent_cards)
        .await
        .map_err(|e| match e {
            CardError::Export(_) => e,
            other => CardError::export(other.to_string()),
        })?;

    let mut pdf = PdfComposer::new(opts.settings.page_size);
    for page in 0..layout.page_count {
        let on_page: Vec<PlacedRaster<'_>> = layout
            .cards
            .iter()
            .zip(&rasters)
            .filter(|(placed, _)| placed.placement.page == page)
            .map(|(placed, raster)| PlacedRaster {
                raster,
                placement: placed.placement,
            })
            .collect();
        pdf.add_page(&on_page)?;
    }
    let bytes = pdf.finish()?;

    tracing::info!(
        pages = layout.page_count,
        cards = layout.cards.len(),
        skipped = layout.skipped.len(),
        bytes = bytes.len(),
        "exported pdf"
    );
    Ok(ExportedPdf { bytes, layout })
}

/// Rasterize every placed card; output order matches `layout.cards`.
async fn rasterize_all(
    cards: &[PrintCard],
    layout: &PrintLayout,
    rasterizer: Arc<CardRasterizer>,
    render_width: f64,
    max_concurrent: usize,
) -> CardResult<Vec<CardRaster>> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks: JoinSet<CardResult<(usize, CardRaster)>> = JoinSet::new();

    for (slot, placed) in layout.cards.iter().enumerate() {
        let template = Arc::clone(&placed.template);
        let values = cards[placed.card_index].field_values.clone();
        let card_id = placed.card_id.clone();
        let rasterizer = Arc::clone(&rasterizer);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| CardError::export(format!("semaphore closed: {e}")))?;
            let raster = rasterizer
                .rasterize(&template, &values, render_width)
                .await
                .map_err(|e| CardError::export(format!("card {card_id}: {e}")))?;
            Ok((slot, raster))
        });
    }

    let mut out: Vec<Option<CardRaster>> = vec![None; layout.cards.len()];
    while let Some(joined) = tasks.join_next().await {
        let (slot, raster) =
            joined.map_err(|e| CardError::export(format!("rasterize task failed: {e}")))??;
        out[slot] = Some(raster);
    }
    out.into_iter()
        .map(|r| r.ok_or_else(|| CardError::export("missing card raster")))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/print/export.rs"]
mod tests;
