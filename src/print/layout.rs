use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{CardError, CardResult};
use crate::template::model::{FieldValues, TemplateDefinition, TemplateResolver};

pub const DEFAULT_MARGIN_MM: f64 = 10.0;
pub const DEFAULT_GAP_MM: f64 = 4.0;
pub const MIN_CARDS_PER_ROW: u32 = 2;
pub const MAX_CARDS_PER_ROW: u32 = 4;
/// Aspect ratio (height / width) used when the first card's template is unresolved.
pub const FALLBACK_ASPECT_RATIO: f64 = 1.4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum PageSize {
    #[default]
    #[value(name = "A4")]
    A4,
    #[value(name = "Letter")]
    Letter,
}

impl PageSize {
    /// Portrait (width, height) in millimetres.
    pub fn dimensions_mm(self) -> (f64, f64) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintSettings {
    pub page_size: PageSize,
    pub cards_per_row: u32,
    #[serde(default = "default_margin_mm")]
    pub margin_mm: f64,
    #[serde(default = "default_gap_mm")]
    pub gap_mm: f64,
}

fn default_margin_mm() -> f64 {
    DEFAULT_MARGIN_MM
}

fn default_gap_mm() -> f64 {
    DEFAULT_GAP_MM
}

impl PrintSettings {
    pub fn new(page_size: PageSize, cards_per_row: u32) -> CardResult<Self> {
        let s = Self {
            page_size,
            cards_per_row,
            margin_mm: DEFAULT_MARGIN_MM,
            gap_mm: DEFAULT_GAP_MM,
        };
        s.validate()?;
        Ok(s)
    }

    pub fn with_spacing(mut self, margin_mm: f64, gap_mm: f64) -> CardResult<Self> {
        self.margin_mm = margin_mm;
        self.gap_mm = gap_mm;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> CardResult<()> {
        if !(MIN_CARDS_PER_ROW..=MAX_CARDS_PER_ROW).contains(&self.cards_per_row) {
            return Err(CardError::layout(format!(
                "cards per row must be {MIN_CARDS_PER_ROW}..={MAX_CARDS_PER_ROW}, got {}",
                self.cards_per_row
            )));
        }
        for (name, v) in [("margin", self.margin_mm), ("gap", self.gap_mm)] {
            if !v.is_finite() || v < 0.0 {
                return Err(CardError::layout(format!(
                    "{name} must be finite and non-negative, got {v}"
                )));
            }
        }
        Ok(())
    }
}

/// Uniform card grid for one page size. Every page in a job shares it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PageGrid {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub margin_mm: f64,
    pub gap_mm: f64,
    pub cards_per_row: u32,
    pub rows_per_page: u32,
    pub card_width_mm: f64,
    pub card_height_mm: f64,
}

/// Where one card lands, in millimetres from the page's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Placement {
    pub page: usize,
    pub row: u32,
    pub column: u32,
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageGrid {
    pub fn new(settings: &PrintSettings, aspect_ratio: f64) -> CardResult<Self> {
        settings.validate()?;
        if !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
            return Err(CardError::layout(format!(
                "aspect ratio must be finite and positive, got {aspect_ratio}"
            )));
        }

        let (page_w, page_h) = settings.page_size.dimensions_mm();
        let margin = settings.margin_mm;
        let gap = settings.gap_mm;
        let per_row = f64::from(settings.cards_per_row);

        let usable_w = page_w - 2.0 * margin;
        let usable_h = page_h - 2.0 * margin;
        let card_w = (usable_w - gap * (per_row - 1.0)) / per_row;
        if card_w <= 0.0 || usable_h <= 0.0 {
            return Err(CardError::layout(format!(
                "margin {margin}mm and gap {gap}mm leave no room for {} cards per row",
                settings.cards_per_row
            )));
        }
        let card_h = card_w * aspect_ratio;
        let rows = ((usable_h + gap) / (card_h + gap)).floor().max(1.0) as u32;

        Ok(Self {
            page_width_mm: page_w,
            page_height_mm: page_h,
            margin_mm: margin,
            gap_mm: gap,
            cards_per_row: settings.cards_per_row,
            rows_per_page: rows,
            card_width_mm: card_w,
            card_height_mm: card_h,
        })
    }

    pub fn cards_per_page(&self) -> usize {
        self.cards_per_row as usize * self.rows_per_page as usize
    }

    pub fn page_count(&self, cards: usize) -> usize {
        cards.div_ceil(self.cards_per_page())
    }

    /// Placement of the `index`th placed card in the job.
    pub fn placement(&self, index: usize) -> Placement {
        let per_page = self.cards_per_page();
        let position = index % per_page;
        let column = (position % self.cards_per_row as usize) as u32;
        let row = (position / self.cards_per_row as usize) as u32;
        Placement {
            page: index / per_page,
            row,
            column,
            x_mm: self.margin_mm + f64::from(column) * (self.card_width_mm + self.gap_mm),
            y_mm: self.margin_mm + f64::from(row) * (self.card_height_mm + self.gap_mm),
            width_mm: self.card_width_mm,
            height_mm: self.card_height_mm,
        }
    }
}

/// One card selected for printing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintCard {
    pub id: String,
    pub template_id: String,
    #[serde(default)]
    pub field_values: FieldValues,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedCard {
    /// Index into the input card list.
    pub card_index: usize,
    pub card_id: String,
    pub template_id: String,
    pub placement: Placement,
    #[serde(skip)]
    pub template: Arc<TemplateDefinition>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintLayout {
    pub page_size: PageSize,
    pub grid: PageGrid,
    pub page_count: usize,
    pub cards: Vec<PlacedCard>,
    /// Ids of cards whose template could not be resolved.
    pub skipped: Vec<String>,
}

/// Assign each resolvable card a page slot, in input order.
///
/// The grid's aspect ratio comes from the first card's template only. Cards whose template
/// is missing are skipped and do not consume a slot.
pub fn plan_print_layout<R>(
    cards: &[PrintCard],
    templates: &R,
    settings: &PrintSettings,
) -> CardResult<PrintLayout>
where
    R: TemplateResolver + ?Sized,
{
    let aspect = cards
        .first()
        .and_then(|c| templates.resolve(&c.template_id))
        .map(|t| t.aspect_ratio())
        .filter(|a| a.is_finite() && *a > 0.0)
        .unwrap_or(FALLBACK_ASPECT_RATIO);
    let grid = PageGrid::new(settings, aspect)?;

    let mut placed = Vec::with_capacity(cards.len());
    let mut skipped = Vec::new();
    for (card_index, card) in cards.iter().enumerate() {
        let Some(template) = templates.resolve(&card.template_id) else {
            tracing::warn!(card = %card.id, template = %card.template_id, "template not found, skipping card");
            skipped.push(card.id.clone());
            continue;
        };
        placed.push(PlacedCard {
            card_index,
            card_id: card.id.clone(),
            template_id: card.template_id.clone(),
            placement: grid.placement(placed.len()),
            template,
        });
    }

    tracing::debug!(
        cards = placed.len(),
        skipped = skipped.len(),
        per_page = grid.cards_per_page(),
        "print layout"
    );
    Ok(PrintLayout {
        page_size: settings.page_size,
        grid,
        page_count: grid.page_count(placed.len()),
        cards: placed,
        skipped,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/print/layout.rs"]
mod tests;
