//! Runtime configuration for the CLI and export driver.
//!
//! Loaded from a JSON file; every field is optional. Two environment variables are layered on
//! top: `CARDFORGE_DEFAULT_FONT` and `CARDFORGE_MAX_CONCURRENT_CARDS`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::assets::fonts::{FontBook, parse_font_weight};
use crate::foundation::error::{CardError, CardResult};
use crate::print::export::{
    DEFAULT_MAX_CONCURRENT_CARDS, DEFAULT_PX_PER_MM, DEFAULT_SUPERSAMPLE, ExportOptions,
};
use crate::print::layout::{DEFAULT_GAP_MM, DEFAULT_MARGIN_MM, PageSize, PrintSettings};

pub const ENV_DEFAULT_FONT: &str = "CARDFORGE_DEFAULT_FONT";
pub const ENV_MAX_CONCURRENT_CARDS: &str = "CARDFORGE_MAX_CONCURRENT_CARDS";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct CardforgeConfig {
    pub fonts: FontsConfig,
    pub print: PrintConfig,
    /// Base directory for relative image references. Defaults to the input file's directory.
    pub assets_root: Option<PathBuf>,
    pub http_timeout_secs: u64,
    pub max_concurrent_cards: usize,
}

impl Default for CardforgeConfig {
    fn default() -> Self {
        Self {
            fonts: FontsConfig::default(),
            print: PrintConfig::default(),
            assets_root: None,
            http_timeout_secs: 30,
            max_concurrent_cards: DEFAULT_MAX_CONCURRENT_CARDS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    pub faces: Vec<FontFaceConfig>,
    /// Used when no registered family matches a field's font stack.
    pub default: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontFaceConfig {
    pub family: String,
    #[serde(default)]
    pub weight: Option<String>,
    pub path: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrintConfig {
    pub margin_mm: f64,
    pub gap_mm: f64,
    pub px_per_mm: f64,
    pub supersample: f64,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            margin_mm: DEFAULT_MARGIN_MM,
            gap_mm: DEFAULT_GAP_MM,
            px_per_mm: DEFAULT_PX_PER_MM,
            supersample: DEFAULT_SUPERSAMPLE,
        }
    }
}

impl CardforgeConfig {
    /// Read `path`, resolve relative font paths against its directory, then apply env overrides.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let mut cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("parse config '{}'", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        cfg.resolve_paths(base);
        cfg.apply_env_overrides(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    /// Defaults plus env overrides, for runs without a config file.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for face in &mut self.fonts.faces {
            join(&mut face.path);
        }
        if let Some(p) = self.fonts.default.as_mut() {
            join(p);
        }
        if let Some(p) = self.assets_root.as_mut() {
            join(p);
        }
    }

    pub(crate) fn apply_env_overrides(
        &mut self,
        get: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(font) = get(ENV_DEFAULT_FONT).filter(|v| !v.is_empty()) {
            self.fonts.default = Some(PathBuf::from(font));
        }
        if let Some(n) = get(ENV_MAX_CONCURRENT_CARDS).filter(|v| !v.is_empty()) {
            self.max_concurrent_cards = n
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_CONCURRENT_CARDS}='{n}' is not a count"))?;
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Load every configured face. A missing file is an error here, not a degradation.
    pub fn font_book(&self) -> CardResult<FontBook> {
        let mut book = FontBook::new();
        for face in &self.fonts.faces {
            let weight = face.weight.as_deref().map_or(400, parse_font_weight);
            book.load_face(&face.family, weight, &face.path)?;
        }
        if let Some(default) = &self.fonts.default {
            book.load_default(default)?;
        }
        if book.is_empty() {
            tracing::warn!("no fonts configured; text fields will not be rasterized");
        }
        Ok(book)
    }

    pub fn print_settings(&self, page_size: PageSize, cards_per_row: u32) -> CardResult<PrintSettings> {
        PrintSettings::new(page_size, cards_per_row)?
            .with_spacing(self.print.margin_mm, self.print.gap_mm)
    }

    pub fn export_options(&self, page_size: PageSize, cards_per_row: u32) -> CardResult<ExportOptions> {
        if self.max_concurrent_cards == 0 {
            return Err(CardError::validation("max_concurrent_cards must be at least 1"));
        }
        Ok(ExportOptions {
            settings: self.print_settings(page_size, cards_per_row)?,
            px_per_mm: self.print.px_per_mm,
            supersample: self.print.supersample,
            max_concurrent_cards: self.max_concurrent_cards,
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
