/// Result alias used throughout the crate.
pub type CardResult<T> = Result<T, CardError>;

/// Errors surfaced by template validation, rendering, layout and export.
///
/// Image load failures, missing fonts and missing templates are degradations, not errors; they
/// are logged and skipped by the renderers and never reach this type.
#[derive(thiserror::Error, Debug)]
pub enum CardError {
    /// Upstream data broke an invariant (non-finite geometry, bad colour, duplicate id, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// An asset could not be read, fetched or decoded.
    #[error("asset error: {0}")]
    Asset(String),

    /// The rasterizer could not produce a surface.
    #[error("render error: {0}")]
    Render(String),

    /// Print layout parameters are out of range.
    #[error("layout error: {0}")]
    Layout(String),

    /// A document export failed as a whole.
    #[error("export error: {0}")]
    Export(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Anything else, with its source chain preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CardError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for CardError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
