//! Image references: `data:` URLs, `http(s)://` URLs and paths under an assets root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use tokio::sync::{Mutex, OnceCell};

use crate::assets::decode::{PreparedImage, decode_image};
use crate::foundation::error::{CardError, CardResult};

/// Fetches the encoded bytes behind an image reference.
///
/// Implementations only move bytes; decoding and caching live in [`ImageCache`].
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load_bytes(&self, reference: &str) -> CardResult<Vec<u8>>;
}

/// Loader for the three reference kinds a template may carry.
#[derive(Clone, Debug)]
pub struct DefaultImageLoader {
    http_client: reqwest::Client,
    assets_root: PathBuf,
}

impl DefaultImageLoader {
    pub fn new(assets_root: impl Into<PathBuf>, http_timeout: Duration) -> CardResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("cardforge/", env!("CARGO_PKG_VERSION")))
            .timeout(http_timeout)
            .build()
            .map_err(|e| CardError::asset(format!("HTTP client error: {e}")))?;
        Ok(Self {
            http_client,
            assets_root: assets_root.into(),
        })
    }

    async fn fetch(&self, url: &str) -> CardResult<Vec<u8>> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CardError::asset(format!("failed to download {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(CardError::asset(format!(
                "failed to download {url}: HTTP {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CardError::asset(format!("failed to read {url}: {e}")))?;
        Ok(bytes.to_vec())
    }

    fn resolve_path(&self, reference: &str) -> PathBuf {
        let path = Path::new(reference.strip_prefix("file://").unwrap_or(reference));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.assets_root.join(path)
        }
    }
}

#[async_trait]
impl ImageLoader for DefaultImageLoader {
    async fn load_bytes(&self, reference: &str) -> CardResult<Vec<u8>> {
        let reference = reference.trim();
        if reference.starts_with("data:") {
            return decode_data_url(reference);
        }
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return self.fetch(reference).await;
        }
        let path = self.resolve_path(reference);
        tokio::fs::read(&path)
            .await
            .map_err(|e| CardError::asset(format!("read {}: {e}", path.display())))
    }
}

/// Decode the payload of a `data:[<media type>][;base64],<data>` URL.
pub fn decode_data_url(url: &str) -> CardResult<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| CardError::asset("not a data URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| CardError::asset("data URL has no ',' separator"))?;

    if meta
        .rsplit(';')
        .next()
        .is_some_and(|p| p.eq_ignore_ascii_case("base64"))
    {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| CardError::asset(format!("invalid base64 in data URL: {e}")))
    } else {
        Ok(percent_decode(payload))
    }
}

fn percent_decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(hex) = s.get(i + 1..i + 3)
            && let Ok(b) = u8::from_str_radix(hex, 16)
        {
            out.push(b);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

/// Outcome of one load, shared by every caller of the same reference. Failures keep only their
/// message.
type LoadOutcome = Result<Arc<PreparedImage>, String>;

/// Decoded-image cache in front of an [`ImageLoader`].
///
/// Each reference gets one slot. Concurrent callers of the same reference wait on the first
/// load instead of starting their own, so a batch fetches and decodes a shared background once.
/// Failures are cached too; a dead URL costs one timeout per cache, not one per card.
pub struct ImageCache {
    loader: Arc<dyn ImageLoader>,
    slots: Mutex<HashMap<String, Arc<OnceCell<LoadOutcome>>>>,
}

impl ImageCache {
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, reference: &str) -> CardResult<Arc<PreparedImage>> {
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(reference.to_owned()).or_default())
        };
        if slot.initialized() {
            tracing::debug!(reference = short_ref(reference), "image cache hit");
        }

        match slot.get_or_init(|| self.load(reference)).await {
            Ok(img) => Ok(Arc::clone(img)),
            Err(msg) => Err(CardError::asset(msg.clone())),
        }
    }

    /// Drop a decoded image so its pixels can be freed. Cached failures are kept.
    pub async fn evict(&self, reference: &str) {
        let mut slots = self.slots.lock().await;
        if slots
            .get(reference)
            .is_some_and(|slot| matches!(slot.get(), Some(Ok(_))))
        {
            slots.remove(reference);
        }
    }

    async fn load(&self, reference: &str) -> LoadOutcome {
        let loaded = match self.loader.load_bytes(reference).await {
            Ok(bytes) => decode_off_runtime(bytes).await,
            Err(e) => Err(e),
        };
        loaded.map(Arc::new).map_err(|e| match e {
            CardError::Asset(msg) => msg,
            other => other.to_string(),
        })
    }
}

/// Decode on the blocking pool; large images take long enough to stall a runtime worker.
async fn decode_off_runtime(bytes: Vec<u8>) -> CardResult<PreparedImage> {
    tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .map_err(|e| CardError::asset(format!("decode task failed: {e}")))?
}

/// Truncate references for log output; data URLs can be megabytes long.
pub(crate) fn short_ref(reference: &str) -> &str {
    const MAX: usize = 64;
    if reference.len() <= MAX {
        return reference;
    }
    let mut end = MAX;
    while !reference.is_char_boundary(end) {
        end -= 1;
    }
    &reference[..end]
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
