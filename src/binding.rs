//! Binds listing image URLs to image targets.
//!
//! Listing payloads carry plain `http` addresses; every image is requested over
//! `https` instead. Loading itself is left to an [`ImageLoader`], which owns
//! fetching, decoding and failure handling.

use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tracing::{debug, warn};
use url::{Position, Url};

/// Image data delivered into a target
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub url: Url,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct TargetSlot {
    requested: Option<Url>,
    image: Option<LoadedImage>,
}

/// Cloneable handle to the place an image is rendered into, e.g. one grid cell
#[derive(Debug, Clone, Default)]
pub struct ImageTarget {
    slot: Arc<Mutex<TargetSlot>>,
}

impl ImageTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address most recently submitted for this target
    pub fn requested_url(&self) -> Option<Url> {
        self.lock().requested.clone()
    }

    pub fn image(&self) -> Option<LoadedImage> {
        self.lock().image.clone()
    }

    /// Record a new request; the previous image stays until the new one arrives
    pub fn request(&self, url: Url) {
        self.lock().requested = Some(url);
    }

    /// Store a loaded image. Returns false when the target was rebound to another URL meanwhile.
    pub fn deliver(&self, image: LoadedImage) -> bool {
        let mut slot = self.lock();
        if slot.requested.as_ref() != Some(&image.url) {
            return false;
        }
        slot.image = Some(image);
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TargetSlot> {
        // a poisoned slot still holds a usable image
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Asynchronous image loading facility
pub trait ImageLoader: Send + Sync {
    /// Start loading `url` into `target`. Must not block and must not report failures to the caller.
    fn load(&self, url: Url, target: &ImageTarget);
}

/// Force the `https` scheme on an image address
pub fn normalize_image_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();

    if raw.starts_with("//") {
        return Url::parse(&format!("https:{}", raw))
            .with_context(|| format!("Invalid image url '{}'", raw));
    }

    let url = Url::parse(raw).with_context(|| format!("Invalid image url '{}'", raw))?;
    if url.scheme() == "https" {
        return Ok(url);
    }

    let rest = &url[Position::AfterScheme..];
    Url::parse(&format!("https{}", rest))
        .with_context(|| format!("Cannot rewrite image url '{}' to https", raw))
}

/// Bind an optional image address to `target`. A missing address leaves the target untouched.
pub fn bind_image<L>(loader: &L, target: &ImageTarget, image_url: Option<&str>)
where
    L: ImageLoader + ?Sized,
{
    let Some(raw) = image_url else {
        return;
    };

    match normalize_image_url(raw) {
        Ok(url) => loader.load(url, target),
        Err(err) => warn!("Skipping image binding: {:#}", err),
    }
}

/// Image loader downloading over the shared HTTP client on the tokio runtime
#[derive(Debug, Clone)]
pub struct HttpImageLoader {
    client: Client,
    runtime: Handle,
}

impl HttpImageLoader {
    /// Must be created from within a tokio runtime
    pub fn new(client: Client) -> Result<Self> {
        let runtime = Handle::try_current().context("Image loader requires a tokio runtime")?;
        Ok(Self { client, runtime })
    }

    async fn fetch(client: &Client, url: &Url) -> Result<Vec<u8>> {
        let response = client
            .get(url.clone())
            .send()
            .await
            .context("Failed to fetch image")?;

        if !response.status().is_success() {
            anyhow::bail!("Image request returned status: {}", response.status());
        }

        let bytes = response.bytes().await.context("Failed to read image body")?;
        Ok(bytes.to_vec())
    }
}

impl ImageLoader for HttpImageLoader {
    fn load(&self, url: Url, target: &ImageTarget) {
        target.request(url.clone());

        let client = self.client.clone();
        let target = target.clone();
        self.runtime.spawn(async move {
            match Self::fetch(&client, &url).await {
                Ok(bytes) => {
                    let size = bytes.len();
                    if target.deliver(LoadedImage { url: url.clone(), bytes }) {
                        debug!("Loaded image {} ({} bytes)", url, size);
                    } else {
                        debug!("Discarded stale image {}", url);
                    }
                }
                Err(err) => warn!("Image load failed for {}: {:#}", url, err),
            }
        });
    }
}
