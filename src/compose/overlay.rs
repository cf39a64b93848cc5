//! Overlay descriptors and asset loading.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Overlay side length as a fraction of output width, per viewport class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlaySizing {
    pub narrow_fraction: f64,
    pub wide_fraction: f64,
}

impl Default for OverlaySizing {
    fn default() -> Self {
        Self {
            narrow_fraction: 0.7,
            wide_fraction: 0.4,
        }
    }
}

impl OverlaySizing {
    /// Fraction for the given viewport class.
    #[inline]
    pub fn fraction(&self, is_narrow: bool) -> f64 {
        if is_narrow {
            self.narrow_fraction
        } else {
            self.wide_fraction
        }
    }
}

/// A selected overlay: which graphic, and how big to draw it.
///
/// Overlays are always square and centered.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayDescriptor {
    uri: String,
    sizing: OverlaySizing,
}

impl OverlayDescriptor {
    /// Overlay for `uri` with default sizing.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            sizing: OverlaySizing::default(),
        }
    }

    /// Replaces the sizing policy.
    pub fn with_sizing(mut self, sizing: OverlaySizing) -> Self {
        self.sizing = sizing;
        self
    }

    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[inline]
    pub fn sizing(&self) -> &OverlaySizing {
        &self.sizing
    }
}

/// Errors that can occur while loading an overlay graphic.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("overlay asset not found: {0}")]
    NotFound(String),
    #[error("overlay asset {0} resolves outside the asset root")]
    OutsideRoot(String),
    #[error("failed to read overlay asset {uri}: {reason}")]
    Read { uri: String, reason: String },
    #[error("failed to decode overlay asset {uri}: {source}")]
    Decode {
        uri: String,
        #[source]
        source: image::ImageError,
    },
    #[error("overlay asset {0} did not load in time")]
    TimedOut(String),
}

/// Loads and decodes overlay graphics.
#[allow(async_fn_in_trait)]
pub trait AssetLoader {
    /// Loads `uri`. Suspends until the image is decoded.
    async fn load(&self, uri: &str) -> Result<RgbaImage, AssetError>;
}

/// Decodes encoded image bytes into RGBA8.
pub fn decode_overlay(uri: &str, bytes: &[u8]) -> Result<RgbaImage, AssetError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|source| AssetError::Decode {
            uri: uri.to_string(),
            source,
        })
}

/// Loads overlays from files under a root directory.
#[derive(Debug, Clone)]
pub struct FsAssetLoader {
    root: PathBuf,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `uri` under the root; absolute paths and `..` are rejected.
    fn resolve(&self, uri: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(uri);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(AssetError::OutsideRoot(uri.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetLoader for FsAssetLoader {
    async fn load(&self, uri: &str) -> Result<RgbaImage, AssetError> {
        let path = self.resolve(uri)?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(uri.to_string()),
            _ => AssetError::Read {
                uri: uri.to_string(),
                reason: e.to_string(),
            },
        })?;

        let image = decode_overlay(uri, &bytes)?;
        tracing::debug!(
            uri,
            width = image.width(),
            height = image.height(),
            "Overlay asset loaded"
        );
        Ok(image)
    }
}

/// Serves overlays from encoded bytes kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetLoader {
    assets: HashMap<String, Arc<Vec<u8>>>,
}

impl MemoryAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers encoded image bytes under `uri`.
    pub fn insert(&mut self, uri: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(uri.into(), Arc::new(bytes));
    }

    /// Registers a decoded image under `uri`, stored PNG-encoded.
    pub fn insert_image(
        &mut self,
        uri: impl Into<String>,
        image: &RgbaImage,
    ) -> Result<(), image::ImageError> {
        let mut bytes = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        self.insert(uri, bytes);
        Ok(())
    }

    /// Number of registered assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetLoader for MemoryAssetLoader {
    async fn load(&self, uri: &str) -> Result<RgbaImage, AssetError> {
        let bytes = self
            .assets
            .get(uri)
            .ok_or_else(|| AssetError::NotFound(uri.to_string()))?;
        decode_overlay(uri, bytes)
    }
}
