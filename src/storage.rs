use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::debug;

/// An uploaded image written to disk for the OCR engine.
/// The file is removed when this value is dropped.
#[derive(Debug)]
pub struct StoredImage {
    file: NamedTempFile,
}

impl StoredImage {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn persist(&self, body: Bytes, content_type: &str) -> anyhow::Result<StoredImage>;
}

/// Writes uploads into a local directory, one temp file per upload.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create upload dir {}", dir.display()))?;
        Ok(Self { dir })
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn persist(&self, body: Bytes, content_type: &str) -> anyhow::Result<StoredImage> {
        let suffix = format!(".{}", ext_from_mime(content_type).unwrap_or("bin"));
        let dir = self.dir.clone();
        let file = tokio::task::spawn_blocking(move || -> anyhow::Result<NamedTempFile> {
            let mut file = tempfile::Builder::new()
                .prefix("receipt-")
                .suffix(&suffix)
                .tempfile_in(&dir)
                .with_context(|| format!("create temp file in {}", dir.display()))?;
            file.write_all(&body).context("write upload")?;
            file.flush().context("flush upload")?;
            Ok(file)
        })
        .await
        .context("join image writer")??;

        debug!(path = %file.path().display(), "upload persisted");
        Ok(StoredImage { file })
    }
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/tiff" => Some("tiff"),
        "image/bmp" => Some("bmp"),
        _ => None,
    }
}
