use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Kind of payload being persisted; determines the file name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Photo,
    Raw,
}

impl UploadKind {
    fn suffix(self) -> &'static str {
        match self {
            UploadKind::Photo => "photo.jpg",
            UploadKind::Raw => "raw.bin",
        }
    }
}

/// Fire-and-forget persistence of uploaded payloads.
///
/// The decision pipeline runs on the in-memory bytes; a write failure here
/// is logged and never affects the decision or the response.
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// An unusable upload directory is a startup error, not a request error.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create upload directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Persist the payload and return the file name reported to the caller.
    pub async fn save(&self, kind: UploadKind, bytes: &[u8]) -> String {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let name = format!("{}_{}", secs, kind.suffix());
        let path = self.dir.join(&name);

        match tokio::fs::write(&path, bytes).await {
            Ok(()) => info!("saved upload: {}", name),
            Err(e) => warn!("failed to persist upload {}: {}", name, e),
        }
        name
    }
}
