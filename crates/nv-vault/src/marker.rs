//! Optimistic "a vault exists" hint, kept outside the record store.
//!
//! Lets a UI pick between the setup and unlock screens before the store has
//! been read. It is never consulted when accepting a credential.

use std::path::{Path, PathBuf};

use nv_core::NvResult;

#[derive(Debug, Clone)]
pub struct VaultMarker {
    path: PathBuf,
}

impl VaultMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unreadable counts as unset.
    pub async fn is_set(&self) -> bool {
        matches!(tokio::fs::read_to_string(&self.path).await, Ok(s) if s.trim() == "1")
    }

    /// Atomically write the marker (temp file, then rename).
    pub async fn set(&self) -> NvResult<()> {
        let parent = self.path.parent().unwrap_or(Path::new("."));
        tokio::fs::create_dir_all(parent).await?;
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy()
        ));
        tokio::fs::write(&tmp_path, b"1").await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    pub async fn clear(&self) -> NvResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
