//! A [`SaveStore`] backed by a single JSON file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use market_core::persistence::{SAVE_KEY, SaveStore, StoreError};
use tracing::debug;

/// Keeps the save blob in one file. Writes go to a sibling temp file first
/// and are renamed into place, so a crash mid-write leaves the old save.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `{dir}/market_save.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(format!("{SAVE_KEY}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveStore for FileStore {
    fn load(&mut self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no save file yet");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn store(&mut self, blob: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
