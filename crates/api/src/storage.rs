//! Local-disk storage for uploaded client documents.
//!
//! Files live under `STORAGE_DIR/{tax_year_id}/{uuid}.{ext}`. Only the
//! relative path is stored in the database, so the root can move.

use std::io;
use std::path::{Component, Path, PathBuf};

use taxdesk_core::types::DbId;
use uuid::Uuid;

#[derive(Debug)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` under a fresh name and return its relative path.
    pub async fn save(&self, tax_year_id: DbId, ext: &str, data: &[u8]) -> io::Result<String> {
        let dir = self.root.join(tax_year_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let relative = format!("{tax_year_id}/{}.{ext}", Uuid::new_v4());
        tokio::fs::write(self.root.join(&relative), data).await?;
        Ok(relative)
    }

    pub async fn read(&self, relative: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.resolve(relative)?).await
    }

    /// Remove a file written by [`save`](Self::save). Missing files are ignored.
    pub async fn discard(&self, relative: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.resolve(relative)?).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Join a stored relative path onto the root, refusing anything that
    /// could escape it.
    fn resolve(&self, relative: &str) -> io::Result<PathBuf> {
        let path = Path::new(relative);
        if path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid stored path '{relative}'"),
            ));
        }
        Ok(self.root.join(path))
    }
}
