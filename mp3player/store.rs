use crate::error::StoreError;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncRead;

pub type AudioStream = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    async fn open(&self, path: &str) -> Result<AudioStream, StoreError>;
}

/// Serves files below a root directory, e.g. the mount point of an SD card.
#[derive(Clone, Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a player path onto the root. Paths are always relative to the
    /// root; a leading `/` is accepted, `..` is not.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        (resolved != self.root).then_some(resolved)
    }
}

#[async_trait]
impl FileStore for DirStore {
    async fn open(&self, path: &str) -> Result<AudioStream, StoreError> {
        let resolved = self
            .resolve(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        debug!("Opening {}", resolved.display());

        let metadata = tokio::fs::metadata(&resolved)
            .await
            .map_err(|e| StoreError::from_io(path, &e))?;
        if !metadata.is_file() {
            return Err(StoreError::Open {
                path: path.to_string(),
                reason: "not a regular file".to_string(),
            });
        }

        let file = tokio::fs::File::open(&resolved)
            .await
            .map_err(|e| StoreError::from_io(path, &e))?;
        Ok(Box::new(file))
    }
}

/// In-memory file store. Handy for tests and for playing bundled clips.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    files: HashMap<String, Arc<[u8]>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), Arc::from(data.into()));
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn open(&self, path: &str) -> Result<AudioStream, StoreError> {
        self.files
            .get(path)
            .map(|data| Box::new(Cursor::new(Arc::clone(data))) as AudioStream)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }
}
