//! File store backing the `/files/` routes.
//!
//! Names arriving from the wire are untrusted. [`DiskStore`] maps them onto
//! its base directory and refuses anything that could escape it.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid file name: {0:?}")]
    InvalidName(String),
    #[error("file store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage the router reads uploads from and writes them to.
///
/// Each call is atomic from the caller's point of view: a `read` never sees
/// a partially written file, and concurrent `write`s never mix bytes.
pub trait FileStore: Send + Sync + 'static {
    fn exists(&self, name: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Returns `Ok(None)` when the file is missing.
    fn read(&self, name: &str) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Creates or replaces the file.
    fn write(&self, name: &str, contents: &[u8]) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Directory under the root holding in-flight uploads; never servable.
pub const TMP_DIR: &str = ".wirehttp-tmp";

/// Disk-backed store rooted at a single directory.
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    next_tmp: AtomicU64,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_tmp: AtomicU64::new(0),
        }
    }

    /// Joins `name` under the root, rejecting `..`, absolute paths, empty
    /// names and anything inside the upload staging directory.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        let mut out = PathBuf::new();
        for comp in Path::new(name).components() {
            match comp {
                Component::Normal(c) => out.push(c),
                Component::CurDir => {}
                _ => return Err(StoreError::InvalidName(name.to_string())),
            }
        }
        let staged = out.components().next().is_some_and(|c| c.as_os_str() == TMP_DIR);
        if out.as_os_str().is_empty() || staged {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(out))
    }

    fn temp_path(&self) -> PathBuf {
        let seq = self.next_tmp.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(TMP_DIR)
            .join(format!("{}.{seq}.tmp", std::process::id()))
    }
}

impl FileStore for DiskStore {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.resolve(name)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.resolve(name)?;
        match fs::read(&path).await {
            Ok(contents) => Ok(Some(contents)),
            // A directory is not a servable file
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, name: &str, contents: &[u8]) -> Result<(), StoreError> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Stage under the root, then rename over the target
        let tmp = self.temp_path();
        fs::create_dir_all(self.root.join(TMP_DIR)).await?;
        let result = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(contents).await?;
            file.sync_all().await?;
            fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}
