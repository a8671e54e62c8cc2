//! Cache abstraction consumed by the engine.

use std::io;
use std::path::PathBuf;

use futures_util::future::BoxFuture;

/// A cached module file opened for reading.
#[derive(Debug)]
pub struct CachedFile {
    pub file: tokio::fs::File,
    pub size: u64,
}

/// Read access to cached module files, keyed by their proxy path
/// (e.g. `example.com/m/@v/v1.0.0.info`).
pub trait Cacher: Send + Sync + 'static {
    /// `Ok(None)` when nothing is cached under `name`.
    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, io::Result<Option<CachedFile>>>;
}

/// Cacher backed by a plain directory tree.
#[derive(Debug, Clone)]
pub struct DirCacher {
    root: PathBuf,
}

impl DirCacher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Cacher for DirCacher {
    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, io::Result<Option<CachedFile>>> {
        Box::pin(async move {
            let path = name.split('/').fold(self.root.clone(), |path, part| path.join(part));
            let file = match tokio::fs::File::open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e),
            };
            let metadata = file.metadata().await?;
            if metadata.is_dir() {
                return Ok(None);
            }
            Ok(Some(CachedFile {
                file,
                size: metadata.len(),
            }))
        })
    }
}
