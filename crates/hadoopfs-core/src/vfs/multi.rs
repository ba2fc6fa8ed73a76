//! Scheme-routing filesystem.
//!
//! Holds an ordered list of backends; each operation goes to the first one
//! that claims the URI's scheme.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::traits::Filesystem;
use crate::compress::Compression;
use crate::error::{FsError, FsResult};
use crate::stream::{ByteStream, LineStream, Listing};
use crate::uri;

/// Routes operations to registered backends by URI scheme.
///
/// Order matters: earlier backends win when two claim the same scheme.
#[derive(Default)]
pub struct MultiFs {
    backends: Vec<Arc<dyn Filesystem>>,
}

impl fmt::Debug for MultiFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiFs")
            .field("backends", &self.backends.len())
            .finish()
    }
}

impl MultiFs {
    /// Create a multiplexer with no backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a backend after the existing ones.
    pub fn with(mut self, fs: impl Filesystem + 'static) -> Self {
        self.backends.push(Arc::new(fs));
        self
    }

    /// Add a backend (already wrapped in Arc) after the existing ones.
    pub fn push_arc(&mut self, fs: Arc<dyn Filesystem>) {
        self.backends.push(fs);
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// The first backend claiming `uri`'s scheme.
    pub fn dispatch(&self, uri: &str) -> FsResult<&Arc<dyn Filesystem>> {
        self.backends
            .iter()
            .find(|fs| fs.can_handle(uri))
            .ok_or_else(|| FsError::unsupported_scheme(uri))
    }

    /// Lines of a file, decompressed according to its extension.
    ///
    /// Works the same for every backend: `.gz` and `.bz2` are decoded on
    /// the fly, anything else is passed through.
    pub async fn cat(&self, uri: &str) -> FsResult<LineStream> {
        let raw: ByteStream = self.dispatch(uri)?.read(uri).await?;
        let compression = Compression::from_path(uri);
        debug!(uri, ?compression, "cat");
        Ok(LineStream::new(compression.decoder(raw)))
    }
}

#[async_trait]
impl Filesystem for MultiFs {
    fn claims(&self, scheme: Option<&str>) -> bool {
        self.backends.iter().any(|fs| fs.claims(scheme))
    }

    async fn list(&self, uri: &str) -> FsResult<Listing> {
        self.dispatch(uri)?.list(uri).await
    }

    async fn read(&self, uri: &str) -> FsResult<ByteStream> {
        self.dispatch(uri)?.read(uri).await
    }

    async fn disk_usage(&self, uri: &str) -> FsResult<u64> {
        self.dispatch(uri)?.disk_usage(uri).await
    }

    async fn make_directory(&self, uri: &str) -> FsResult<()> {
        self.dispatch(uri)?.make_directory(uri).await
    }

    async fn remove(&self, uri: &str) -> FsResult<()> {
        self.dispatch(uri)?.remove(uri).await
    }

    async fn touch(&self, uri: &str) -> FsResult<()> {
        self.dispatch(uri)?.touch(uri).await
    }

    async fn exists(&self, uri: &str) -> FsResult<bool> {
        self.dispatch(uri)?.exists(uri).await
    }

    fn join(&self, base: &str, segment: &str) -> String {
        match self.dispatch(base) {
            Ok(fs) => fs.join(base, segment),
            Err(_) => uri::path_join(base, segment),
        }
    }
}
