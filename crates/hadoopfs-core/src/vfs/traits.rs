//! Core filesystem trait and entry types.

use async_trait::async_trait;

use crate::error::FsResult;
use crate::stream::{ByteStream, Listing};
use crate::uri;

/// Kind of directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

/// One object found by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Full URI (or local path) of the object.
    pub uri: String,
    /// Kind of entry.
    pub kind: EntryKind,
    /// Size in bytes, when the backend reported one.
    pub size: Option<u64>,
}

impl DirEntry {
    /// Create a file entry.
    pub fn file(uri: impl Into<String>, size: u64) -> Self {
        Self {
            uri: uri.into(),
            kind: EntryKind::File,
            size: Some(size),
        }
    }

    /// Create a directory entry.
    pub fn directory(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            kind: EntryKind::Directory,
            size: None,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Abstract filesystem interface.
///
/// Everything is addressed by URI (or plain local path). A backend says
/// which schemes it takes via [`claims`](Filesystem::claims); the
/// multiplexer uses that to route.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// True if this backend handles URIs with `scheme` (`None` = plain path).
    fn claims(&self, scheme: Option<&str>) -> bool;

    /// True if this backend handles `uri`.
    fn can_handle(&self, uri: &str) -> bool {
        self.claims(uri::scheme_of(uri))
    }

    /// List every file under `uri`, recursively, in backend order.
    ///
    /// Directories are descended into but not yielded. An empty directory
    /// gives an empty listing; a missing path is `PathNotFound`.
    async fn list(&self, uri: &str) -> FsResult<Listing>;

    /// Stream the raw bytes of a file.
    async fn read(&self, uri: &str) -> FsResult<ByteStream>;

    /// Total bytes under `uri` (a file, a directory, or a glob).
    async fn disk_usage(&self, uri: &str) -> FsResult<u64>;

    /// Create a directory and its parents. Succeeds if it already exists.
    async fn make_directory(&self, uri: &str) -> FsResult<()>;

    /// Remove a file, or a directory recursively.
    async fn remove(&self, uri: &str) -> FsResult<()>;

    /// Create an empty file if absent; bump its modification time if present.
    async fn touch(&self, uri: &str) -> FsResult<()>;

    /// Check if a path exists.
    async fn exists(&self, uri: &str) -> FsResult<bool>;

    /// Join a path segment onto `base`.
    fn join(&self, base: &str, segment: &str) -> String {
        uri::path_join(base, segment)
    }
}
