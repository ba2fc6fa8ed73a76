//! Local filesystem backend.
//!
//! Handles plain paths and `file://` URIs with the same contract as the
//! cluster backends, so callers can mix local and remote paths freely.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::fs;

use super::traits::{DirEntry, Filesystem};
use crate::error::{FsError, FsResult};
use crate::stream::{ByteStream, Listing};

const FILE_PREFIX: &str = "file://";

/// Local filesystem backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }

    /// Local path for a plain path or `file://` URI.
    fn to_path(uri: &str) -> PathBuf {
        PathBuf::from(uri.strip_prefix(FILE_PREFIX).unwrap_or(uri))
    }

    /// Render `path` the way the caller spelled the input (`file://` or plain).
    fn to_uri(like: &str, path: &Path) -> String {
        let path = path.to_string_lossy();
        if like.starts_with(FILE_PREFIX) {
            format!("{}{}", FILE_PREFIX, path)
        } else {
            path.into_owned()
        }
    }

    fn has_glob(path: &str) -> bool {
        path.contains(['*', '?', '['])
    }

    /// Expand a glob; a path without metacharacters expands to itself if it exists.
    async fn expand(uri: &str) -> FsResult<Vec<PathBuf>> {
        let path = Self::to_path(uri);
        let pattern = path.to_string_lossy();

        let matches: Vec<PathBuf> = if Self::has_glob(&pattern) {
            glob::glob(&pattern)
                .map_err(|e| FsError::malformed_uri(format!("{}: {}", uri, e)))?
                .filter_map(Result::ok)
                .collect()
        } else if fs::try_exists(&path).await? {
            vec![path]
        } else {
            Vec::new()
        };

        if matches.is_empty() {
            return Err(FsError::not_found(uri));
        }
        Ok(matches)
    }

    /// Files under `root`: files of each directory (sorted), then its
    /// subdirectories (sorted), depth first.
    async fn walk_files(root: &Path) -> FsResult<Vec<(PathBuf, u64)>> {
        let mut files = Vec::new();
        let mut stack = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            let mut here = Vec::new();
            let mut subdirs = Vec::new();
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let meta = fs::metadata(entry.path()).await?;
                if meta.is_dir() {
                    subdirs.push(entry.path());
                } else {
                    here.push((entry.path(), meta.len()));
                }
            }
            here.sort();
            subdirs.sort();
            files.extend(here);
            stack.extend(subdirs.into_iter().rev());
        }
        Ok(files)
    }
}

#[async_trait]
impl Filesystem for LocalFs {
    fn claims(&self, scheme: Option<&str>) -> bool {
        matches!(scheme, None | Some("file"))
    }

    async fn list(&self, uri: &str) -> FsResult<Listing> {
        let mut entries = Vec::new();
        for path in Self::expand(uri).await? {
            let meta = fs::metadata(&path).await?;
            if meta.is_dir() {
                for (file, size) in Self::walk_files(&path).await? {
                    entries.push(DirEntry::file(Self::to_uri(uri, &file), size));
                }
            } else {
                entries.push(DirEntry::file(Self::to_uri(uri, &path), meta.len()));
            }
        }
        Ok(Listing::from_entries(entries))
    }

    async fn read(&self, uri: &str) -> FsResult<ByteStream> {
        let path = Self::to_path(uri);
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FsError::not_found(uri));
            }
            Err(e) => return Err(e.into()),
        };
        if meta.is_dir() {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::IsADirectory,
                format!("{}: Is a directory", uri),
            )));
        }
        let file = fs::File::open(&path).await?;
        Ok(ByteStream::from_reader(file.into_std().await))
    }

    async fn disk_usage(&self, uri: &str) -> FsResult<u64> {
        let mut total = 0;
        for path in Self::expand(uri).await? {
            let meta = fs::metadata(&path).await?;
            if meta.is_dir() {
                total += Self::walk_files(&path)
                    .await?
                    .iter()
                    .map(|(_, size)| size)
                    .sum::<u64>();
            } else {
                total += meta.len();
            }
        }
        Ok(total)
    }

    async fn make_directory(&self, uri: &str) -> FsResult<()> {
        fs::create_dir_all(Self::to_path(uri)).await?;
        Ok(())
    }

    async fn remove(&self, uri: &str) -> FsResult<()> {
        for path in Self::expand(uri).await? {
            let meta = fs::symlink_metadata(&path).await?;
            if meta.is_dir() {
                fs::remove_dir_all(&path).await?;
            } else {
                fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }

    async fn touch(&self, uri: &str) -> FsResult<()> {
        let path = Self::to_path(uri);
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FsError::not_found(uri),
                _ => FsError::Io(e),
            })?;
        let file = file.into_std().await;
        tokio::task::spawn_blocking(move || file.set_modified(SystemTime::now()))
            .await
            .map_err(|e| FsError::Io(std::io::Error::other(e)))??;
        Ok(())
    }

    async fn exists(&self, uri: &str) -> FsResult<bool> {
        Ok(fs::try_exists(Self::to_path(uri)).await?)
    }
}
