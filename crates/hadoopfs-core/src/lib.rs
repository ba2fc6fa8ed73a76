//! hadoopfs-core: a uniform filesystem over the `hadoop fs` client.
//!
//! This crate provides:
//!
//! - **uri**: split/join `scheme://authority/path` strings
//! - **process**: the [`CommandRunner`] seam and the real [`ProcessRunner`]
//! - **parse**: parsers for `-ls`, `-du` output and failure classification
//! - **vfs**: the [`Filesystem`] trait, [`HadoopFs`], [`LocalFs`] and the
//!   scheme-routing [`MultiFs`]
//! - **stream**: single-pass listings, byte streams and line streams
//!
//! ```ignore
//! use hadoopfs_core::{Filesystem, HadoopFs, LocalFs, MultiFs};
//!
//! let fs = MultiFs::new().with(LocalFs::new()).with(HadoopFs::new(["hadoop"]));
//! for line in fs.cat("hdfs:///logs/part-00000.gz").await? {
//!     print!("{}", String::from_utf8_lossy(&line?));
//! }
//! ```

pub mod compress;
pub mod config;
pub mod error;
pub mod parse;
pub mod process;
pub mod stream;
pub mod uri;
pub mod vfs;

pub use config::HadoopConfig;
pub use error::{FsError, FsResult};
pub use process::{CommandOutput, CommandRunner, Invocation, ProcessRunner, RunningCommand};
pub use stream::{ByteStream, LineStream, Listing};
pub use vfs::{DirEntry, EntryKind, Filesystem, HadoopFs, LocalFs, MultiFs};
