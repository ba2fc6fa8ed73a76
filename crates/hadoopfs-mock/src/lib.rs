//! hadoopfs-mock: run `hadoop fs` against a local directory.
//!
//! - **cli**: the fake client, callable in-process
//! - **harness**: [`MockHadoop`], a [`hadoopfs_core::CommandRunner`] that
//!   serves every call from a private temp cluster and logs it
//!
//! ```ignore
//! let mock = Arc::new(MockHadoop::new()?);
//! mock.make_file("data/foo", "foo\nfoo\n")?;
//! let fs = mock.multi_fs();
//! assert_eq!(fs.disk_usage("hdfs:///data").await?, 8);
//! ```

pub mod cli;
pub mod harness;

pub use harness::{MockHadoop, RecordedInvocation};
