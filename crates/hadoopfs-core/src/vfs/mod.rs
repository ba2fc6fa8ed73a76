//! Filesystem backends.
//!
//! - **HadoopFs**: drives `hadoop fs` through a [`CommandRunner`](crate::process::CommandRunner)
//! - **LocalFs**: plain paths and `file://` URIs on the local disk
//! - **MultiFs**: routes each URI to the first backend that claims its scheme
//!
//! ```text
//! MultiFs
//! ├── LocalFs    claims: <no scheme>, file
//! └── HadoopFs   claims: hdfs (configurable)
//! ```

mod hadoop;
mod local;
mod multi;
mod traits;

pub use hadoop::HadoopFs;
pub use local::LocalFs;
pub use multi::MultiFs;
pub use traits::{DirEntry, EntryKind, Filesystem};
