//! Substitute the mock client for the real one.
//!
//! [`MockHadoop`] owns a throwaway cluster (a temp dir with
//! `mock_hdfs_root/` and `mock_hadoop_output/`) and implements
//! [`CommandRunner`] by calling [`cli::main`] in-process. Every call is
//! recorded so tests can assert on exactly what was run. Streaming
//! operations get the captured output replayed, with the exit status
//! checked at the end just as for a live process.
//!
//! Dropping the harness deletes the cluster; nothing global is touched.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use hadoopfs_core::{
    CommandOutput, CommandRunner, FsResult, HadoopFs, Invocation, LocalFs, MultiFs,
};
use tempfile::TempDir;
use tracing::trace;

use crate::cli::{self, ENV_HADOOP_OUTPUT, ENV_HDFS_ROOT, ENV_USER};

/// User the harness runs as unless told otherwise.
pub const DEFAULT_USER: &str = "hadoopfs_tests";

/// One call to the mock client, with everything it printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedInvocation {
    pub args: Vec<String>,
    /// Effective environment the client saw.
    pub env: BTreeMap<String, String>,
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub status: i32,
}

/// A private mock cluster plus a runner that talks to it.
#[derive(Debug)]
pub struct MockHadoop {
    dir: TempDir,
    env: BTreeMap<String, String>,
    log: Mutex<Vec<RecordedInvocation>>,
}

impl MockHadoop {
    /// Fresh, empty cluster running as [`DEFAULT_USER`].
    pub fn new() -> io::Result<Self> {
        Self::with_user(DEFAULT_USER)
    }

    /// Fresh, empty cluster running as `user`.
    pub fn with_user(user: impl Into<String>) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("mock-hadoop-").tempdir()?;
        let hdfs_root = dir.path().join("mock_hdfs_root");
        let output = dir.path().join("mock_hadoop_output");
        fs::create_dir(&hdfs_root)?;
        fs::create_dir(&output)?;

        let env = BTreeMap::from([
            (ENV_HDFS_ROOT.to_string(), hdfs_root.to_string_lossy().into_owned()),
            (ENV_HADOOP_OUTPUT.to_string(), output.to_string_lossy().into_owned()),
            (ENV_USER.to_string(), user.into()),
        ]);
        Ok(Self {
            dir,
            env,
            log: Mutex::default(),
        })
    }

    /// Local directory backing `hdfs:///`.
    pub fn hdfs_root(&self) -> PathBuf {
        self.dir.path().join("mock_hdfs_root")
    }

    /// Local directory for job output.
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("mock_hadoop_output")
    }

    /// The environment overlay given to every call.
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn user(&self) -> &str {
        self.env.get(ENV_USER).map(String::as_str).unwrap_or(DEFAULT_USER)
    }

    /// Local path of cluster path `path` (leading `/` optional).
    pub fn real_path(&self, path: &str) -> PathBuf {
        self.hdfs_root().join(path.trim_start_matches('/'))
    }

    /// Put a file on the cluster, creating parent directories.
    pub fn make_file(&self, path: &str, contents: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        let real = self.real_path(path);
        if let Some(parent) = real.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&real, contents)?;
        Ok(real)
    }

    /// Create a directory on the cluster, with parents.
    pub fn make_dir(&self, path: &str) -> io::Result<PathBuf> {
        let real = self.real_path(path);
        fs::create_dir_all(&real)?;
        Ok(real)
    }

    /// Every call so far, oldest first.
    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.lock_log().clone()
    }

    /// Just the argv of every call so far.
    pub fn command_log(&self) -> Vec<Vec<String>> {
        self.lock_log().iter().map(|r| r.args.clone()).collect()
    }

    pub fn clear_log(&self) {
        self.lock_log().clear();
    }

    /// `HadoopFs` for `hadoop`, routed through this harness.
    pub fn hadoop_fs(self: &Arc<Self>) -> HadoopFs {
        HadoopFs::new(["hadoop"]).with_runner(self.clone())
    }

    /// Local paths plus `hdfs://` through this harness.
    pub fn multi_fs(self: &Arc<Self>) -> MultiFs {
        MultiFs::new().with(LocalFs::new()).with(self.hadoop_fs())
    }

    fn lock_log(&self) -> MutexGuard<'_, Vec<RecordedInvocation>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CommandRunner for MockHadoop {
    async fn run(&self, invocation: &Invocation) -> FsResult<CommandOutput> {
        let mut env = self.env.clone();
        env.extend(invocation.env.iter().cloned());

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = cli::main(&mut stdout, &mut stderr, &invocation.args, &env)?;
        let stderr = String::from_utf8_lossy(&stderr).into_owned();
        trace!(
            command = %invocation.command_line(),
            status,
            "mock hadoop"
        );

        self.lock_log().push(RecordedInvocation {
            args: invocation.args.clone(),
            env,
            stdout: stdout.clone(),
            stderr: stderr.clone(),
            status,
        });
        Ok(CommandOutput {
            stdout,
            stderr,
            status,
        })
    }
}
