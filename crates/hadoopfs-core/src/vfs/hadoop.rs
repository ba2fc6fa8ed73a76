//! Hadoop filesystem backend.
//!
//! Every operation is one `hadoop fs <subcommand>` invocation through the
//! injected [`CommandRunner`] (`make_directory` may add a `-test -d`).
//! `list` and `read` stream the client's stdout while it runs:
//!
//! | Operation        | Invocation                  |
//! |------------------|-----------------------------|
//! | `list`           | `hadoop fs -ls -R URI`      |
//! | `read`           | `hadoop fs -cat URI`        |
//! | `disk_usage`     | `hadoop fs -du -s URI`      |
//! | `make_directory` | `hadoop fs -mkdir -p URI`   |
//! | `remove`         | `hadoop fs -rm -R URI`      |
//! | `touch`          | `hadoop fs -touchz URI`     |
//! | `exists`         | `hadoop fs -test -e URI`    |

use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use super::traits::{DirEntry, EntryKind, Filesystem};
use crate::config::HadoopConfig;
use crate::error::{FsError, FsResult};
use crate::parse::{self, LsLine};
use crate::process::{CommandOutput, CommandRunner, Invocation, ProcessRunner, RunningCommand};
use crate::stream::{ByteStream, Listing};
use crate::uri::{self, Uri};

/// `mkdir` on an existing directory prints this on old clients, even with `-p`.
const MKDIR_EXISTS: &str = "File exists";

/// Filesystem backed by the `hadoop fs` command-line client.
pub struct HadoopFs {
    hadoop_bin: Vec<String>,
    env: Vec<(String, String)>,
    schemes: Vec<String>,
    runner: Arc<dyn CommandRunner>,
}

impl fmt::Debug for HadoopFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HadoopFs")
            .field("hadoop_bin", &self.hadoop_bin)
            .field("schemes", &self.schemes)
            .finish_non_exhaustive()
    }
}

impl HadoopFs {
    /// Backend that runs `hadoop_bin` as a real process and claims `hdfs://`.
    pub fn new<I, S>(hadoop_bin: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hadoop_bin: hadoop_bin.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            schemes: vec!["hdfs".to_string()],
            runner: Arc::new(ProcessRunner),
        }
    }

    /// Backend built from a [`HadoopConfig`].
    pub fn from_config(config: &HadoopConfig) -> Self {
        Self::new(config.hadoop_bin.iter().cloned())
            .with_env(config.env.iter().map(|(k, v)| (k.clone(), v.clone())))
            .with_schemes(config.schemes.iter().cloned())
    }

    /// Run invocations through `runner` instead of spawning processes.
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Add environment variables to every invocation.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Replace the set of claimed URI schemes.
    pub fn with_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemes = schemes.into_iter().map(Into::into).collect();
        self
    }

    /// The command prefix, e.g. `["hadoop"]`.
    pub fn hadoop_bin(&self) -> &[String] {
        &self.hadoop_bin
    }

    /// Build the invocation for `hadoop fs <args>`.
    fn fs_invocation(&self, args: &[&str]) -> Invocation {
        let argv = self
            .hadoop_bin
            .iter()
            .map(String::as_str)
            .chain(std::iter::once("fs"))
            .chain(args.iter().copied());
        Invocation::new(argv).envs(self.env.iter().cloned())
    }

    /// Run `hadoop fs <args>` and log what it said. Does not check status.
    async fn run_fs(
        &self,
        args: &[&str],
        ok_stderr: &[&str],
    ) -> FsResult<(Invocation, CommandOutput)> {
        let invocation = self.fs_invocation(args);
        debug!("> {}", invocation.command_line());

        let output = self.runner.run(&invocation).await?;

        for line in output.stderr.lines().filter(|l| !l.trim().is_empty()) {
            if ok_stderr.iter().any(|ok| line.contains(ok)) {
                continue;
            }
            if output.success() {
                debug!("STDERR: {}", line);
            } else {
                error!("STDERR: {}", line);
            }
        }
        Ok((invocation, output))
    }

    /// Start `hadoop fs <args>` and wait for its first output.
    ///
    /// A command that fails without printing anything fails here; later
    /// failures surface at the end of the stream.
    async fn stream_fs(&self, args: &[&str]) -> FsResult<RunningCommand> {
        let invocation = self.fs_invocation(args);
        debug!("> {}", invocation.command_line());

        let mut running = self.runner.spawn(&invocation).await?;
        tokio::task::spawn_blocking(move || -> FsResult<RunningCommand> {
            running.prime()?;
            Ok(running)
        })
        .await
        .map_err(|e| FsError::Io(io::Error::other(e)))?
    }

    /// `hadoop fs -test <flag> URI`: status 0 is true, a plain 1 is false.
    async fn test_path(&self, flag: &str, uri: &str) -> FsResult<bool> {
        let (invocation, output) = self.run_fs(&["-test", flag, uri], &[]).await?;
        match output.status {
            0 => Ok(true),
            1 if output.stderr.trim().is_empty() || parse::is_not_found(&output.stderr) => {
                Ok(false)
            }
            _ => Err(FsError::BackendCommand {
                command: invocation.command_line(),
                status: output.status,
                stderr: output.stderr,
            }),
        }
    }

    /// Run `hadoop fs <args>` and fail on a bad status.
    async fn invoke(&self, args: &[&str], ok_stderr: &[&str]) -> FsResult<CommandOutput> {
        let (invocation, output) = self.run_fs(args, ok_stderr).await?;
        parse::check_status(&invocation, &output, ok_stderr)?;
        Ok(output)
    }
}

/// Turn a listed path into a URI under the same `scheme://authority` as
/// the URI that was listed. Full URIs from newer clients pass through.
fn entry_uri(prefix: Option<&str>, path: &str) -> String {
    if uri::is_uri(path) {
        return uri::normalize(path);
    }
    match prefix {
        Some(prefix) => uri::normalize(&format!("{}{}", prefix, path)),
        None => path.to_string(),
    }
}

#[async_trait]
impl Filesystem for HadoopFs {
    fn claims(&self, scheme: Option<&str>) -> bool {
        scheme.is_some_and(|s| self.schemes.iter().any(|c| c == s))
    }

    async fn list(&self, uri: &str) -> FsResult<Listing> {
        let running = self.stream_fs(&["-ls", "-R", uri]).await?;
        let prefix = Uri::parse(uri).ok().map(|u| u.prefix());

        let entries = BufReader::new(running).lines().filter_map(move |line| {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(FsError::from(e))),
            };
            match parse::parse_ls_line(&line) {
                Ok(Some(LsLine {
                    kind: EntryKind::File,
                    size,
                    path,
                })) => Some(Ok(DirEntry {
                    uri: entry_uri(prefix.as_deref(), &path),
                    kind: EntryKind::File,
                    size,
                })),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }
        });
        Ok(Listing::new(entries))
    }

    async fn read(&self, uri: &str) -> FsResult<ByteStream> {
        let running = self.stream_fs(&["-cat", uri]).await?;
        Ok(ByteStream::from_reader(running))
    }

    async fn disk_usage(&self, uri: &str) -> FsResult<u64> {
        let output = self.invoke(&["-du", "-s", uri], &[]).await?;
        let usage = parse::parse_du(&output.stdout_text())?;
        Ok(usage.iter().map(|(bytes, _)| bytes).sum())
    }

    async fn make_directory(&self, uri: &str) -> FsResult<()> {
        let (invocation, output) = self.run_fs(&["-mkdir", "-p", uri], &[MKDIR_EXISTS]).await?;
        let checked = parse::check_status(&invocation, &output, &[]);
        if checked.is_err()
            && parse::stderr_is_tolerated(&output.stderr, &[MKDIR_EXISTS])
            && self.test_path("-d", uri).await?
        {
            return Ok(());
        }
        checked
    }

    async fn remove(&self, uri: &str) -> FsResult<()> {
        self.invoke(&["-rm", "-R", uri], &[]).await?;
        Ok(())
    }

    async fn touch(&self, uri: &str) -> FsResult<()> {
        self.invoke(&["-touchz", uri], &[]).await?;
        Ok(())
    }

    async fn exists(&self, uri: &str) -> FsResult<bool> {
        self.test_path("-e", uri).await
    }
}
