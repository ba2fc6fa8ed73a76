//! Running the external client.
//!
//! [`CommandRunner`] is the seam between filesystem operations and process
//! spawning. It has two forms:
//!
//! - [`CommandRunner::run`] waits for exit and captures everything
//! - [`CommandRunner::spawn`] hands back a [`RunningCommand`] whose stdout
//!   is read while the process is still going
//!
//! [`ProcessRunner`] spawns real processes; the mock crate provides a
//! runner that answers in-process instead.

use std::fmt;
use std::io::{self, BufRead, BufReader, Cursor, Read, Write};
use std::process::{Child, Command as StdCommand, Stdio};
use std::thread::{self, JoinHandle};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error};

use crate::error::{FsError, FsResult};
use crate::parse;

/// One execution request: argv, environment overlay, optional stdin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Full argument vector; `args[0]` is the program.
    pub args: Vec<String>,
    /// Variables added on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Bytes fed to the process's stdin, if any.
    pub stdin: Option<Vec<u8>>,
}

impl Invocation {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            stdin: None,
        }
    }

    /// Add environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Feed `data` to the process on stdin.
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// The program to run.
    pub fn program(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }

    /// The argv joined with spaces, for logs and error messages.
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

/// Captured result of an [`Invocation`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Everything written to stdout. Bytes, since `-cat` may emit compressed data.
    pub stdout: Vec<u8>,
    /// Everything written to stderr.
    pub stderr: String,
    /// Exit status; -1 if the process was killed by a signal.
    pub status: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Stdout as text (lossy UTF-8).
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Executes invocations.
///
/// Implementations must not treat a non-zero status as an error; that's
/// for the caller to interpret. Only failure to run at all is an `Err`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture stdout, stderr and status.
    async fn run(&self, invocation: &Invocation) -> FsResult<CommandOutput>;

    /// Start the command and return its live stdout.
    ///
    /// The default runs to completion and replays the captured output,
    /// which suits runners that answer in memory.
    async fn spawn(&self, invocation: &Invocation) -> FsResult<RunningCommand> {
        let output = self.run(invocation).await?;
        Ok(RunningCommand::captured(invocation.clone(), output))
    }
}

type WaitFn = Box<dyn FnOnce() -> io::Result<(i32, String)> + Send>;

/// A started command: its stdout, plus a way to wait for the exit.
///
/// Reading returns stdout bytes. At end of output the process is waited
/// for and its status checked: a failure comes back as a read error
/// carrying the matching [`FsError`] (`FsError::from` recovers it).
/// Dropping it before the end kills the process.
pub struct RunningCommand {
    invocation: Invocation,
    stdout: BufReader<Box<dyn Read + Send>>,
    wait: Option<WaitFn>,
}

impl RunningCommand {
    /// `wait` blocks until exit and returns `(status, stderr)`.
    pub fn new(
        invocation: Invocation,
        stdout: impl Read + Send + 'static,
        wait: impl FnOnce() -> io::Result<(i32, String)> + Send + 'static,
    ) -> Self {
        Self {
            invocation,
            stdout: BufReader::new(Box::new(stdout)),
            wait: Some(Box::new(wait)),
        }
    }

    /// Replay output that was already captured.
    pub fn captured(invocation: Invocation, output: CommandOutput) -> Self {
        let CommandOutput {
            stdout,
            stderr,
            status,
        } = output;
        Self::new(invocation, Cursor::new(stdout), move || Ok((status, stderr)))
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Block until the first byte of output or the exit, whichever is first.
    ///
    /// A command that exits without printing anything is checked here, so
    /// a missing path fails before the caller starts reading.
    pub fn prime(&mut self) -> FsResult<()> {
        if self.stdout.fill_buf()?.is_empty() {
            self.finish()?;
        }
        Ok(())
    }

    /// Wait for exit and check the status. Later calls do nothing.
    pub fn finish(&mut self) -> FsResult<()> {
        let Some(wait) = self.wait.take() else {
            return Ok(());
        };
        let (status, stderr) = wait()?;
        let output = CommandOutput {
            stdout: Vec::new(),
            stderr,
            status,
        };
        for line in output.stderr.lines().filter(|l| !l.trim().is_empty()) {
            if output.success() {
                debug!("STDERR: {}", line);
            } else {
                error!("STDERR: {}", line);
            }
        }
        parse::check_status(&self.invocation, &output, &[])
    }
}

impl Read for RunningCommand {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.stdout.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.finish().map_err(io::Error::from)?;
        }
        Ok(n)
    }
}

impl fmt::Debug for RunningCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningCommand")
            .field("command", &self.invocation.command_line())
            .field("exited", &self.wait.is_none())
            .finish_non_exhaustive()
    }
}

/// Kills and reaps the child unless it was waited for.
struct ChildGuard(Option<Child>);

impl ChildGuard {
    fn wait(mut self) -> io::Result<i32> {
        match self.0.take() {
            Some(mut child) => Ok(child.wait()?.code().unwrap_or(-1)),
            None => Err(io::Error::other("process already reaped")),
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.0.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Read a pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn empty_argv() -> FsError {
    FsError::BackendUnavailable {
        program: String::new(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "empty argv"),
    }
}

/// Spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> FsResult<CommandOutput> {
        let program = invocation.program();
        if program.is_empty() {
            return Err(empty_argv());
        }

        let mut cmd = Command::new(program);
        cmd.args(&invocation.args[1..]);
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        cmd.stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Dropping the child (early return, cancelled future) reaps the process.
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| FsError::BackendUnavailable {
            program: program.to_string(),
            source,
        })?;

        // Stdin is fed while output is collected, so neither pipe can fill up
        // and stall the other.
        let stdin = child.stdin.take();
        let feed = async move {
            let (Some(data), Some(mut stdin)) = (invocation.stdin.as_deref(), stdin) else {
                return Ok(());
            };
            match stdin.write_all(data).await {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code().unwrap_or(-1),
        })
    }

    async fn spawn(&self, invocation: &Invocation) -> FsResult<RunningCommand> {
        let program = invocation.program();
        if program.is_empty() {
            return Err(empty_argv());
        }

        let mut cmd = StdCommand::new(program);
        cmd.args(&invocation.args[1..]);
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        cmd.stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| FsError::BackendUnavailable {
            program: program.to_string(),
            source,
        })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(FsError::Io(io::Error::other("child pipes were not captured")));
        };
        if let (Some(data), Some(mut stdin)) = (invocation.stdin.clone(), child.stdin.take()) {
            thread::spawn(move || {
                let _ = stdin.write_all(&data);
            });
        }

        let stderr = drain(stderr);
        let guard = ChildGuard(Some(child));
        Ok(RunningCommand::new(invocation.clone(), stdout, move || {
            let status = guard.wait()?;
            let stderr = stderr
                .join()
                .map_err(|_| io::Error::other("stderr reader panicked"))?;
            Ok((status, String::from_utf8_lossy(&stderr).into_owned()))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_run_echo() {
        let out = ProcessRunner
            .run(&Invocation::new(["/bin/echo", "hello", "world"]))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout_text(), "hello world\n");
        assert_eq!(out.stderr, "");
    }

    #[tokio::test]
    async fn test_run_with_stdin() {
        let out = ProcessRunner
            .run(&Invocation::new(["/bin/cat"]).stdin("piped in"))
            .await
            .unwrap();
        assert_eq!(out.stdout, b"piped in");
    }

    #[tokio::test]
    async fn test_run_stdin_larger_than_pipe_buffer() {
        let data = vec![b'x'; 4 << 20];
        let out = tokio::time::timeout(
            Duration::from_secs(30),
            ProcessRunner.run(&Invocation::new(["/bin/cat"]).stdin(data.clone())),
        )
        .await
        .expect("run finished")
        .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.len(), data.len());
    }

    #[tokio::test]
    async fn test_run_with_env() {
        let out = ProcessRunner
            .run(&Invocation::new(["/usr/bin/env"]).envs([("HADOOPFS_TEST_VAR", "v1")]))
            .await
            .unwrap();
        assert!(out.stdout_text().contains("HADOOPFS_TEST_VAR=v1"));
    }

    #[tokio::test]
    async fn test_nonzero_status_is_not_an_error() {
        let out = ProcessRunner
            .run(&Invocation::new(["/bin/sh", "-c", "echo oops >&2; exit 3"]))
            .await
            .unwrap();
        assert_eq!(out.status, 3);
        assert_eq!(out.stderr, "oops\n");
    }

    #[tokio::test]
    async fn test_large_output_is_captured() {
        let out = ProcessRunner
            .run(&Invocation::new([
                "/bin/sh",
                "-c",
                "i=0; while [ $i -lt 20000 ]; do echo line-$i; i=$((i+1)); done",
            ]))
            .await
            .unwrap();
        assert_eq!(out.stdout_text().lines().count(), 20000);
    }

    #[tokio::test]
    async fn test_missing_executable_is_unavailable() {
        let err = ProcessRunner
            .run(&Invocation::new(["/nonexistent/hadoop", "fs", "-ls"]))
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::BackendUnavailable { .. }));

        let err = ProcessRunner
            .spawn(&Invocation::new(["/nonexistent/hadoop", "fs", "-ls"]))
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::BackendUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_empty_argv_is_unavailable() {
        let err = ProcessRunner.run(&Invocation::default()).await.unwrap_err();
        assert!(matches!(err, FsError::BackendUnavailable { .. }));
        let err = ProcessRunner.spawn(&Invocation::default()).await.unwrap_err();
        assert!(matches!(err, FsError::BackendUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_spawn_output_arrives_before_exit() {
        let started = Instant::now();
        let mut running = ProcessRunner
            .spawn(&Invocation::new(["/bin/sh", "-c", "printf 'first\\n'; exec sleep 5"]))
            .await
            .unwrap();
        running.prime().unwrap();

        let mut buf = [0u8; 64];
        let n = running.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"first\n");
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(running);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_spawn_failure_surfaces_at_end_of_output() {
        let mut running = ProcessRunner
            .spawn(&Invocation::new([
                "/bin/sh",
                "-c",
                "printf 'partial\\n'; echo 'went wrong' >&2; exit 3",
            ]))
            .await
            .unwrap();
        running.prime().unwrap();

        let mut out = Vec::new();
        let err = FsError::from(running.read_to_end(&mut out).unwrap_err());
        assert_eq!(out, b"partial\n");
        match err {
            FsError::BackendCommand { status, stderr, .. } => {
                assert_eq!(status, 3);
                assert_eq!(stderr, "went wrong\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_spawn_silent_failure_fails_on_prime() {
        let mut running = ProcessRunner
            .spawn(&Invocation::new([
                "/bin/sh",
                "-c",
                "echo 'cat: hdfs:///x: No such file or directory' >&2; exit 1",
                "hadoop",
                "hdfs:///x",
            ]))
            .await
            .unwrap();
        assert!(running.prime().unwrap_err().is_not_found());
    }

    #[test]
    fn test_captured_replays_output_then_checks_status() {
        let mut running = RunningCommand::captured(
            Invocation::new(["hadoop", "fs", "-cat", "hdfs:///x"]),
            CommandOutput {
                stdout: b"abc".to_vec(),
                stderr: String::new(),
                status: 0,
            },
        );
        let mut out = String::new();
        running.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abc");
        running.finish().unwrap();
    }
}
