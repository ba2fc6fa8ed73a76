//! A fake `hadoop` client that serves `fs` subcommands from a local directory.
//!
//! The cluster lives under `$MOCK_HDFS_ROOT`: `hdfs:///foo/bar` is
//! `$MOCK_HDFS_ROOT/foo/bar`, and relative paths resolve under
//! `/user/$USER`. Output mimics the real client closely enough for
//! [`hadoopfs_core::parse`] to read it back.
//!
//! Exit statuses follow the real client: 0 on success, 1 when an operation
//! fails, 255 for usage errors and unknown commands.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use hadoopfs_core::uri::{self, Uri};

/// Cluster root directory.
pub const ENV_HDFS_ROOT: &str = "MOCK_HDFS_ROOT";
/// Job output root. Not read by `fs` subcommands.
pub const ENV_HADOOP_OUTPUT: &str = "MOCK_HADOOP_OUTPUT";
/// Owner shown in listings and home of relative paths.
pub const ENV_USER: &str = "USER";

const EXIT_OK: i32 = 0;
const EXIT_FAILED: i32 = 1;
const EXIT_USAGE: i32 = 255;

/// Run the mock client.
///
/// `argv[0]` is the program name and is ignored. Everything the real
/// client would print goes to `stdout`/`stderr`; the return value is the
/// exit status. An `Err` means the local filesystem misbehaved in a way
/// the real client has no message for.
pub fn main(
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    argv: &[String],
    env: &BTreeMap<String, String>,
) -> io::Result<i32> {
    let args: Vec<&str> = argv.iter().skip(1).map(String::as_str).collect();

    let Some((&command, rest)) = args.split_first() else {
        writeln!(stderr, "Usage: hadoop [--config confdir] COMMAND")?;
        return Ok(EXIT_USAGE);
    };
    if command != "fs" {
        writeln!(stderr, "{}: Unknown command", command)?;
        return Ok(EXIT_USAGE);
    }

    let Some(root) = env.get(ENV_HDFS_ROOT) else {
        writeln!(stderr, "{} is not set", ENV_HDFS_ROOT)?;
        return Ok(EXIT_USAGE);
    };
    let cluster = Cluster {
        root: PathBuf::from(root),
        user: env.get(ENV_USER).cloned().unwrap_or_else(|| "hadoop".to_string()),
        out: stdout,
        err: stderr,
    };
    cluster.dispatch(rest)
}

/// One run of the client against one cluster root.
struct Cluster<'a> {
    root: PathBuf,
    user: String,
    out: &'a mut dyn Write,
    err: &'a mut dyn Write,
}

/// Flags and operands of a subcommand.
struct Args<'a> {
    flags: Vec<&'a str>,
    paths: Vec<&'a str>,
}

impl<'a> Args<'a> {
    fn split(args: &[&'a str]) -> Self {
        let (flags, paths) = args
            .iter()
            .copied()
            .partition(|a| a.starts_with('-') && a.len() > 1);
        Self { flags, paths }
    }

    fn has(&self, flag: &str) -> bool {
        self.flags.contains(&flag)
    }
}

impl Cluster<'_> {
    fn dispatch(mut self, args: &[&str]) -> io::Result<i32> {
        let Some((&command, rest)) = args.split_first() else {
            writeln!(self.err, "Usage: hadoop fs [generic options]")?;
            return Ok(EXIT_USAGE);
        };
        let args = Args::split(rest);

        match command {
            "-ls" => self.ls(&args, args.has("-R")),
            "-lsr" => self.ls(&args, true),
            "-cat" => self.cat(&args),
            "-du" => self.du(&args, args.has("-s")),
            "-dus" => self.du(&args, true),
            "-mkdir" => self.mkdir(&args),
            "-rm" => self.rm(&args, args.has("-r") || args.has("-R")),
            "-rmr" => self.rm(&args, true),
            "-touchz" => self.touchz(&args),
            "-test" => self.test(&args),
            other => {
                writeln!(self.err, "{}: Unknown command", other)?;
                Ok(EXIT_USAGE)
            }
        }
    }

    /// Local path for an `hdfs://` URI or bare cluster path.
    fn real_path(&self, arg: &str) -> PathBuf {
        let path = if uri::is_uri(arg) {
            Uri::parse(arg).map(|u| u.path).unwrap_or_default()
        } else {
            arg.to_string()
        };
        let path = if path.is_empty() {
            "/".to_string()
        } else if path.starts_with('/') {
            path
        } else {
            format!("/user/{}/{}", self.user, path)
        };
        self.root.join(path.trim_start_matches('/'))
    }

    /// Cluster path (`/a/b`) for a local path under the root.
    fn cluster_path(&self, real: &Path) -> String {
        let rel = real.strip_prefix(&self.root).unwrap_or(real);
        format!("/{}", rel.to_string_lossy()).replace("//", "/")
    }

    /// Expand `arg` to existing local paths, sorted. Empty means no match.
    fn expand(&self, arg: &str) -> Vec<PathBuf> {
        let real = self.real_path(arg);
        let rel = real.strip_prefix(&self.root).unwrap_or(&real).to_string_lossy();
        if !rel.contains(['*', '?', '[']) {
            return if real.exists() { vec![real] } else { Vec::new() };
        }

        let pattern = format!(
            "{}/{}",
            glob::Pattern::escape(&self.root.to_string_lossy()),
            rel
        );
        let mut matches: Vec<PathBuf> = match glob::glob(&pattern) {
            Ok(paths) => paths.filter_map(Result::ok).collect(),
            Err(_) => Vec::new(),
        };
        matches.sort();
        matches
    }

    fn missing(&mut self, command: &str, arg: &str) -> io::Result<()> {
        writeln!(self.err, "{}: `{}': No such file or directory", command, arg)
    }

    fn ls(&mut self, args: &Args<'_>, recursive: bool) -> io::Result<i32> {
        let home = format!("/user/{}", self.user);
        let paths = if args.paths.is_empty() {
            vec![home.as_str()]
        } else {
            args.paths.clone()
        };

        let mut status = EXIT_OK;
        for arg in paths {
            let matches = self.expand(arg);
            if matches.is_empty() {
                self.missing("ls", arg)?;
                status = EXIT_FAILED;
                continue;
            }
            for path in matches {
                if path.is_dir() {
                    if !recursive {
                        let count = fs::read_dir(&path)?.count();
                        if count > 0 {
                            writeln!(self.out, "Found {} items", count)?;
                        }
                    }
                    self.ls_dir(&path, recursive)?;
                } else {
                    self.ls_line(&path)?;
                }
            }
        }
        Ok(status)
    }

    /// Files of `dir` first, then each subdirectory followed by its
    /// contents when recursive. `dir` itself is not printed.
    fn ls_dir(&mut self, dir: &Path, recursive: bool) -> io::Result<()> {
        let (files, subdirs) = children(dir)?;
        for file in &files {
            self.ls_line(file)?;
        }
        for subdir in &subdirs {
            self.ls_line(subdir)?;
            if recursive {
                self.ls_dir(subdir, true)?;
            }
        }
        Ok(())
    }

    fn ls_line(&mut self, path: &Path) -> io::Result<()> {
        let meta = fs::metadata(path)?;
        let (mode, replication, size) = if meta.is_dir() {
            ("drwxr-xr-x", "-", 0)
        } else {
            ("-rwxr-xr-x", "1", meta.len())
        };
        let mtime: DateTime<Local> = meta.modified()?.into();
        writeln!(
            self.out,
            "{}   {} {} supergroup {:>10} {} {}",
            mode,
            replication,
            self.user,
            size,
            mtime.format("%Y-%m-%d %H:%M"),
            self.cluster_path(path)
        )
    }

    fn cat(&mut self, args: &Args<'_>) -> io::Result<i32> {
        let mut status = EXIT_OK;
        for &arg in &args.paths {
            let matches = self.expand(arg);
            if matches.is_empty() {
                self.missing("cat", arg)?;
                status = EXIT_FAILED;
                continue;
            }
            for path in matches {
                if path.is_dir() {
                    writeln!(self.err, "cat: `{}': Is a directory", arg)?;
                    status = EXIT_FAILED;
                } else {
                    self.out.write_all(&fs::read(&path)?)?;
                }
            }
        }
        Ok(status)
    }

    fn du(&mut self, args: &Args<'_>, summary: bool) -> io::Result<i32> {
        let mut status = EXIT_OK;
        for &arg in &args.paths {
            let matches = self.expand(arg);
            if matches.is_empty() {
                self.missing("du", arg)?;
                status = EXIT_FAILED;
                continue;
            }
            for path in matches {
                if summary || !path.is_dir() {
                    self.du_line(&path)?;
                } else {
                    let (files, subdirs) = children(&path)?;
                    for child in files.iter().chain(&subdirs) {
                        self.du_line(child)?;
                    }
                }
            }
        }
        Ok(status)
    }

    fn du_line(&mut self, path: &Path) -> io::Result<()> {
        let size = usage(path)?;
        writeln!(self.out, "{}\t{}", size, self.cluster_path(path))
    }

    fn mkdir(&mut self, args: &Args<'_>) -> io::Result<i32> {
        let parents = args.has("-p");
        let mut status = EXIT_OK;
        for &arg in &args.paths {
            let path = self.real_path(arg);
            let blocked = path.ancestors().skip(1).any(|p| p.exists() && !p.is_dir());
            if blocked || (parents && path.exists() && !path.is_dir()) {
                writeln!(self.err, "mkdir: `{}': Is not a directory", arg)?;
                status = EXIT_FAILED;
            } else if path.exists() {
                if !parents {
                    writeln!(self.err, "mkdir: `{}': File exists", arg)?;
                    status = EXIT_FAILED;
                }
            } else if parents {
                fs::create_dir_all(&path)?;
            } else if path.parent().is_some_and(Path::is_dir) {
                fs::create_dir(&path)?;
            } else {
                self.missing("mkdir", arg)?;
                status = EXIT_FAILED;
            }
        }
        Ok(status)
    }

    fn rm(&mut self, args: &Args<'_>, recursive: bool) -> io::Result<i32> {
        let force = args.has("-f");
        let mut status = EXIT_OK;
        for &arg in &args.paths {
            let matches = self.expand(arg);
            if matches.is_empty() {
                if !force {
                    self.missing("rm", arg)?;
                    status = EXIT_FAILED;
                }
                continue;
            }
            for path in matches {
                if path.is_dir() {
                    if !recursive {
                        writeln!(self.err, "rm: `{}': Is a directory", arg)?;
                        status = EXIT_FAILED;
                        continue;
                    }
                    fs::remove_dir_all(&path)?;
                } else {
                    fs::remove_file(&path)?;
                }
                writeln!(self.out, "Deleted {}", self.cluster_path(&path))?;
            }
        }
        Ok(status)
    }

    /// Create an empty file, or bump the mtime of an existing one.
    fn touchz(&mut self, args: &Args<'_>) -> io::Result<i32> {
        let mut status = EXIT_OK;
        for &arg in &args.paths {
            let path = self.real_path(arg);
            if path.is_dir() {
                writeln!(self.err, "touchz: `{}': Is a directory", arg)?;
                status = EXIT_FAILED;
            } else if !path.parent().is_some_and(Path::is_dir) {
                self.missing("touchz", arg)?;
                status = EXIT_FAILED;
            } else {
                let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
                file.set_modified(SystemTime::now())?;
            }
        }
        Ok(status)
    }

    fn test(&mut self, args: &Args<'_>) -> io::Result<i32> {
        let ([flag], [arg]) = (args.flags.as_slice(), args.paths.as_slice()) else {
            writeln!(self.err, "-test: Usage: hadoop fs [generic options] -test -[defz] <path>")?;
            return Ok(EXIT_USAGE);
        };
        let path = self.real_path(arg);
        let passed = match *flag {
            "-e" => path.exists(),
            "-d" => path.is_dir(),
            "-f" => path.is_file(),
            "-z" => path.is_file() && fs::metadata(&path)?.len() == 0,
            other => {
                writeln!(self.err, "-test: Illegal option {}", other)?;
                return Ok(EXIT_USAGE);
            }
        };
        Ok(if passed { EXIT_OK } else { EXIT_FAILED })
    }
}

/// Sorted (files, subdirectories) of `dir`.
fn children(dir: &Path) -> io::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            subdirs.push(path);
        } else {
            files.push(path);
        }
    }
    files.sort();
    subdirs.sort();
    Ok((files, subdirs))
}

/// Total bytes of the files at or under `path`.
fn usage(path: &Path) -> io::Result<u64> {
    if !path.is_dir() {
        return Ok(fs::metadata(path)?.len());
    }
    let (files, subdirs) = children(path)?;
    let mut total = 0;
    for child in files.iter().chain(&subdirs) {
        total += usage(child)?;
    }
    Ok(total)
}
