//! hfs: one command line for local paths and `hdfs://` URIs.
//!
//! Usage:
//!   hfs ls hdfs:///logs/
//!   hfs cat hdfs:///logs/part-00000.gz ./local.txt
//!   hfs du hdfs:///logs/*
//!   hfs --config hadoop.toml mkdir hdfs:///scratch/run-1
//!
//! The `hadoop` client is found via `--hadoop-bin`, the config file,
//! `$HADOOP_BIN` or `$HADOOP_HOME/bin/hadoop`, in that order. Set
//! `RUST_LOG=hadoopfs_core=debug` to see every command that runs.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hadoopfs_core::{Filesystem, HadoopConfig, HadoopFs, LocalFs, MultiFs};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "hfs", version)]
#[command(about = "Filesystem commands over local paths and hdfs:// URIs")]
struct Args {
    /// TOML file with hadoop_bin, schemes and env
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hadoop client command, e.g. "/opt/hadoop/bin/hadoop"
    #[arg(long, global = true)]
    hadoop_bin: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List files under each URI, recursively
    Ls {
        /// Show sizes
        #[arg(short, long)]
        long: bool,
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Print file contents, decompressing .gz and .bz2
    Cat {
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Bytes used under each URI
    Du {
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Create directories, with parents
    Mkdir {
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Remove files or directory trees
    Rm {
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Create empty files or bump their mtime
    Touchz {
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Exit 0 if the URI exists, 1 if not
    Test { uri: String },
}

fn load_config(args: &Args) -> Result<HadoopConfig> {
    let mut config = match &args.config {
        Some(path) => HadoopConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => HadoopConfig::from_env(),
    };
    if let Some(bin) = &args.hadoop_bin {
        config.hadoop_bin = bin.split_whitespace().map(String::from).collect();
    }
    Ok(config)
}

async fn run(fs: &MultiFs, command: Command) -> Result<ExitCode> {
    let mut out = BufWriter::new(io::stdout().lock());

    match command {
        Command::Ls { long, uris } => {
            for uri in &uris {
                for entry in fs.list(uri).await.with_context(|| format!("ls {}", uri))? {
                    let entry = entry?;
                    match (long, entry.size) {
                        (true, Some(size)) => writeln!(out, "{:>12} {}", size, entry.uri)?,
                        _ => writeln!(out, "{}", entry.uri)?,
                    }
                }
            }
        }
        Command::Cat { uris } => {
            for uri in &uris {
                for line in fs.cat(uri).await.with_context(|| format!("cat {}", uri))? {
                    out.write_all(&line?)?;
                }
            }
        }
        Command::Du { uris } => {
            for uri in &uris {
                let bytes = fs
                    .disk_usage(uri)
                    .await
                    .with_context(|| format!("du {}", uri))?;
                writeln!(out, "{}\t{}", bytes, uri)?;
            }
        }
        Command::Mkdir { uris } => {
            for uri in &uris {
                fs.make_directory(uri)
                    .await
                    .with_context(|| format!("mkdir {}", uri))?;
            }
        }
        Command::Rm { uris } => {
            for uri in &uris {
                fs.remove(uri).await.with_context(|| format!("rm {}", uri))?;
            }
        }
        Command::Touchz { uris } => {
            for uri in &uris {
                fs.touch(uri).await.with_context(|| format!("touchz {}", uri))?;
            }
        }
        Command::Test { uri } => {
            let found = fs.exists(&uri).await.with_context(|| format!("test {}", uri))?;
            return Ok(if found {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
    }

    out.flush()?;
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    tracing::debug!(?config, "loaded config");

    let fs = MultiFs::new()
        .with(LocalFs::new())
        .with(HadoopFs::from_config(&config));

    run(&fs, args.command).await
}
