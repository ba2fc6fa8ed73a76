//! Configuration for the hadoop backend.
//!
//! Loaded from a TOML file or from the environment:
//!
//! ```toml
//! hadoop_bin = ["/opt/hadoop/bin/hadoop"]
//! schemes = ["hdfs", "viewfs"]
//!
//! [env]
//! HADOOP_USER_NAME = "etl"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{FsError, FsResult};

/// Settings for [`HadoopFs`](crate::vfs::HadoopFs).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HadoopConfig {
    /// Command prefix for the client, e.g. `["hadoop"]`.
    pub hadoop_bin: Vec<String>,
    /// URI schemes routed to the hadoop backend.
    pub schemes: Vec<String>,
    /// Extra environment for every invocation.
    pub env: BTreeMap<String, String>,
}

impl Default for HadoopConfig {
    fn default() -> Self {
        Self {
            hadoop_bin: vec!["hadoop".to_string()],
            schemes: vec!["hdfs".to_string()],
            env: BTreeMap::new(),
        }
    }
}

impl HadoopConfig {
    /// Config from the process environment.
    ///
    /// `HADOOP_BIN` (split on whitespace) wins, then `$HADOOP_HOME/bin/hadoop`,
    /// then plain `hadoop` on `$PATH`.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(bin) = lookup("HADOOP_BIN").filter(|b| !b.trim().is_empty()) {
            config.hadoop_bin = bin.split_whitespace().map(String::from).collect();
        } else if let Some(home) = lookup("HADOOP_HOME").filter(|h| !h.is_empty()) {
            let bin: PathBuf = [home.as_str(), "bin", "hadoop"].iter().collect();
            config.hadoop_bin = vec![bin.to_string_lossy().into_owned()];
        }
        config
    }

    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> FsResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| FsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> FsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| FsError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> FsResult<()> {
        if self.hadoop_bin.is_empty() || self.hadoop_bin[0].is_empty() {
            return Err(FsError::Config("hadoop_bin must name a program".into()));
        }
        if self.schemes.is_empty() {
            return Err(FsError::Config("schemes must not be empty".into()));
        }
        Ok(())
    }
}
