//! Runtime configuration: CLI flags, then environment, then defaults

use std::path::PathBuf;

use directories::BaseDirs;

use crate::types::{Result, VotetrackError};

pub const ENV_DATA_DIR: &str = "VOTETRACK_DATA_DIR";
pub const ENV_OPTIONS: &str = "VOTETRACK_OPTIONS";
pub const ENV_LOG: &str = "VOTETRACK_LOG";

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Values given on the command line; `None` falls through to env/defaults
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub options: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Snapshot directory with the table exports
    pub data_dir: PathBuf,
    /// Options JSON file
    pub options_path: PathBuf,
    /// tracing filter directive, e.g. `info` or `votetrack=debug`
    pub log_level: String,
}

impl Config {
    /// Resolve from process environment and `~/.votetrack`
    pub fn load(overrides: Overrides) -> Result<Self> {
        let home = BaseDirs::new().map(|d| d.home_dir().to_path_buf());
        Self::resolve(overrides, |key| std::env::var(key).ok(), home)
    }

    /// Resolve with an explicit environment lookup and home directory
    pub fn resolve(
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Result<Self> {
        let base = || {
            home.as_ref()
                .map(|h| h.join(".votetrack"))
                .ok_or_else(|| VotetrackError::Config("Cannot determine home directory".into()))
        };

        let data_dir = match overrides.data_dir.or_else(|| env(ENV_DATA_DIR).map(PathBuf::from)) {
            Some(dir) => dir,
            None => base()?.join("data"),
        };

        let options_path = match overrides.options.or_else(|| env(ENV_OPTIONS).map(PathBuf::from)) {
            Some(path) => path,
            None => base()?.join("options.json"),
        };

        let log_level = overrides
            .log_level
            .or_else(|| env(ENV_LOG))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(Self {
            data_dir,
            options_path,
            log_level,
        })
    }
}
