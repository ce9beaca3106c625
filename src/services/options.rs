//! Keyed platform options (vote dates and similar settings)
//!
//! Options live in a JSON file holding an array of `{"key", "value"}`
//! pairs, by default `~/.votetrack/options.json`. Reads take a shared
//! lock. A write holds an exclusive lock on `options.json.lock` for the
//! whole read-modify-write and lands through a temp file and an atomic
//! rename.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use fs2::FileExt;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{
    OptionsWarning, Result, VotetrackError, VotingWindow, VOTE_DEADLINE, VOTE_LAUNCH,
};

static VALID_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-z0-9-]+$").expect("valid regex"));

/// Read access to keyed option values
pub trait OptionsStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Value of `key`, or a config error naming the missing key
    fn require(&self, key: &str) -> Result<String> {
        self.get(key)?
            .ok_or_else(|| VotetrackError::Config(format!("option '{}' is not set", key)))
    }

    /// [`require`](Self::require) for a user-typed key, normalized the
    /// same way keys are when they are set
    fn lookup(&self, raw_key: &str) -> Result<String> {
        self.require(&sanitize_key(raw_key)?)
    }
}

impl OptionsStore for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(BTreeMap::get(self, key).cloned())
    }
}

/// Resolve the voting window from `vote-launch` and `vote-deadline`
pub fn voting_window(options: &dyn OptionsStore) -> Result<VotingWindow> {
    let launch = options.require(VOTE_LAUNCH)?;
    let deadline = options.require(VOTE_DEADLINE)?;
    VotingWindow::parse(&launch, &deadline)
}

/// Normalize an option key: trimmed, lowercase, `[a-z0-9-]` only
pub fn sanitize_key(raw: &str) -> Result<String> {
    let key = raw.trim().to_lowercase();
    if VALID_KEY.is_match(&key) {
        Ok(key)
    } else {
        Err(VotetrackError::Config(format!(
            "invalid option key '{}': may only contain letters, numbers, and dashes",
            raw
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub key: String,
    pub value: String,
}

/// Options backed by a JSON file
pub struct FileOptionsStore {
    path: PathBuf,
}

impl FileOptionsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries in file order, with a warning when the file is
    /// missing or unreadable as JSON
    pub fn load(&self) -> Result<(Vec<OptionEntry>, Option<OptionsWarning>)> {
        if !self.path.exists() {
            return Ok((
                Vec::new(),
                Some(OptionsWarning::Missing(format!(
                    "no options file at {}",
                    self.path.display()
                ))),
            ));
        }

        let file = File::open(&self.path)?;
        file.lock_shared()
            .map_err(|e| VotetrackError::Options(format!("Failed to acquire read lock: {}", e)))?;

        let mut content = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut content);
        let _ = file.unlock();
        read?;

        match serde_json::from_str::<Vec<OptionEntry>>(&content) {
            Ok(entries) => Ok((entries, None)),
            Err(e) => Ok((
                Vec::new(),
                Some(OptionsWarning::Corrupted(format!(
                    "Corrupted options file {}: {}",
                    self.path.display(),
                    e
                ))),
            )),
        }
    }

    /// Set `key` to `value`, creating the entry if needed
    pub fn set(&self, key: &str, value: &str) -> Result<OptionEntry> {
        let key = sanitize_key(key)?;
        let value = value.trim().to_string();

        let _lock = self.lock_for_write()?;

        let (mut entries, warning) = self.load()?;
        if let Some(OptionsWarning::Corrupted(msg)) = warning {
            return Err(VotetrackError::Config(msg));
        }

        match entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value.clone(),
            None => entries.push(OptionEntry {
                key: key.clone(),
                value: value.clone(),
            }),
        }

        self.save(&entries)?;
        tracing::info!(key = %key, "option updated");

        Ok(OptionEntry { key, value })
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Exclusive writer lock, released when the returned handle drops
    fn lock_for_write(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(|e| VotetrackError::Options(format!("Failed to open lock file: {}", e)))?;
        lock.lock_exclusive()
            .map_err(|e| VotetrackError::Options(format!("Failed to acquire write lock: {}", e)))?;
        Ok(lock)
    }

    /// Atomic write (temp file + rename). Callers hold the writer lock.
    fn save(&self, entries: &[OptionEntry]) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| VotetrackError::Parse(format!("Serialization failed: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&temp_path).map_err(|e| {
                VotetrackError::Options(format!("Failed to create temp file: {}", e))
            })?;
            file.write_all(content.as_bytes()).map_err(|e| {
                VotetrackError::Options(format!("Failed to write temp file: {}", e))
            })?;
            file.sync_all().map_err(|e| {
                VotetrackError::Options(format!("Failed to sync temp file: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| VotetrackError::Options(format!("Failed to rename temp file: {}", e)))?;
        Ok(())
    }
}

impl OptionsStore for FileOptionsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let (entries, warning) = self.load()?;
        if let Some(OptionsWarning::Corrupted(msg)) = warning {
            return Err(VotetrackError::Config(msg));
        }
        Ok(entries.into_iter().find(|e| e.key == key).map(|e| e.value))
    }
}
