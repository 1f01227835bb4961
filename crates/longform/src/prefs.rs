#![forbid(unsafe_code)]

//! String-keyed preference storage.
//!
//! The backdrop toggle (and anything else that wants a remembered
//! setting) talks to a [`PrefStore`]. Two implementations ship here:
//! [`MemoryPrefs`] for tests and ephemeral sessions, and [`FilePrefs`],
//! which persists a versioned JSON envelope and survives corrupt or
//! missing files by starting empty.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Key/value preference storage.
pub trait PrefStore {
    /// Stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Persist `value` under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryPrefs {
    values: HashMap<String, String>,
}

impl MemoryPrefs {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrefStore for MemoryPrefs {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// On-disk format: a versioned envelope around the stored pairs.
#[derive(Debug, Serialize, Deserialize)]
struct PrefsFile {
    /// Format version for future migrations.
    format_version: u32,
    /// The stored pairs.
    values: HashMap<String, String>,
}

impl PrefsFile {
    const FORMAT_VERSION: u32 = 1;
}

/// File-backed store: one JSON file holding a versioned envelope around
/// a map of string keys to string values.
///
/// Writes go to a sibling temp file first and are moved into place with
/// a rename, so a crash mid-write never leaves a half-written store. A
/// missing or unparseable file loads as empty rather than failing, as
/// does a file written by an unknown format version.
#[derive(Debug)]
pub struct FilePrefs {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl FilePrefs {
    /// Open the store at `path`, loading whatever is readable there.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<PrefsFile>(&text) {
                Ok(file) if file.format_version == PrefsFile::FORMAT_VERSION => file.values,
                Ok(file) => {
                    tracing::warn!(
                        stored = file.format_version,
                        expected = PrefsFile::FORMAT_VERSION,
                        "preference file format version mismatch; starting empty"
                    );
                    HashMap::new()
                }
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "preference file is corrupt; starting empty"
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "preference file unreadable; starting empty"
                );
                HashMap::new()
            }
        };
        Self { path, values }
    }

    /// Where the store persists.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        let file = PrefsFile {
            format_version: PrefsFile::FORMAT_VERSION,
            values: self.values.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PrefStore for FilePrefs {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.persist()
    }
}
