//! Session-scoped cache of cleaned tables.
//!
//! A session owns one dataset spec and remembers every file it has cleaned,
//! keyed by canonical path. An entry is reused only while the file's
//! modification time and length are unchanged; anything else reloads.

use crate::Result;
use crate::clean::clean_table;
use crate::spec::{DatasetSpec, ResolvedSpec};
use crate::table::{Table, load_csv};
use anyhow::Context;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// A cleaned table together with the column bindings used to clean it.
#[derive(Debug)]
pub struct Loaded {
    pub table: Table,
    pub spec: ResolvedSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> std::io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            modified: meta.modified()?,
            len: meta.len(),
        })
    }
}

#[derive(Debug)]
struct Entry {
    stamp: FileStamp,
    loaded: Arc<Loaded>,
}

pub struct Session {
    spec: DatasetSpec,
    entries: HashMap<PathBuf, Entry>,
}

impl Session {
    pub fn new(spec: DatasetSpec) -> Self {
        Self {
            spec,
            entries: HashMap::new(),
        }
    }

    pub fn spec(&self) -> &DatasetSpec {
        &self.spec
    }

    /// Return the cleaned table for `path`, loading it if needed.
    ///
    /// Any failure removes the cached entry for the path; callers must not
    /// keep rendering from a table whose source has become unreadable.
    pub fn load(&mut self, path: &Path) -> Result<Arc<Loaded>> {
        let key = match fs::canonicalize(path) {
            Ok(p) => p,
            Err(e) => {
                self.forget(path);
                return Err(e).with_context(|| format!("open {}", path.display()));
            }
        };

        match self.load_key(&key) {
            Ok(loaded) => Ok(loaded),
            Err(e) => {
                self.entries.remove(&key);
                Err(e)
            }
        }
    }

    /// True when `path` is cached and its file has not changed since.
    pub fn is_fresh(&self, path: &Path) -> bool {
        let Ok(key) = fs::canonicalize(path) else {
            return false;
        };
        match (self.entries.get(&key), FileStamp::of(&key)) {
            (Some(entry), Ok(stamp)) => entry.stamp == stamp,
            _ => false,
        }
    }

    /// Drop the cached entry for one file. Returns whether one existed.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.forget(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn forget(&mut self, path: &Path) -> bool {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.entries.remove(&key).is_some()
    }

    fn load_key(&mut self, key: &Path) -> Result<Arc<Loaded>> {
        let stamp = FileStamp::of(key).with_context(|| format!("stat {}", key.display()))?;

        if let Some(entry) = self.entries.get(key) {
            if entry.stamp == stamp {
                tracing::debug!(path = %key.display(), "session cache hit");
                return Ok(entry.loaded.clone());
            }
            tracing::info!(path = %key.display(), "source changed, reloading");
        }

        let delimiter = self.spec.delimiter()?;
        let raw = load_csv(key, delimiter)?;
        let spec = self
            .spec
            .validate_and_build(&raw.headers)
            .with_context(|| format!("resolve columns of {}", key.display()))?;
        let table = clean_table(raw, &spec.clean_spec())?;

        tracing::info!(
            path = %key.display(),
            rows = table.len(),
            value = %spec.value,
            "loaded dataset"
        );

        let loaded = Arc::new(Loaded { table, spec });
        self.entries.insert(
            key.to_path_buf(),
            Entry {
                stamp,
                loaded: loaded.clone(),
            },
        );
        Ok(loaded)
    }
}
