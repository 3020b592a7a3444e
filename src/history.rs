// src/history.rs
//! Send-once ledger of published identifiers, persisted as a JSON array.
//!
//! The file is the single source of truth. It is rewritten in full on every save
//! (temp file + rename) and never appended to.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub const DEFAULT_HISTORY_PATH: &str = "sent_news.json";
pub const DEFAULT_HISTORY_CAP: usize = 50;

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    cap: usize,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cap: DEFAULT_HISTORY_CAP,
        }
    }

    /// Clamped to `1..=DEFAULT_HISTORY_CAP`; the file never holds more than 50 entries.
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap.clamp(1, DEFAULT_HISTORY_CAP);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Missing file → empty. Unreadable or invalid content → empty plus a warning.
    pub fn load(&self) -> Vec<String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "history unreadable, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => retain_recent(&ids, self.cap),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "history is not a JSON string array, starting empty");
                Vec::new()
            }
        }
    }

    /// Dedupe, keep the most recent `cap` entries and atomically rewrite the file.
    pub fn save(&self, identifiers: &[String]) -> io::Result<()> {
        let kept = retain_recent(identifiers, self.cap);
        let json = serde_json::to_string_pretty(&kept)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = tmp_path(&self.path);
        let written = write_synced(&tmp, json.as_bytes()).and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            // never leave a half-written temp file behind
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        debug!(path = %self.path.display(), entries = kept.len(), "history saved");
        Ok(())
    }

    /// load → append if absent → save. Recording the same identifier twice is a no-op.
    pub fn record_published(&self, identifier: &str) -> io::Result<()> {
        let mut ids = self.load();
        if !ids.iter().any(|id| id == identifier) {
            ids.push(identifier.to_string());
        }
        self.save(&ids)
    }
}

/// Drop repeated identifiers (first occurrence wins) and keep the last `cap` entries.
pub fn retain_recent(identifiers: &[String], cap: usize) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(identifiers.len());
    let mut out: Vec<String> = identifiers
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect();
    if out.len() > cap {
        let excess = out.len() - cap;
        out.drain(0..excess);
    }
    out
}

fn write_synced(path: &Path, json: &[u8]) -> io::Result<()> {
    let mut f = fs::File::create(path)?;
    f.write_all(json)?;
    f.write_all(b"\n")?;
    f.sync_all()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "history".into());
    name.push(".tmp");
    path.with_file_name(name)
}
