//! File-backed history log.

use super::rollup;
use super::models::HistoryEntry;
use crate::coordinator::RoundSummary;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// History persistence error types.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The persisted rolling log, stored as one JSON array.
///
/// Reads never fail: a missing or corrupt file is an empty log. Writes
/// replace the whole file through a rename.
#[derive(Clone)]
pub struct HistoryStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Arc<Mutex<()>>,
}

impl HistoryStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the log, treating any read or parse failure as empty.
    pub fn load(&self) -> Vec<HistoryEntry> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Could not read history {}: {}", self.path.display(), e);
                }
                return Vec::new();
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Discarding unreadable history {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Replace the persisted log with `entries`.
    pub fn save(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        let data = serde_json::to_vec(entries)?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "history".into());
        tmp_name.push(format!(".tmp-{:08x}", rand::random::<u32>()));
        let tmp_path = self.path.with_file_name(tmp_name);

        fs::write(&tmp_path, &data)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    /// Append `round` to the persisted log and return the new log.
    pub fn append_round(&self, round: &RoundSummary) -> Result<Vec<HistoryEntry>, HistoryError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut log = self.load();
        rollup::append(&mut log, round);
        self.save(&log)?;
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MAX_HISTORY_ENTRIES;
    use crate::probe::ProbeResult;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn round(url: &str) -> RoundSummary {
        RoundSummary::from_results(vec![ProbeResult {
            display_name: None,
            endpoint_base: url.to_string(),
            succeeded: true,
            status_code: 200,
            elapsed_ms: 10,
            payload_verified: true,
            error_message: None,
        }])
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{definitely not a log").unwrap();

        let store = HistoryStore::new(&path);
        assert!(store.load().is_empty());

        // A corrupt log is overwritten on the next append.
        let log = assert_ok!(store.append_round(&round("https://a.test")));
        assert_eq!(log.len(), 1);
        assert_eq!(store.load(), log);
    }

    #[test]
    fn test_append_persists_in_order() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        for url in ["https://a.test", "https://b.test", "https://c.test"] {
            assert_ok!(store.append_round(&round(url)));
        }

        let log = store.load();
        let urls: Vec<_> = log.iter().map(|e| e.results[0].endpoint_base.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test", "https://b.test", "https://c.test"]);
        assert!(log.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_append_caps_persisted_log() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        for i in 0..105 {
            assert_ok!(store.append_round(&round(&format!("https://{}.test", i))));
        }

        let log = store.load();
        assert_eq!(log.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(log[0].results[0].endpoint_base, "https://5.test");
        assert_eq!(log[99].results[0].endpoint_base, "https://104.test");

        // No temporary files are left behind.
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("nope").join("history.json"));
        assert!(matches!(store.save(&[]), Err(HistoryError::Io(_))));
        assert!(store.load().is_empty());
    }
}
