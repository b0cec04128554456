pub mod archive;
pub mod ledger;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::identity::Normalizer;
use crate::model::{Identity, ScoredCandidate};

use ledger::SeenLedger;

/// The two JSON files that survive between runs: the seen-ledger and the
/// curated archive. Both are read once at start and written once at the end.
pub struct JsonStore {
    dir: PathBuf,
    ledger_path: PathBuf,
    archive_path: PathBuf,
    max_history_size: usize,
}

impl JsonStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            dir: config.data_dir.clone(),
            ledger_path: config.data_dir.join(&config.ledger_file),
            archive_path: config.data_dir.join(&config.archive_file),
            max_history_size: config.max_history_size,
        }
    }

    /// Archived records, newest first. Unreadable state counts as empty.
    pub fn load_archive(&self) -> Vec<ScoredCandidate> {
        match read_json::<Vec<ScoredCandidate>>(&self.archive_path) {
            Ok(Some(items)) => {
                debug!(path = ?self.archive_path, count = items.len(), "archive loaded");
                items
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(path = ?self.archive_path, error = %format!("{:#}", e), "archive unreadable, starting empty");
                Vec::new()
            }
        }
    }

    /// The seen-ledger, re-normalized with the current strictness so a
    /// ledger written under a looser setting still matches. With no readable
    /// ledger file, it is seeded from the archive's titles.
    pub fn load_ledger(&self, archive: &[ScoredCandidate], normalizer: &Normalizer) -> SeenLedger {
        match read_json::<Vec<Identity>>(&self.ledger_path) {
            Ok(Some(stored)) => {
                let identities: Vec<Identity> = stored
                    .iter()
                    .filter_map(|identity| normalizer.identity(identity))
                    .collect();
                debug!(path = ?self.ledger_path, count = identities.len(), "ledger loaded");
                SeenLedger::from_snapshot(identities, self.max_history_size)
            }
            Ok(None) => {
                let seeded = archive::identities(archive, normalizer);
                if !seeded.is_empty() {
                    info!(count = seeded.len(), "no ledger file, seeding from archive");
                }
                SeenLedger::from_snapshot(seeded, self.max_history_size)
            }
            Err(e) => {
                let seeded = archive::identities(archive, normalizer);
                warn!(
                    path = ?self.ledger_path,
                    error = %format!("{:#}", e),
                    seeded = seeded.len(),
                    "ledger unreadable, seeding from archive"
                );
                SeenLedger::from_snapshot(seeded, self.max_history_size)
            }
        }
    }

    pub fn save_ledger(&self, ledger: &SeenLedger) -> Result<()> {
        let snapshot: Vec<&Identity> = ledger.iter().collect();
        self.write(&self.ledger_path, &snapshot)?;
        debug!(path = ?self.ledger_path, count = snapshot.len(), "ledger saved");
        Ok(())
    }

    pub fn save_archive(&self, items: &[ScoredCandidate]) -> Result<()> {
        self.write(&self.archive_path, &items)?;
        debug!(path = ?self.archive_path, count = items.len(), "archive saved");
        Ok(())
    }

    /// Write through a temp file in the same directory and rename over the
    /// target, so a crash mid-write leaves the previous file intact.
    fn write<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data dir {:?}", self.dir))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).context("Failed to create temp file")?;
        serde_json::to_writer_pretty(&mut tmp, value).context("serialize state")?;
        tmp.flush()?;
        tmp.persist(path)
            .with_context(|| format!("Failed to replace {:?}", path))?;
        Ok(())
    }
}

/// `Ok(None)` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", path)),
    };
    let value = serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {:?}", path))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Strictness;

    fn config(dir: &Path, max_history_size: usize) -> StoreConfig {
        StoreConfig {
            data_dir: dir.to_path_buf(),
            ledger_file: "seen.json".to_string(),
            archive_file: "reports.json".to_string(),
            max_history_size,
            max_report_size: 10,
        }
    }

    fn record(title: &str) -> ScoredCandidate {
        ScoredCandidate {
            title: title.to_string(),
            url: "https://example.com".to_string(),
            source: "ArXiv".to_string(),
            date: "2024-01-01".to_string(),
            abstract_text: "abs".to_string(),
            origin: "Cornell Univ".to_string(),
            score: 7.0,
            summary: "sum".to_string(),
            fetch_date: "2024-01-02".to_string(),
            id: "20240102_0".to_string(),
        }
    }

    #[test]
    fn test_missing_files_mean_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(&config(dir.path(), 100));
        let archive = store.load_archive();
        assert!(archive.is_empty());
        let ledger = store.load_ledger(&archive, &Normalizer::default());
        assert!(ledger.is_empty());
        assert_eq!(ledger.capacity(), 100);
    }

    #[test]
    fn test_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(&config(&dir.path().join("nested"), 100));

        let mut ledger = SeenLedger::new(100);
        ledger.record_batch(vec!["a".to_string(), "b".to_string()]);
        store.save_ledger(&ledger).unwrap();
        store.save_archive(&[record("a")]).unwrap();

        let archive = store.load_archive();
        assert_eq!(archive, vec![record("a")]);
        let reloaded = store.load_ledger(&archive, &Normalizer::default());
        let ids: Vec<&str> = reloaded.iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_corrupt_files_are_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seen.json"), b"{not json").unwrap();
        std::fs::write(dir.path().join("reports.json"), b"[1, 2").unwrap();
        let store = JsonStore::new(&config(dir.path(), 100));
        let archive = store.load_archive();
        assert!(archive.is_empty());
        assert!(store.load_ledger(&archive, &Normalizer::default()).is_empty());
    }

    #[test]
    fn test_ledger_seeded_from_archive_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(&config(dir.path(), 100));
        store.save_archive(&[record(" Momentum Crashes "), record("Carry")]).unwrap();

        let archive = store.load_archive();
        let ledger = store.load_ledger(&archive, &Normalizer::new(Strictness::Trim));
        assert!(ledger.contains("Momentum Crashes"));
        assert!(ledger.contains("Carry"));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_ledger_written_under_trim_matches_under_folded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seen.json"), br#"["Factor Zoo: A Survey", "Carry"]"#).unwrap();
        let store = JsonStore::new(&config(dir.path(), 100));
        let folded = Normalizer::new(Strictness::Folded);

        let ledger = store.load_ledger(&[], &folded);
        let identity = folded.identity("Factor Zoo: A Survey").unwrap();
        assert!(ledger.contains(&identity));
        assert!(ledger.contains("carry"));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_corrupt_ledger_is_seeded_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(&config(dir.path(), 100));
        store.save_archive(&[record("Momentum Crashes")]).unwrap();
        std::fs::write(dir.path().join("seen.json"), b"{not json").unwrap();

        let archive = store.load_archive();
        let ledger = store.load_ledger(&archive, &Normalizer::default());
        assert!(ledger.contains("Momentum Crashes"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_loaded_ledger_respects_capacity() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seen.json"), br#"["a", "b", "c"]"#).unwrap();
        let store = JsonStore::new(&config(dir.path(), 2));
        let ledger = store.load_ledger(&[], &Normalizer::default());
        assert_eq!(ledger.len(), 2);
        assert!(!ledger.contains("c"));
    }
}
