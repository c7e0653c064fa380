use crate::types::{RunRecord, RunSummary};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed run store - persistence for completed RunRecords
/// Defines the naming scheme as well as the operations so the API and CLI
/// never drift on where a run lives on disk.

pub const RUN_FILE_PREFIX: &str = "run_";
pub const RUN_FILE_SUFFIX: &str = ".json";

/// Deterministic file name for a run id.
pub fn run_file_name(run_id: &str) -> String {
    format!("{}{}{}", RUN_FILE_PREFIX, run_id, RUN_FILE_SUFFIX)
}

/// Inverse of `run_file_name`; `None` for files that are not run records.
pub fn run_id_from_file_name(name: &str) -> Option<&str> {
    name.strip_prefix(RUN_FILE_PREFIX)?.strip_suffix(RUN_FILE_SUFFIX)
}

#[derive(Debug, Clone)]
pub struct RunStore {
    runs_dir: PathBuf,
}

impl RunStore {
    /// Open a store rooted at `runs_dir`, creating the directory if needed.
    pub fn new(runs_dir: impl Into<PathBuf>) -> Result<Self> {
        let runs_dir = runs_dir.into();
        fs::create_dir_all(&runs_dir).with_context(|| {
            format!("Failed to create runs directory '{}'", runs_dir.display())
        })?;
        Ok(Self { runs_dir })
    }

    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }

    /// Persist a record as pretty JSON. Run ids are unique per record and
    /// each save is a single whole-file write, so concurrent runs never
    /// interleave inside one file.
    pub fn save(&self, record: &RunRecord) -> Result<PathBuf> {
        let path = self.runs_dir.join(run_file_name(&record.run_id));
        let payload = serde_json::to_string_pretty(record)
            .context("Failed to serialize run record")?;
        fs::write(&path, payload)
            .with_context(|| format!("Failed to write run record '{}'", path.display()))?;
        Ok(path)
    }

    pub fn load(&self, run_id: &str) -> Result<RunRecord> {
        let path = self.runs_dir.join(run_file_name(run_id));
        if !path.exists() {
            bail!("Run {} not found", run_id);
        }
        let payload = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read run record '{}'", path.display()))?;
        serde_json::from_str(&payload)
            .with_context(|| format!("Failed to parse run record '{}'", path.display()))
    }

    /// All stored run ids, most recent first.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.runs_dir).with_context(|| {
            format!("Failed to list runs directory '{}'", self.runs_dir.display())
        })? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(run_id_from_file_name) {
                ids.push(id.to_string());
            }
        }
        // run ids lead with a millisecond timestamp, so descending
        // lexicographic order is newest-first
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// Summaries of the most recent `limit` runs. Files that fail to load
    /// or parse are skipped rather than failing the whole listing.
    pub fn summaries(&self, limit: usize) -> Result<Vec<RunSummary>> {
        let mut summaries = Vec::new();
        for id in self.list()?.into_iter().take(limit) {
            match self.load(&id) {
                Ok(record) => summaries.push(RunSummary::of(&record)),
                Err(_) => continue,
            }
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrajectoryEntry;

    fn make_record(run_id: &str, problem: &str) -> RunRecord {
        let mut record = RunRecord::fatal(problem, "def solve(): pass", "unused", Vec::new());
        record.run_id = run_id.to_string();
        record.fatal_error = None;
        record
    }

    #[test]
    fn test_file_name_round_trip() {
        let name = run_file_name("1700000000000-ab12");
        assert_eq!(name, "run_1700000000000-ab12.json");
        assert_eq!(run_id_from_file_name(&name), Some("1700000000000-ab12"));
        assert_eq!(run_id_from_file_name("notes.txt"), None);
        assert_eq!(run_id_from_file_name("run_x.yaml"), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();

        let mut record = make_record("100-aaaa", "reverse a string");
        record.generation_trajectory.push(TrajectoryEntry::new("generated", "def solve(s): return s[::-1]"));
        store.save(&record).unwrap();

        let loaded = store.load("100-aaaa").unwrap();
        assert_eq!(loaded.run_id, record.run_id);
        assert_eq!(loaded.problem_text, "reverse a string");
        assert_eq!(loaded.generation_trajectory.len(), 1);
        assert_eq!(loaded.generation_trajectory[0].label, "generated");
    }

    #[test]
    fn test_load_missing_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();
        let err = store.load("does-not-exist").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_list_orders_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();

        store.save(&make_record("100-aaaa", "first")).unwrap();
        store.save(&make_record("300-cccc", "third")).unwrap();
        store.save(&make_record("200-bbbb", "second")).unwrap();

        let ids = store.list().unwrap();
        assert_eq!(ids, vec!["300-cccc", "200-bbbb", "100-aaaa"]);
    }

    #[test]
    fn test_summaries_skip_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();

        store.save(&make_record("200-bbbb", "good run")).unwrap();
        std::fs::write(dir.path().join("run_300-cccc.json"), "{ not json").unwrap();

        let summaries = store.summaries(10).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].run_id, "200-bbbb");
        assert_eq!(summaries[0].problem_preview, "good run");
    }

    #[test]
    fn test_summaries_respect_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();
        for i in 0..5 {
            store.save(&make_record(&format!("{}00-aaaa", i), "p")).unwrap();
        }
        assert_eq!(store.summaries(3).unwrap().len(), 3);
    }
}
