use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::constants::store::{STORE_EXTENSION, TIMESERIES_SUFFIX, TMP_EXTENSION};
use crate::errors::BotError;
use crate::record::{Record, records_from_value};
use crate::types::BotSlug;

/// File-backed record store for one bot.
///
/// Owns the two files under the bot's output directory: the snapshot
/// (`<slug>.json`, most recent fetch only) and the timeseries
/// (`<slug>_timeseries.json`, cumulative deduplicated history). Both are
/// rewritten in full on every run; there is no append log.
#[derive(Clone, Debug)]
pub struct RecordStore {
    dir: PathBuf,
    slug: BotSlug,
    timeseries_override: Option<PathBuf>,
}

impl RecordStore {
    /// Create a store for `slug` rooted at `dir`. Nothing is touched on
    /// disk until the first write.
    pub fn new(dir: impl Into<PathBuf>, slug: impl Into<BotSlug>) -> Self {
        Self {
            dir: dir.into(),
            slug: slug.into(),
            timeseries_override: None,
        }
    }

    /// Keep the timeseries file somewhere other than the derived
    /// `<dir>/<slug>_timeseries.json` location.
    pub fn with_timeseries_path(mut self, path: Option<PathBuf>) -> Self {
        self.timeseries_override = path;
        self
    }

    /// Path of the snapshot file (`<dir>/<slug>.json`).
    pub fn snapshot_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.slug, STORE_EXTENSION))
    }

    /// Path of the timeseries file (`<dir>/<slug>_timeseries.json` unless
    /// overridden).
    pub fn timeseries_path(&self) -> PathBuf {
        match &self.timeseries_override {
            Some(path) => path.clone(),
            None => self.dir.join(format!(
                "{}{}.{}",
                self.slug, TIMESERIES_SUFFIX, STORE_EXTENSION
            )),
        }
    }

    /// Load the persisted timeseries history.
    ///
    /// A missing file is a first run, not an error, and loads as empty. A
    /// file that exists but is not an ordered sequence of flat records is a
    /// [`BotError::MalformedHistory`]; it is never silently treated as
    /// empty, which would discard history on the next save.
    pub fn load_history(&self) -> Result<Vec<Record>, BotError> {
        let path = self.timeseries_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no prior timeseries, starting empty");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        let context = path.display().to_string();
        let value: Value =
            serde_json::from_str(&raw).map_err(|err| BotError::MalformedHistory {
                context: context.clone(),
                reason: err.to_string(),
            })?;
        records_from_value(value, &context)
    }

    /// Overwrite the snapshot file with the current run's records.
    pub fn write_snapshot(&self, records: &[Record]) -> Result<PathBuf, BotError> {
        let path = self.snapshot_path();
        self.write_records(&path, records)?;
        Ok(path)
    }

    /// Overwrite the timeseries file with the merged history.
    pub fn write_timeseries(&self, records: &[Record]) -> Result<PathBuf, BotError> {
        let path = self.timeseries_path();
        self.write_records(&path, records)?;
        Ok(path)
    }

    /// Full atomic rewrite: pretty JSON to a `.tmp` sibling, then rename,
    /// so a failed run leaves the previous file intact.
    fn write_records(&self, path: &Path, records: &[Record]) -> Result<(), BotError> {
        ensure_parent_dir(path)?;
        let payload = serde_json::to_string_pretty(records).map_err(io::Error::other)?;
        let tmp = path.with_extension(TMP_EXTENSION);
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), records = records.len(), "wrote record store file");
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), BotError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample() -> Vec<Record> {
        records_from_value(
            json!([
                {"cookie": "snickerdoodle", "fetched": "2025-08-01", "calories_total": 620},
            ]),
            "test",
        )
        .unwrap()
    }

    #[test]
    fn missing_history_loads_empty() {
        let temp = tempdir().unwrap();
        let store = RecordStore::new(temp.path().join("out"), "crumbl_menu");
        assert!(store.load_history().unwrap().is_empty());
    }

    #[test]
    fn timeseries_round_trips_and_leaves_no_tmp() {
        let temp = tempdir().unwrap();
        let store = RecordStore::new(temp.path().join("out"), "crumbl_menu");
        store.write_timeseries(&sample()).unwrap();

        let loaded = store.load_history().unwrap();
        assert_eq!(loaded, sample());
        assert!(!store.timeseries_path().with_extension(TMP_EXTENSION).exists());
    }

    #[test]
    fn corrupted_history_is_rejected_not_emptied() {
        let temp = tempdir().unwrap();
        let store = RecordStore::new(temp.path(), "crumbl_menu");
        fs::create_dir_all(temp.path()).unwrap();
        fs::write(store.timeseries_path(), "{\"not\": \"a list\"").unwrap();

        let err = store.load_history().unwrap_err();
        assert!(matches!(err, BotError::MalformedHistory { .. }));
    }

    #[test]
    fn non_list_history_is_rejected() {
        let temp = tempdir().unwrap();
        let store = RecordStore::new(temp.path(), "crumbl_menu");
        fs::write(store.timeseries_path(), "{\"rows\": []}").unwrap();

        let err = store.load_history().unwrap_err();
        assert!(matches!(err, BotError::MalformedHistory { .. }));
    }

    #[test]
    fn snapshot_is_fully_overwritten() {
        let temp = tempdir().unwrap();
        let store = RecordStore::new(temp.path(), "crumbl_menu");
        store.write_snapshot(&sample()).unwrap();
        store.write_snapshot(&[]).unwrap();

        let raw = fs::read_to_string(store.snapshot_path()).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!([]));
    }
}
