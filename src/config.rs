use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::BotError;
use crate::store::RecordStore;
use crate::types::{BotSlug, FieldName, ProfileName};

/// Per-bot configuration, loaded from the bot's `config.json`.
///
/// Constructed at the top of each run and passed by parameter into the
/// fetch, merge, and upload collaborators; there is no process-global
/// configuration state.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BotConfig {
    /// Destination namespace for local and remote files.
    pub bot_name: BotSlug,
    /// Local directory receiving the snapshot and timeseries files.
    pub output_directory: PathBuf,
    /// Named AWS credential profile; ambient credentials when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_profile: Option<ProfileName>,
    /// Destination bucket override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,
    /// Source endpoint for API-backed bots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Accounts or entities the bot observes, for per-user sources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    /// Query parameters sent with the source request.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<String, String>,
    /// Fields forming the composite key of the bot's timeseries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_fields: Vec<FieldName>,
    /// Field carrying the observation/fetch date, stamped when absent and
    /// normalized to `YYYY-MM-DD` on every run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_field: Option<FieldName>,
    /// Timeseries file location override; derived from `output_directory`
    /// and `bot_name` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeseries_file: Option<PathBuf>,
    /// Source-specific keys this crate does not interpret; kept so a
    /// rewrite of the file round-trips them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BotConfig {
    /// Load the configuration from `path`.
    ///
    /// A missing file is fatal before any fetch or merge is attempted.
    pub fn load(path: &Path) -> Result<Self, BotError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(BotError::ConfigMissing {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&raw).map_err(|err| BotError::ConfigInvalid {
            context: path.display().to_string(),
            reason: err.to_string(),
        })
    }

    /// Record store rooted at this bot's output directory.
    pub fn store(&self) -> RecordStore {
        RecordStore::new(self.output_directory.clone(), self.bot_name.clone())
            .with_timeseries_path(self.timeseries_file.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn missing_config_is_fatal() {
        let temp = tempdir().unwrap();
        let err = BotConfig::load(&temp.path().join("config.json")).unwrap_err();
        assert!(matches!(err, BotError::ConfigMissing { .. }));
    }

    #[test]
    fn unparsable_config_is_invalid_not_missing() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        let err = BotConfig::load(&path).unwrap_err();
        assert!(matches!(err, BotError::ConfigInvalid { .. }));
    }

    #[test]
    fn parses_recognized_and_extra_keys() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        let payload = json!({
            "bot_name": "la_outages",
            "output_directory": "data/la_outages",
            "s3_profile": "haekeo",
            "api_url": "https://example.com/outages/query",
            "params": {"f": "json", "where": "1=1"},
            "key_fields": ["id", "fetched"],
            "date_field": "fetched",
            "archive_url": "https://stilesdata.com/la_outages/la_outages.json",
        });
        fs::write(&path, payload.to_string()).unwrap();

        let config = BotConfig::load(&path).unwrap();
        assert_eq!(config.bot_name, "la_outages");
        assert_eq!(config.params.get("f").map(String::as_str), Some("json"));
        assert_eq!(config.key_fields, vec!["id", "fetched"]);
        assert!(config.extra.contains_key("archive_url"));

        let store = config.store();
        assert!(store.timeseries_path().ends_with("la_outages_timeseries.json"));
    }

    #[test]
    fn timeseries_file_override_moves_the_history() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        let payload = json!({
            "bot_name": "tsla_stock",
            "output_directory": "data/tsla_stock",
            "key_fields": ["date"],
            "timeseries_file": "data/tsla_stock_timeseries.json",
        });
        fs::write(&path, payload.to_string()).unwrap();

        let config = BotConfig::load(&path).unwrap();
        let store = config.store();
        assert_eq!(
            store.timeseries_path(),
            PathBuf::from("data/tsla_stock_timeseries.json")
        );
        assert!(store.snapshot_path().ends_with("tsla_stock.json"));
    }
}
