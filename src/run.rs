use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::BotConfig;
use crate::constants::dates::CANONICAL_DATE_FORMAT;
use crate::errors::BotError;
use crate::fetch::Fetcher;
use crate::merge::{DerivedRule, KeySpec, MergeWarning, merge_timeseries};
use crate::types::FieldName;
use crate::upload::Uploader;

/// How one bot's batches are keyed, normalized, and date-stamped.
#[derive(Clone, Debug)]
pub struct RunPlan {
    key: KeySpec,
    rules: Vec<DerivedRule>,
    stamp_field: Option<FieldName>,
    utc_offset_hours: i32,
}

impl RunPlan {
    /// Build a plan from a bot's configuration.
    ///
    /// `key_fields` must name at least one field. When `date_field` is
    /// configured it is stamped onto incoming records that lack it and
    /// normalized to `YYYY-MM-DD` across the whole set on every run.
    pub fn from_config(config: &BotConfig) -> Result<Self, BotError> {
        let key = KeySpec::new(config.key_fields.clone())?;
        let stamp_field = config.date_field.clone();
        let rules = stamp_field
            .iter()
            .map(|field| DerivedRule::CanonicalDate {
                field: field.clone(),
            })
            .collect();
        Ok(Self {
            key,
            rules,
            stamp_field,
            utc_offset_hours: 0,
        })
    }

    /// Append a derived-field rule.
    pub fn with_rule(mut self, rule: DerivedRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Shift the fetch-date stamp away from UTC (e.g. `-8` for a source
    /// whose "today" is Pacific time).
    pub fn with_utc_offset(mut self, hours: i32) -> Self {
        self.utc_offset_hours = hours;
        self
    }

    /// The plan's composite key.
    pub fn key(&self) -> &KeySpec {
        &self.key
    }

    /// Today at day granularity in the plan's offset.
    pub fn fetch_date(&self) -> NaiveDate {
        let offset = FixedOffset::east_opt(self.utc_offset_hours.saturating_mul(3600))
            .unwrap_or_else(|| Utc.fix());
        Utc::now().with_timezone(&offset).date_naive()
    }
}

/// What one run did, for logs and schedulers.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Records the fetcher produced.
    pub records_fetched: usize,
    /// Records in the merged timeseries after the run.
    pub records_merged: usize,
    /// Degraded-key conditions surfaced by the merge.
    pub warnings: Vec<MergeWarning>,
    /// Remote keys written by the upload pass.
    pub uploaded_keys: Vec<String>,
    /// Upload failure, if any. Local files stay authoritative and are not
    /// rolled back; a retried run re-uploads without re-fetching.
    pub upload_error: Option<BotError>,
}

/// Execute one bot run: fetch, snapshot, merge, persist, upload.
///
/// A fetch failure aborts before any file is touched. A malformed history
/// aborts before anything is rewritten. An upload failure is reported in
/// the [`RunReport`] but does not fail the run.
pub fn run_bot(
    config: &BotConfig,
    plan: &RunPlan,
    fetcher: &dyn Fetcher,
    uploader: Option<&dyn Uploader>,
) -> Result<RunReport, BotError> {
    let mut incoming = fetcher.fetch()?;
    if let Some(field) = &plan.stamp_field {
        let stamp = plan.fetch_date().format(CANONICAL_DATE_FORMAT).to_string();
        for record in &mut incoming {
            record
                .entry(field.clone())
                .or_insert_with(|| Value::String(stamp.clone()));
        }
    }

    let store = config.store();
    let existing = store.load_history()?;
    store.write_snapshot(&incoming)?;

    let records_fetched = incoming.len();
    let outcome = merge_timeseries(existing, incoming, &plan.key, &plan.rules);
    for warning in &outcome.warnings {
        let MergeWarning::IncompleteKey { key, missing } = warning;
        warn!(?key, ?missing, "record merged under a degraded key");
    }
    store.write_timeseries(&outcome.records)?;
    info!(
        bot = %config.bot_name,
        fetched = records_fetched,
        merged = outcome.records.len(),
        "run persisted"
    );

    let mut report = RunReport {
        records_fetched,
        records_merged: outcome.records.len(),
        warnings: outcome.warnings,
        ..RunReport::default()
    };
    if let Some(uploader) = uploader {
        match uploader.upload_dir(&config.output_directory, &config.bot_name) {
            Ok(summary) => report.uploaded_keys = summary.keys,
            Err(err) => {
                warn!(error = %err, "upload failed; local files remain authoritative");
                report.upload_error = Some(err);
            }
        }
    }
    Ok(report)
}
