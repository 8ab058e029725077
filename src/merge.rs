//! Time-series upsert merging: combine a persisted history with a freshly
//! fetched batch, keeping the latest observation per composite key.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde_json::Value;

use crate::constants::dates::{CANONICAL_DATE_FORMAT, ISO_WEEK_FORMAT};
use crate::errors::BotError;
use crate::record::{Record, key_values, scalar_to_string};
use crate::types::{DateString, FieldName, KeyValues};

/// Ordered field names whose values jointly identify one logical
/// observation across runs.
///
/// The key is always caller-supplied; nothing in the merger guesses which
/// of a source's date-like fields is "the" key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySpec {
    fields: Vec<FieldName>,
}

impl KeySpec {
    /// Build a key spec from at least one field name.
    pub fn new(fields: Vec<FieldName>) -> Result<Self, BotError> {
        if fields.is_empty() {
            return Err(BotError::ConfigInvalid {
                context: "key_fields".to_string(),
                reason: "composite key needs at least one field".to_string(),
            });
        }
        Ok(Self { fields })
    }

    /// The key's field names, in key order.
    pub fn fields(&self) -> &[FieldName] {
        &self.fields
    }
}

/// Derived/normalization rules recomputed over the entire merged set on
/// every run, so history written under an older rule is brought forward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DerivedRule {
    /// Coerce `field` to a canonical `YYYY-MM-DD` string.
    CanonicalDate {
        /// Field holding a date in any accepted representation.
        field: FieldName,
    },
    /// (Re)derive `target` as the `YYYY` year of `date_field`.
    YearFromDate {
        /// Field holding the source date.
        date_field: FieldName,
        /// Field receiving the derived year string.
        target: FieldName,
    },
    /// (Re)derive `target` as the ISO week (`YYYY-Www`) of `date_field`.
    IsoWeekFromDate {
        /// Field holding the source date.
        date_field: FieldName,
        /// Field receiving the derived week string.
        target: FieldName,
    },
}

/// Non-fatal condition surfaced by a merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeWarning {
    /// A record was merged under a degraded key because one or more key
    /// fields were absent.
    IncompleteKey {
        /// The degraded key the record merged under.
        key: KeyValues,
        /// Key fields the record was missing.
        missing: Vec<FieldName>,
    },
}

/// Result of one merge: the deduplicated records plus any warnings.
#[derive(Clone, Debug, Default)]
pub struct MergeOutcome {
    /// Deduplicated records, first-seen key order.
    pub records: Vec<Record>,
    /// Conditions the caller should surface (none are fatal).
    pub warnings: Vec<MergeWarning>,
}

/// Merge `incoming` into `existing`, keeping one record per composite key.
///
/// Append-then-last-wins: records are visited in `existing` then `incoming`
/// order, and a later record with an already-seen key replaces the earlier
/// one in place, so the first-seen relative order of keys is preserved.
/// Keys unique to `existing` survive unchanged apart from the `rules` and
/// key stringification, which are applied to every record of the combined
/// set. Either input may be empty; both empty yields an empty outcome.
///
/// Pure in-memory transformation: no I/O, no shared state between calls.
pub fn merge_timeseries(
    existing: Vec<Record>,
    incoming: Vec<Record>,
    key: &KeySpec,
    rules: &[DerivedRule],
) -> MergeOutcome {
    let mut merged: IndexMap<KeyValues, Record> =
        IndexMap::with_capacity(existing.len() + incoming.len());
    let mut warnings = Vec::new();
    for mut record in existing.into_iter().chain(incoming) {
        apply_rules(&mut record, rules);
        stringify_key_fields(&mut record, key.fields());
        let (values, missing) = key_values(&record, key.fields());
        if !missing.is_empty() {
            warnings.push(MergeWarning::IncompleteKey {
                key: values.clone(),
                missing,
            });
        }
        // IndexMap keeps the first-seen slot when the key repeats.
        merged.insert(values, record);
    }
    MergeOutcome {
        records: merged.into_values().collect(),
        warnings,
    }
}

fn apply_rules(record: &mut Record, rules: &[DerivedRule]) {
    for rule in rules {
        match rule {
            DerivedRule::CanonicalDate { field } => {
                let Some(value) = record.get(field) else {
                    continue;
                };
                match canonical_date_string(value) {
                    Some(date) => {
                        record.insert(field.clone(), Value::String(date));
                    }
                    // Unrecognized dates still leave the field a string.
                    None if !value.is_string() => {
                        let text = scalar_to_string(value);
                        record.insert(field.clone(), Value::String(text));
                    }
                    None => {}
                }
            }
            DerivedRule::YearFromDate { date_field, target } => {
                if let Some(date) = record.get(date_field).and_then(parse_date_value) {
                    record.insert(target.clone(), Value::String(date.format("%Y").to_string()));
                }
            }
            DerivedRule::IsoWeekFromDate { date_field, target } => {
                if let Some(date) = record.get(date_field).and_then(parse_date_value) {
                    record.insert(
                        target.clone(),
                        Value::String(date.format(ISO_WEEK_FORMAT).to_string()),
                    );
                }
            }
        }
    }
}

fn stringify_key_fields(record: &mut Record, fields: &[FieldName]) {
    for field in fields {
        let Some(value) = record.get(field) else {
            continue;
        };
        if !value.is_string() {
            let text = scalar_to_string(value);
            record.insert(field.clone(), Value::String(text));
        }
    }
}

/// Coerce a scalar to a canonical `YYYY-MM-DD` string, if it holds a date.
pub fn canonical_date_string(value: &Value) -> Option<DateString> {
    parse_date_value(value).map(|date| date.format(CANONICAL_DATE_FORMAT).to_string())
}

fn parse_date_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(text) => parse_date_text(text.trim()),
        Value::Number(number) => number.as_i64().and_then(parse_date_number),
        _ => None,
    }
}

/// Parse day-granularity dates from the representations seen across
/// sources. Tried in order; `None` when nothing matches.
fn parse_date_text(text: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, CANONICAL_DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(text, format) {
            return Some(stamp.date());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%m/%d/%Y") {
        return Some(date);
    }
    if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y%m%d") {
            return Some(date);
        }
    }
    None
}

/// Numeric dates: 8-digit `YYYYMMDD`, epoch seconds, or epoch millis.
fn parse_date_number(number: i64) -> Option<NaiveDate> {
    match number {
        10_000_000..=99_999_999 => {
            NaiveDate::parse_from_str(&number.to_string(), "%Y%m%d").ok()
        }
        1_000_000_000..=99_999_999_999 => {
            DateTime::from_timestamp(number, 0).map(|stamp| stamp.date_naive())
        }
        100_000_000_000..=i64::MAX => {
            DateTime::from_timestamp_millis(number).map(|stamp| stamp.date_naive())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(fields) => fields,
            other => panic!("not an object: {other}"),
        }
    }

    fn key(fields: &[&str]) -> KeySpec {
        KeySpec::new(fields.iter().map(|f| f.to_string()).collect()).unwrap()
    }

    #[test]
    fn key_spec_rejects_empty_field_list() {
        assert!(KeySpec::new(Vec::new()).is_err());
    }

    #[test]
    fn canonical_date_accepts_common_representations() {
        assert_eq!(
            canonical_date_string(&json!("2024-01-01")).as_deref(),
            Some("2024-01-01")
        );
        assert_eq!(
            canonical_date_string(&json!("2024-01-01T17:30:00Z")).as_deref(),
            Some("2024-01-01")
        );
        assert_eq!(
            canonical_date_string(&json!("2024-01-01 17:30:00")).as_deref(),
            Some("2024-01-01")
        );
        assert_eq!(
            canonical_date_string(&json!("01/31/2024")).as_deref(),
            Some("2024-01-31")
        );
        assert_eq!(
            canonical_date_string(&json!(20240101)).as_deref(),
            Some("2024-01-01")
        );
        assert_eq!(
            canonical_date_string(&json!(1_704_067_200)).as_deref(),
            Some("2024-01-01")
        );
        assert_eq!(
            canonical_date_string(&json!(1_704_067_200_000i64)).as_deref(),
            Some("2024-01-01")
        );
        assert_eq!(canonical_date_string(&json!("snickerdoodle")), None);
        assert_eq!(canonical_date_string(&json!(true)), None);
    }

    #[test]
    fn later_duplicates_within_incoming_win() {
        let incoming = vec![
            record(json!({"id": "a", "date": "2024-01-01", "v": 1})),
            record(json!({"id": "a", "date": "2024-01-01", "v": 2})),
        ];
        let outcome = merge_timeseries(Vec::new(), incoming, &key(&["id", "date"]), &[]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0]["v"], json!(2));
    }

    #[test]
    fn updated_key_keeps_its_original_slot() {
        let existing = vec![
            record(json!({"id": "a", "date": "2024-01-01", "v": 1})),
            record(json!({"id": "b", "date": "2024-01-01", "v": 2})),
        ];
        let incoming = vec![record(json!({"id": "a", "date": "2024-01-01", "v": 9}))];
        let outcome = merge_timeseries(existing, incoming, &key(&["id", "date"]), &[]);
        assert_eq!(outcome.records[0]["id"], json!("a"));
        assert_eq!(outcome.records[0]["v"], json!(9));
        assert_eq!(outcome.records[1]["id"], json!("b"));
    }

    #[test]
    fn derived_rules_rewrite_historical_rows() {
        let existing = vec![record(json!({"id": "a", "date": 20240101, "v": 1}))];
        let rules = vec![
            DerivedRule::CanonicalDate {
                field: "date".to_string(),
            },
            DerivedRule::YearFromDate {
                date_field: "date".to_string(),
                target: "year".to_string(),
            },
            DerivedRule::IsoWeekFromDate {
                date_field: "date".to_string(),
                target: "week".to_string(),
            },
        ];
        let outcome = merge_timeseries(existing, Vec::new(), &key(&["id", "date"]), &rules);
        let merged = &outcome.records[0];
        assert_eq!(merged["date"], json!("2024-01-01"));
        assert_eq!(merged["year"], json!("2024"));
        assert_eq!(merged["week"], json!("2024-W01"));
    }

    #[test]
    fn numeric_and_string_dates_share_one_key() {
        let existing = vec![record(json!({"id": 7, "date": 20240101, "v": 1}))];
        let incoming = vec![record(json!({"id": "7", "date": "2024-01-01", "v": 2}))];
        let rules = vec![DerivedRule::CanonicalDate {
            field: "date".to_string(),
        }];
        let outcome = merge_timeseries(existing, incoming, &key(&["id", "date"]), &rules);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0]["v"], json!(2));
        assert_eq!(outcome.records[0]["id"], json!("7"));
    }

    #[test]
    fn missing_key_fields_merge_degraded_and_warn() {
        let incoming = vec![record(json!({"username": "nasa", "followerCount": 5}))];
        let outcome = merge_timeseries(
            Vec::new(),
            incoming,
            &key(&["username", "date"]),
            &[],
        );
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(
            outcome.warnings,
            vec![MergeWarning::IncompleteKey {
                key: vec!["nasa".to_string(), String::new()],
                missing: vec!["date".to_string()],
            }]
        );
    }
}
