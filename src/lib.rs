#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Per-bot configuration loading.
pub mod config;
/// Centralized constants for store layout, dates, upload, and scaffolding.
pub mod constants;
mod errors;
/// Fetcher seam and the generic JSON-API fetcher.
pub mod fetch;
/// Time-series upsert merging.
pub mod merge;
/// Flat record representation and validation.
pub mod record;
/// Single-run pipeline.
pub mod run;
/// New-bot scaffolding.
pub mod scaffold;
/// Snapshot and timeseries file persistence.
pub mod store;
/// Shared type aliases.
pub mod types;
/// Object-storage upload.
pub mod upload;

pub use config::BotConfig;
pub use errors::BotError;
pub use fetch::{Fetcher, JsonApiFetcher};
pub use merge::{DerivedRule, KeySpec, MergeOutcome, MergeWarning, merge_timeseries};
pub use record::{Record, records_from_value};
pub use run::{RunPlan, RunReport, run_bot};
pub use scaffold::{ScaffoldLayout, ScaffoldSpec, ScaffoldedBot, scaffold_bot};
pub use store::RecordStore;
pub use types::{BotSlug, DateString, FieldName, KeyValues, ProfileName};
pub use upload::{S3Uploader, UploadSummary, Uploader};
