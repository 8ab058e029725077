/// Constants used by record-store file layout.
pub mod store {
    /// Suffix appended to the bot slug for the cumulative history file.
    pub const TIMESERIES_SUFFIX: &str = "_timeseries";
    /// Extension shared by snapshot and timeseries files.
    pub const STORE_EXTENSION: &str = "json";
    /// Extension of the sibling written before the atomic rename.
    pub const TMP_EXTENSION: &str = "tmp";
}

/// Constants used by date normalization.
pub mod dates {
    /// Canonical day-granularity date format for persisted records.
    pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";
    /// Canonical ISO-week format for derived week fields.
    pub const ISO_WEEK_FORMAT: &str = "%G-W%V";
}

/// Constants used by the S3 uploader.
pub mod upload {
    /// Default destination bucket.
    pub const DEFAULT_BUCKET: &str = "stilesdata.com";
    /// Default key prefix ahead of the bot slug.
    pub const DEFAULT_PREFIX: &str = "data";
    /// OS artifact filenames never uploaded.
    pub const OS_ARTIFACTS: [&str; 3] = [".DS_Store", "Thumbs.db", "desktop.ini"];
}

/// Constants used by the bot scaffolder.
pub mod scaffold {
    /// Filename of the per-bot configuration file.
    pub const CONFIG_FILENAME: &str = "config.json";
    /// Bot-name placeholder substituted in workflow templates.
    pub const BOT_NAME_PLACEHOLDER: &str = "%%BOT_NAME%%";
    /// Cron placeholder substituted in workflow templates.
    pub const CRON_PLACEHOLDER: &str = "0 0 1 1 *";
    /// Schedule used when none is supplied (daily at 08:00 UTC).
    pub const DEFAULT_SCHEDULE: &str = "0 8 * * *";
    /// Field count of a well-formed cron expression.
    pub const CRON_FIELDS: usize = 5;
}
