use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use botanica::{
    BotConfig, BotError, JsonApiFetcher, RunPlan, S3Uploader, Uploader, run_bot,
};

#[derive(Debug, Parser)]
#[command(
    name = "run_bot",
    disable_help_subcommand = true,
    about = "Execute one bot run from its config file",
    long_about = "Fetch the bot's source, refresh its snapshot and timeseries files, and mirror the output directory to S3.",
    after_help = "The config must carry api_url and key_fields; an optional records_pointer key selects the record array inside the response body."
)]
struct RunBotCli {
    #[arg(long, value_name = "PATH", help = "Path to the bot's config.json")]
    config: PathBuf,
    #[arg(long, help = "Skip the S3 upload and keep local files only")]
    skip_upload: bool,
    #[arg(
        long,
        value_name = "HOURS",
        default_value_t = 0,
        allow_hyphen_values = true,
        help = "UTC offset in hours applied to the fetch-date stamp"
    )]
    utc_offset: i32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = RunBotCli::parse();
    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "bot run failed");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &RunBotCli) -> Result<(), BotError> {
    let config = BotConfig::load(&cli.config)?;
    let plan = RunPlan::from_config(&config)?.with_utc_offset(cli.utc_offset);
    let fetcher = build_fetcher(&config)?;

    let uploader = (!cli.skip_upload).then(|| {
        let mut s3 = S3Uploader::new().with_profile(config.s3_profile.clone());
        if let Some(bucket) = &config.s3_bucket {
            s3 = s3.with_bucket(bucket.clone());
        }
        s3
    });

    let report = run_bot(
        &config,
        &plan,
        &fetcher,
        uploader.as_ref().map(|s3| s3 as &dyn Uploader),
    )?;
    info!(
        bot = %config.bot_name,
        fetched = report.records_fetched,
        merged = report.records_merged,
        uploaded = report.uploaded_keys.len(),
        warnings = report.warnings.len(),
        "run complete"
    );
    Ok(())
}

fn build_fetcher(config: &BotConfig) -> Result<JsonApiFetcher, BotError> {
    let url = config.api_url.as_ref().ok_or_else(|| BotError::ConfigInvalid {
        context: "api_url".to_string(),
        reason: "the generic runner needs an api_url to fetch".to_string(),
    })?;
    let mut fetcher = JsonApiFetcher::new(url.clone());
    for (name, value) in &config.params {
        fetcher = fetcher.with_param(name.clone(), value.clone());
    }
    if let Some(pointer) = config.extra.get("records_pointer").and_then(|v| v.as_str()) {
        fetcher = fetcher.with_records_pointer(pointer);
    }
    Ok(fetcher)
}
