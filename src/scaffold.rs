use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::constants::scaffold::{
    BOT_NAME_PLACEHOLDER, CONFIG_FILENAME, CRON_FIELDS, CRON_PLACEHOLDER, DEFAULT_SCHEDULE,
};
use crate::errors::BotError;
use crate::types::{BotSlug, ProfileName};

/// Answers collected for one new bot.
#[derive(Clone, Debug)]
pub struct ScaffoldSpec {
    /// Requested bot name; sanitized into the slug.
    pub bot_name: String,
    /// Credential profile written into the new config.
    pub s3_profile: Option<ProfileName>,
    /// Users/entities the bot will observe.
    pub users: Vec<String>,
    /// Cron schedule for the generated workflow; daily 08:00 UTC when
    /// absent.
    pub schedule: Option<String>,
}

/// Where templates live and where scaffolded files land.
#[derive(Clone, Debug)]
pub struct ScaffoldLayout {
    /// Template bot directory copied for each new bot.
    pub template_dir: PathBuf,
    /// Directory holding one subdirectory per bot.
    pub bots_dir: PathBuf,
    /// Workflow template with name/cron placeholders; workflow generation
    /// is skipped when absent.
    pub workflow_template: Option<PathBuf>,
    /// Directory receiving the generated `<slug>.yml` workflow.
    pub workflow_dir: PathBuf,
}

/// Paths produced by a successful scaffold.
#[derive(Clone, Debug)]
pub struct ScaffoldedBot {
    /// Sanitized slug the bot was created under.
    pub slug: BotSlug,
    /// The new bot's directory.
    pub bot_dir: PathBuf,
    /// The rewritten configuration file.
    pub config_path: PathBuf,
    /// The generated workflow, when a template was available.
    pub workflow_path: Option<PathBuf>,
}

/// Normalize a requested bot name into a slug: trimmed, lowercased,
/// spaces to underscores.
pub fn sanitize_slug(name: &str) -> BotSlug {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Create a new bot from the template: copy the template directory,
/// rewrite its config, and generate the scheduled-run workflow.
pub fn scaffold_bot(
    spec: &ScaffoldSpec,
    layout: &ScaffoldLayout,
) -> Result<ScaffoldedBot, BotError> {
    let slug = sanitize_slug(&spec.bot_name);
    if slug.is_empty() {
        return Err(BotError::ConfigInvalid {
            context: "bot_name".to_string(),
            reason: "bot name cannot be empty".to_string(),
        });
    }
    let bot_dir = layout.bots_dir.join(&slug);
    if bot_dir.exists() {
        return Err(BotError::ConfigInvalid {
            context: "bot_name".to_string(),
            reason: format!("a bot named '{slug}' already exists"),
        });
    }

    copy_dir(&layout.template_dir, &bot_dir)?;
    let config_path = rewrite_config(spec, &slug, &bot_dir)?;

    let schedule = spec
        .schedule
        .clone()
        .unwrap_or_else(|| DEFAULT_SCHEDULE.to_string());
    if schedule.split_whitespace().count() != CRON_FIELDS {
        warn!(%schedule, "schedule does not look like a five-field cron expression");
    }
    let workflow_path = write_workflow(layout, &slug, &schedule)?;

    info!(%slug, dir = %bot_dir.display(), "scaffolded new bot");
    Ok(ScaffoldedBot {
        slug,
        bot_dir,
        config_path,
        workflow_path,
    })
}

fn copy_dir(src: &Path, dst: &Path) -> Result<(), BotError> {
    if !src.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("template directory not found at {}", src.display()),
        )
        .into());
    }
    fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|err| io::Error::other(err.to_string()))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Rewrite the copied config with the new bot's identity, keeping any
/// template keys it does not own.
fn rewrite_config(
    spec: &ScaffoldSpec,
    slug: &str,
    bot_dir: &Path,
) -> Result<PathBuf, BotError> {
    let config_path = bot_dir.join(CONFIG_FILENAME);
    let mut config: Map<String, Value> = if config_path.exists() {
        let raw = fs::read_to_string(&config_path)?;
        serde_json::from_str(&raw).map_err(|err| BotError::ConfigInvalid {
            context: config_path.display().to_string(),
            reason: err.to_string(),
        })?
    } else {
        Map::new()
    };

    config.insert("bot_name".to_string(), Value::String(slug.to_string()));
    config.insert(
        "s3_profile".to_string(),
        Value::String(spec.s3_profile.clone().unwrap_or_default()),
    );
    config.insert(
        "users".to_string(),
        Value::Array(spec.users.iter().cloned().map(Value::String).collect()),
    );
    config
        .entry("output_directory".to_string())
        .or_insert_with(|| Value::String(format!("data/{slug}")));
    config
        .entry("date_field".to_string())
        .or_insert_with(|| Value::String("fetched".to_string()));

    let payload = serde_json::to_string_pretty(&config).map_err(io::Error::other)?;
    fs::write(&config_path, payload)?;
    Ok(config_path)
}

fn write_workflow(
    layout: &ScaffoldLayout,
    slug: &str,
    schedule: &str,
) -> Result<Option<PathBuf>, BotError> {
    let Some(template_path) = &layout.workflow_template else {
        return Ok(None);
    };
    if !template_path.is_file() {
        warn!(path = %template_path.display(), "workflow template missing, skipping workflow");
        return Ok(None);
    }
    let template = fs::read_to_string(template_path)?;
    let content = template
        .replace(BOT_NAME_PLACEHOLDER, slug)
        .replace(CRON_PLACEHOLDER, schedule);
    fs::create_dir_all(&layout.workflow_dir)?;
    let workflow_path = layout.workflow_dir.join(format!("{slug}.yml"));
    fs::write(&workflow_path, content)?;
    Ok(Some(workflow_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_trimmed_lowercased_and_underscored() {
        assert_eq!(sanitize_slug("  Weather Scraper "), "weather_scraper");
        assert_eq!(sanitize_slug("tsla_stock"), "tsla_stock");
        assert_eq!(sanitize_slug("   "), "");
    }
}
