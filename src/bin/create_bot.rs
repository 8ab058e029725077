use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use botanica::{ScaffoldLayout, ScaffoldSpec, scaffold_bot};

#[derive(Debug, Parser)]
#[command(
    name = "create_bot",
    disable_help_subcommand = true,
    about = "Scaffold a new bot from the template",
    long_about = "Copy the template bot directory, rewrite its config.json for the new bot, and generate its scheduled-run workflow."
)]
struct CreateBotCli {
    #[arg(
        long,
        value_name = "NAME",
        help = "Unique name for the new bot (underscores for spaces)"
    )]
    name: String,
    #[arg(
        long,
        value_name = "PROFILE",
        help = "AWS profile written into the new config (ambient credentials when omitted)"
    )]
    profile: Option<String>,
    #[arg(
        long = "user",
        value_name = "USER",
        help = "User or entity for the bot to observe, repeat as needed"
    )]
    users: Vec<String>,
    #[arg(
        long,
        value_name = "CRON",
        help = "Cron schedule for the generated workflow (daily at 08:00 UTC when omitted)"
    )]
    schedule: Option<String>,
    #[arg(
        long,
        value_name = "DIR",
        default_value = "template_bot",
        help = "Template bot directory to copy"
    )]
    template_dir: PathBuf,
    #[arg(
        long,
        value_name = "DIR",
        default_value = "bots",
        help = "Directory receiving the new bot"
    )]
    bots_dir: PathBuf,
    #[arg(
        long,
        value_name = "PATH",
        default_value = ".github/workflows/template_workflow.yml",
        help = "Workflow template with name and cron placeholders"
    )]
    workflow_template: PathBuf,
    #[arg(
        long,
        value_name = "DIR",
        default_value = ".github/workflows",
        help = "Directory receiving the generated workflow"
    )]
    workflow_dir: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = CreateBotCli::parse();
    let spec = ScaffoldSpec {
        bot_name: cli.name,
        s3_profile: cli.profile,
        users: cli.users,
        schedule: cli.schedule,
    };
    let layout = ScaffoldLayout {
        template_dir: cli.template_dir,
        bots_dir: cli.bots_dir,
        workflow_template: Some(cli.workflow_template),
        workflow_dir: cli.workflow_dir,
    };
    match scaffold_bot(&spec, &layout) {
        Ok(created) => {
            println!("created bot '{}' at {}", created.slug, created.bot_dir.display());
            println!("config: {}", created.config_path.display());
            if let Some(workflow) = created.workflow_path {
                println!("workflow: {}", workflow.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "scaffolding failed");
            ExitCode::FAILURE
        }
    }
}
