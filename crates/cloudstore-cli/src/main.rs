//! Cloudstore - command-line access to one Cloud Object Storage bucket

mod commands;
mod config;

use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use config::Config;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cloudstore")]
#[command(author = "Cloudstore Team")]
#[command(version = cloudstore_core::VERSION)]
#[command(about = "List, read and write objects in a Cloud Object Storage bucket", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration profile
    #[arg(short, long, global = true, env = "CLOUDSTORE_PROFILE")]
    profile: Option<String>,

    /// Bucket name (overrides the profile)
    #[arg(short, long, global = true)]
    bucket: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CLOUDSTORE_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List every key in the bucket
    Ls,

    /// Download an object to stdout or a file
    Get {
        key: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a file or literal text, replacing any existing object
    Put {
        key: String,

        /// File to upload
        #[arg(required_unless_present = "text")]
        file: Option<PathBuf>,

        /// Upload this text instead of a file
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
    },

    /// Manage configuration profiles
    Configure {
        #[command(subcommand)]
        action: Option<ConfigureAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigureAction {
    /// Set a value in the active profile
    Set { key: String, value: String },
    /// Print a value from the active profile
    Get { key: String },
    /// Show the active profile and all profile names
    List,
    /// Delete a profile
    RemoveProfile { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = Config::load(cli.profile.as_deref())?;
    if let Some(bucket) = cli.bucket {
        config.bucket = Some(bucket);
    }
    debug!(
        "Using profile {} (bucket {:?})",
        cli.profile.as_deref().unwrap_or(config::DEFAULT_PROFILE),
        config.bucket
    );

    let ctx = CommandContext {
        config,
        profile: cli.profile,
        output_format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Ls => commands::ls::execute(&ctx).await,
        Commands::Get { key, output } => commands::get::execute(&ctx, &key, output.as_deref()).await,
        Commands::Put { key, file, text } => {
            commands::put::execute(&ctx, &key, file.as_deref(), text).await
        }
        Commands::Configure { action } => commands::configure::execute(&ctx, action),
    }
}
