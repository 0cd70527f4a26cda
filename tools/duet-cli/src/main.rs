//! Duet CLI: headless driver for the compositing and recording pipeline.
//!
//! Usage:
//!   duet record [OPTIONS]     Record a synthetic duet or AR session
//!   duet tiers                List output quality tiers
//!   duet effects              List the effect catalog
//!   duet check                Check the capture and encode environment
//!   duet config <ACTION>      Show or initialize the configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "duet",
    about = "Real-time duet and AR-filter compositing and recording",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a session from the synthetic camera
    Record {
        /// Layout: paired-side-by-side, paired-stacked, picture-in-picture,
        /// blend-overlay or single-anchored
        #[arg(short, long, default_value = "paired-side-by-side")]
        layout: String,

        /// Maximum duration in seconds (defaults to the configured value)
        #[arg(short, long)]
        duration: Option<f64>,

        /// Quality tier: low, standard or high
        #[arg(short, long)]
        quality: Option<String>,

        /// Effect to activate, as `id` or `id:intensity` (repeatable)
        #[arg(short, long = "effect")]
        effects: Vec<String>,

        /// Unlock premium effects
        #[arg(long)]
        premium: bool,

        /// Feed a fixed face anchor so decorations render
        #[arg(long)]
        anchor: bool,

        /// Encoder: memory or gstreamer
        #[arg(long, default_value = "memory")]
        encoder: String,

        /// Pace ticks with the wall clock instead of running as fast as possible
        #[arg(long)]
        realtime: bool,

        /// Output directory (defaults to the configured download directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List output quality tiers
    Tiers,

    /// List the effect catalog
    Effects,

    /// Check the capture and encode environment
    Check,

    /// Show or initialize the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging = duet_common::config::AppConfig::load().logging;
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    duet_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Record {
            layout,
            duration,
            quality,
            effects,
            premium,
            anchor,
            encoder,
            realtime,
            output,
        } => {
            commands::record::run(commands::record::RecordArgs {
                layout,
                duration,
                quality,
                effects,
                premium,
                anchor,
                encoder,
                realtime,
                output,
            })
            .await
        }
        Commands::Tiers => commands::tiers::run(),
        Commands::Effects => commands::effects::run(),
        Commands::Check => commands::check::run().await,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(),
            ConfigAction::Init { force } => commands::config::init(force),
        },
    }
}
