//! ClipCraft CLI: compose vertical shorts from posts.
//!
//! Usage:
//!   clipcraft init                 Write a default config.json
//!   clipcraft check                Check that ffmpeg and ffprobe are installed
//!   clipcraft probe <FILE>         Print a media file's dimensions
//!   clipcraft graph [OPTIONS]      Print the filter graph for given dimensions
//!   clipcraft render [--url URL]   Render the latest post once
//!   clipcraft schedule             Run the scheduler until Ctrl-C

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clipcraft_common::config::{LoggingConfig, SettingsStore};
use clipcraft_model::Dimensions;

mod commands;

#[derive(Parser)]
#[command(
    name = "clipcraft",
    about = "Compose vertical short videos from social posts",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Directory holding config.json (default: $XDG_CONFIG_HOME/clipcraft)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing the bundled assets/ folder
    #[arg(long, global = true, default_value = ".")]
    base_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Check that the external media tools are available
    Check,

    /// Print the dimensions of a media file
    Probe {
        /// Path to the image or video
        file: PathBuf,
    },

    /// Print the filter graph for the given input dimensions
    Graph {
        /// Background (canvas) dimensions, e.g. 1080x1920
        #[arg(long)]
        background: Dimensions,

        /// Screenshot dimensions
        #[arg(long)]
        image: Dimensions,

        /// Overlay video dimensions
        #[arg(long)]
        video: Option<Dimensions>,

        /// Caption text
        #[arg(long, default_value = "")]
        text: String,
    },

    /// Render the latest post once
    Render {
        /// Watch URL (default: general.watchUrl from the config)
        #[arg(long)]
        url: Option<String>,

        /// Print the final result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the scheduler until interrupted
    Schedule {
        /// How often to re-read the config file (seconds)
        #[arg(long, default_value = "30")]
        reload_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let store = match &cli.config {
        Some(dir) => SettingsStore::new(dir),
        None => SettingsStore::default_location(),
    };

    // Initialize logging
    let settings = store.load();
    let mut logging = LoggingConfig::from_settings(&settings);
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    logging.json = cli.log_json;
    clipcraft_common::logging::init_logging(&logging);

    tracing::debug!(config = %store.path().display(), "Loaded settings");

    match cli.command {
        Commands::Init { force } => commands::init::run(&store, force),
        Commands::Check => commands::check::run(&store),
        Commands::Probe { file } => commands::probe::run(file).await,
        Commands::Graph {
            background,
            image,
            video,
            text,
        } => commands::graph::run(&settings, background, image, video, &text),
        Commands::Render { url, json } => {
            commands::render::run(settings, cli.base_dir, url, json).await
        }
        Commands::Schedule { reload_secs } => {
            commands::schedule::run(store, settings, cli.base_dir, reload_secs).await
        }
    }
}
