//! Automix CLI: crossfade an ordered list of tracks into one mix.
//!
//! Usage:
//!   automix mix <FILES>...     Render a crossfaded mix
//!   automix plan <FILES>...    Show the crossfade plan without rendering
//!   automix check              Check that ffmpeg/ffprobe are usable

use std::path::PathBuf;

use automix_common::config::AppConfig;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "automix",
    about = "Crossfade tracks into one continuous mix",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// ffmpeg binary to use (overrides config and FFMPEG_PATH)
    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    /// ffprobe binary to use (overrides config and FFPROBE_PATH)
    #[arg(long, global = true)]
    ffprobe: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a crossfaded mix of the given tracks, in order
    Mix {
        /// Tracks in playback order (at least two)
        files: Vec<PathBuf>,

        /// Crossfade length in seconds (unparseable values use the configured default)
        #[arg(short, long)]
        crossfade: Option<String>,

        /// Output file path
        #[arg(short, long, default_value = "automix-session.mp3")]
        output: PathBuf,

        /// Print the mix report as JSON
        #[arg(long)]
        report: bool,
    },

    /// Probe tracks and print the crossfade plan without rendering
    Plan {
        /// Tracks in playback order (at least two)
        files: Vec<PathBuf>,

        /// Crossfade length in seconds (unparseable values use the configured default)
        #[arg(short, long)]
        crossfade: Option<String>,
    },

    /// Check that the audio engine is usable
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    if let Some(ffmpeg) = cli.ffmpeg {
        config.engine.ffmpeg_path = ffmpeg;
    }
    if let Some(ffprobe) = cli.ffprobe {
        config.engine.ffprobe_path = Some(ffprobe);
    }

    automix_common::logging::init_logging(&config.logging);
    config.validate()?;

    match cli.command {
        Commands::Mix {
            files,
            crossfade,
            output,
            report,
        } => commands::mix::run(&config, files, crossfade, output, report).await,
        Commands::Plan { files, crossfade } => commands::plan::run(&config, files, crossfade).await,
        Commands::Check => commands::check::run(&config),
    }
}
