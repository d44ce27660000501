//! stepseq - a 16-step, multi-track drum sequencer
//!
//! Patterns are stored as named projects; each can be played live on the
//! default output device or rendered offline to a one-bar WAV file.

mod commands;
mod config;
mod grid;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use config::Config;

#[derive(Parser)]
#[command(name = "stepseq")]
#[command(about = "16-step drum sequencer")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/stepseq/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory sample files are resolved against
    #[arg(long, global = true)]
    samples_dir: Option<PathBuf>,

    /// Directory projects are stored in
    #[arg(long, global = true)]
    projects_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project with the default kit and an empty pattern
    New {
        name: String,

        /// Tempo in beats per minute
        #[arg(long, default_value_t = 120.0)]
        bpm: f64,

        /// Overwrite an existing project
        #[arg(long)]
        force: bool,
    },

    /// List stored projects
    List,

    /// Print a project's pattern
    Show { name: String },

    /// Flip one cell of the pattern
    Toggle {
        name: String,

        /// Track name or 1-based track number
        track: String,

        /// Step, 1 to 16
        step: String,
    },

    /// Clear every cell of the pattern
    Clear { name: String },

    /// Set the tempo (clamped to 40..=240 BPM)
    Tempo { name: String, bpm: f64 },

    /// Render one bar to a WAV file
    Export {
        name: String,

        /// Output WAV file
        #[arg(short, long, default_value = "pattern.wav")]
        output: PathBuf,

        /// Output channel count (default from config)
        #[arg(long)]
        channels: Option<u16>,
    },

    /// Play the pattern on the default output device
    Play {
        name: String,

        /// Bars to play before stopping
        #[arg(long, default_value_t = 4)]
        bars: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if let Some(dir) = cli.samples_dir {
        config.samples_dir = dir;
    }
    if let Some(dir) = cli.projects_dir {
        config.projects_dir = dir;
    }

    match cli.command {
        Commands::New { name, bpm, force } => commands::new_project(&config, &name, bpm, force),
        Commands::List => commands::list_projects(&config),
        Commands::Show { name } => commands::show(&config, &name),
        Commands::Toggle { name, track, step } => commands::toggle(&config, &name, &track, &step),
        Commands::Clear { name } => commands::clear(&config, &name),
        Commands::Tempo { name, bpm } => commands::tempo(&config, &name, bpm),
        Commands::Export {
            name,
            output,
            channels,
        } => commands::export(
            &config,
            &name,
            &output,
            channels.unwrap_or(config.export_channels),
        ),
        Commands::Play { name, bars } => commands::play(&config, &name, bars),
    }
}
