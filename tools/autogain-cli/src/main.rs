//! AutoGain CLI
//!
//! Usage:
//!   autogain init <DEVICE>      Create a default profile for a device
//!   autogain info <DEVICE>      Show a device profile
//!   autogain curve <DEVICE>     Print the gain curve as CSV
//!   autogain replay <LOG>       Feed a recorded sample log through the controller

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "autogain",
    about = "Adaptive pointer gain curves learned from your own clicks",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Profiles directory (overrides the configured one)
    #[arg(long, global = true)]
    profiles_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and save a default profile for a device
    Init {
        /// Device identifier (for USB mice, VID_PID)
        device: String,

        /// Device counts per inch
        #[arg(long)]
        cpi: Option<f64>,

        /// Display pixels per inch
        #[arg(long)]
        ppi: Option<f64>,

        /// Initial polling rate (Hz)
        #[arg(long)]
        rate: Option<f64>,

        /// Initial gain of every bin
        #[arg(long)]
        gain: Option<f64>,

        /// Replace an existing profile
        #[arg(long)]
        force: bool,
    },

    /// Show a device profile
    Info {
        /// Device identifier
        device: String,
    },

    /// Print a device's gain curve as `bin,speed_m_s,gain` rows
    Curve {
        /// Device identifier
        device: String,

        /// Print JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Feed a JSONL sample log through the controller
    Replay {
        /// Path to the sample log
        log: PathBuf,

        /// Translate only; never update curves
        #[arg(long)]
        no_learning: bool,

        /// Keep learned profiles in memory instead of saving them
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = autogain_common::config::AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    autogain_common::logging::init_logging(&config.logging);
    if let Some(dir) = cli.profiles_dir {
        config.profiles_dir = dir;
    }
    tracing::debug!(profiles_dir = %config.profiles_dir.display(), "Using profiles directory");

    match cli.command {
        Commands::Init {
            device,
            cpi,
            ppi,
            rate,
            gain,
            force,
        } => commands::init::run(&config, device, cpi, ppi, rate, gain, force),
        Commands::Info { device } => commands::info::run(&config, device),
        Commands::Curve { device, json } => commands::curve::run(&config, device, json),
        Commands::Replay {
            log,
            no_learning,
            dry_run,
        } => commands::replay::run(config, log, no_learning, dry_run),
    }
}
