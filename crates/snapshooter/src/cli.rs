use std::path::PathBuf;

use clap::{Parser, Subcommand};

use snapshooter::config::{Overrides, parse_scale, parse_threshold};

#[derive(Parser)]
#[command(
    name = "snapshooter",
    about = "Image comparison and difference rendering for snapshot tests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create .snapshooter/config.toml with default settings
    Init {
        /// Directory holding reference snapshots
        #[arg(long, default_value = "Snapshots")]
        reference_dir: PathBuf,
        /// Overwrite existing config
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Compare two PNG files and report their similarity (exit 0/1)
    Compare {
        /// Reference image
        #[arg(long)]
        reference: PathBuf,
        /// Candidate image
        #[arg(long)]
        candidate: PathBuf,
        /// Max per-channel difference (0-255) for pixels to count as equal
        #[arg(long)]
        tolerance: Option<u8>,
        /// Min similarity (0.0-1.0) for the comparison to pass
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f32>,
        /// Display scale both images are loaded at
        #[arg(long, value_parser = parse_scale)]
        scale: Option<f32>,
        /// Write difference.png into DIR when the comparison fails
        #[arg(long, short = 'o', value_name = "DIR")]
        output: Option<PathBuf>,
        /// Print a JSON report instead of a status line
        #[arg(long)]
        json: bool,
    },

    /// Check a rendered PNG against the stored reference snapshot (exit 0/1)
    Check {
        /// Rendered candidate image
        #[arg(long)]
        candidate: PathBuf,
        /// Snapshot name (default: derived from the candidate file stem)
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        overrides: Overrides,
    },
}
