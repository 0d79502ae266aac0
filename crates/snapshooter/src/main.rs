mod cli;
mod commands;
mod report;

use clap::Parser;
use snapshooter::config::{Overrides, ResolvedRunConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("snapshooter=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Init {
            reference_dir,
            force,
        } => {
            commands::init(&reference_dir, force)?;
        }
        cli::Command::Compare {
            reference,
            candidate,
            tolerance,
            threshold,
            scale,
            output,
            json,
        } => {
            let overrides = Overrides {
                tolerance,
                threshold,
                scale,
                ..Overrides::default()
            };
            let config = ResolvedRunConfig::new(overrides)?;
            let code = commands::compare(
                &config,
                &reference,
                &candidate,
                output.as_deref(),
                json,
            )?;
            std::process::exit(code);
        }
        cli::Command::Check {
            candidate,
            name,
            overrides,
        } => {
            let config = ResolvedRunConfig::new(overrides)?;
            let code = commands::check(&config, &candidate, name.as_deref())?;
            std::process::exit(code);
        }
    }

    Ok(())
}
