mod capture;
mod config;
mod datatypes;
mod display;
mod error;
mod face;
mod gui;
mod login;
#[cfg(test)]
mod test_support;
mod worker;

use clap::Parser;
use config::{AppConfig, Cli, SubCommand};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(SubCommand::Types) => {
            datatypes::print_walkthrough();
            Ok(())
        }
        Some(SubCommand::Cameras) => cmd_cameras(),
        None => cmd_run(cli),
    }
}

fn cmd_run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_cli(cli.run)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        camera = config.camera_index,
        admin_face = %config.admin_face.display(),
        temp_dir = %config.temp_dir.display(),
        threshold = config.match_threshold,
        "face-login starting"
    );
    if !config.admin_face.exists() {
        tracing::warn!(
            "no administrator face at {}, face login will fail until one is enrolled",
            config.admin_face.display()
        );
    }

    gui::run_gui(config)
}

fn cmd_cameras() -> anyhow::Result<()> {
    let cameras = capture::list_cameras()?;
    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }
    for cam in cameras {
        if cam.description.is_empty() {
            println!("{}: {}", cam.index, cam.name);
        } else {
            println!("{}: {} ({})", cam.index, cam.name, cam.description);
        }
    }
    Ok(())
}
