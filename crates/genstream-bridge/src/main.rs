//! genstream-bridge — control layer between a generative music service and a
//! local audio output.
//!
//! Accepts asynchronously arriving audio segments from the generator,
//! schedules their gapless playback against the output clock, and drives the
//! generator's lifecycle and configuration from static settings. The `run`
//! command exercises the whole loop against a built-in simulated generator.

mod cli;
mod runtime;
mod sim;
mod sink;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,genstream_bridge=info")),
        )
        .init();

    match &args.cmd {
        cli::Command::Run { duration_seconds } => runtime::run(&args, *duration_seconds),
        cli::Command::ListDevices => sink::list_devices(&cpal::default_host()),
        cli::Command::DumpConfig => runtime::dump_config(&args),
    }
}
