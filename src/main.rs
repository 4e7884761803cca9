//! music-curator - unattended identification and tagging of an audio
//! library via AcoustID/MusicBrainz fingerprint lookups.

pub mod cli;
pub mod config;
pub mod cover;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod library;
pub mod metadata;
pub mod model;
pub mod rate_limit;
pub mod scanner;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("music_curator=info".parse().unwrap()))
        .init();

    cli::run_command(&args).await
}
