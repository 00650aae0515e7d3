//! BrandScout CLI: fill in missing websites and logos for a content catalog.
//!
//! Finds each organization's official website and social handle, discovers
//! its logo, downloads it into the site's public directory, and writes the
//! updated references back to the catalog.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
