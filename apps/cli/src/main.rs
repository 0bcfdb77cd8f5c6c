//! company-enricher CLI: fill in company profiles from an external lookup API.
//!
//! Reads company rows from the configured database, looks each profile up,
//! and stores the returned attributes in a sink table in one transaction.

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
