//! Main entry point for the mcrepack CLI application.
//!
//! Runs the repack pipeline once over the selected run table and exits.
//! Any failure aborts the run with a non-zero exit status.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;

use mcrepack::{Cli, HttpFetcher, Pipeline};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level().to_string()))
        .format_timestamp(None)
        .init();

    let table = cli.run_table()?;
    let fetcher = HttpFetcher::new()?;
    let pipeline = Pipeline::new(&fetcher, cli.settings());

    pipeline.run(&table).await?;
    Ok(())
}
