mod cli;
mod main_lib;

use clap::Parser;
use cli::Cli;
use main_lib::{build_registry, init_tracing, run_command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let registry = build_registry().await?;
    run_command(&registry, cli.command).await
}
