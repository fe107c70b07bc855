mod cli;
mod config;
mod files;
mod syslog;
mod tail;
mod web;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (app_level, http_level) = if cli.verbose {
        ("varlog=debug", "tower_http=debug")
    } else {
        ("varlog=info", "tower_http=warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(app_level.parse()?)
                .add_directive(http_level.parse()?),
        )
        .init();

    cli::run(cli).await
}
