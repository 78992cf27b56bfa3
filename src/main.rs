//! autoanalyst - binary entry point

use autoanalyst::cli::{self, Cli};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autoanalyst=info".into()),
        )
        .init();

    let cli = Cli::parse();
    cli::run(cli)
}
