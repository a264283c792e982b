mod cli;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use servarr_core::BootstrapError;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = cli.run().await {
        error!("{:#}", e);
        if let Some(hint) = e.chain().find_map(|c| c.downcast_ref::<BootstrapError>()) {
            eprintln!("Hint: {}", hint.remediation());
        }
        std::process::exit(1);
    }
}
