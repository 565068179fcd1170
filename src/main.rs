mod cli;

use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use media_resolver::resolver::utils::tool_version;
use media_resolver::server::{self, AppState};
use media_resolver::Resolver;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.resolver_config();
    tracing::info!(ytdlp = %config.ytdlp_path, timeout_secs = config.timeout_secs(), "starting");

    let resolver = match Resolver::new(&config) {
        Ok(resolver) => resolver,
        Err(e) => {
            tracing::error!(error = %e, "resolver setup failed");
            eprintln!("media-resolver: {e}");
            std::process::exit(1);
        }
    };

    let ytdlp_version = tool_version(&config.ytdlp_path).await;
    match &ytdlp_version {
        Some(version) => tracing::info!(%version, "yt-dlp available"),
        None => tracing::warn!(ytdlp = %config.ytdlp_path, "yt-dlp not found"),
    }

    let state = AppState {
        resolver: Arc::new(resolver),
        ytdlp_version: ytdlp_version.map(Arc::from),
    };

    if let Err(e) = server::serve(cli.bind, state).await {
        tracing::error!(error = %e, "server failed");
        eprintln!("media-resolver: {e}");
        std::process::exit(1);
    }
}
