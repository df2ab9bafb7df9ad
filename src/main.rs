//! `mcp-homectl` binary: resolve configuration, initialize logging on
//! stderr, and serve MCP over stdio.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mcp_homectl::config::{self, Cli};
use mcp_homectl::{mcp, Adapter};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let resolved = match config::load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("mcp-homectl: configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // stdout carries JSON-RPC, so logs go to stderr
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| resolved.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_filter))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let adapter = match Adapter::new(&resolved.controller) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client");
            std::process::exit(1);
        }
    };

    tracing::info!(
        url = adapter.base_url(),
        timeout_secs = resolved.controller.timeout.as_secs(),
        "mcp-homectl ready"
    );

    mcp::run_stdio(adapter).await;
}
