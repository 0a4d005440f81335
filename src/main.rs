//! Round-robin reverse-proxy load balancer.
//!
//! ```text
//!     Admin client ── POST /add ──────────▶ ┌────────────────────┐
//!                                           │  BackendRegistry   │
//!                                           │  (append-only,     │
//!                                           │   atomic cursor)   │
//!                                           └─────────┬──────────┘
//!                                                     │ select_next()
//!                                                     ▼
//!     Client ──── /api/* ──▶ ┌──────────┐     ┌──────────────┐      Backend 0
//!                            │  axum    │────▶│  Dispatcher  │────▶ Backend 1
//!     Client ◀─────────────  │  server  │◀────│  (rewrite +  │◀──── Backend n
//!                            └──────────┘     │   stream)    │
//!                                             └──────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use rr_balancer::config::{load_config, ProxyConfig};
use rr_balancer::lifecycle::startup;
use rr_balancer::observability::logging;

#[derive(Parser)]
#[command(name = "rr-balancer")]
#[command(about = "Round-robin reverse-proxy load balancer", version)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rr-balancer starting");

    startup::run(config).await
}
