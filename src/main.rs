//! Switchyard server binary.
//!
//! ```text
//!     Client ──▶ listener ──▶ admission ──▶ negotiate ─┬─▶ HTTP/1.1 chain ─┐
//!                (accept)     (conn cap,    (ALPN /    │                    ├─▶ routing table ─▶ handler
//!                             rate limit)    preface)  └─▶ HTTP/2 streams ──┘
//! ```
//!
//! Serves the built-in admin routes; applications embed the library and
//! register their own.

use std::path::PathBuf;

use clap::Parser;

use switchyard::config::{load_config, ServerConfig};
use switchyard::observability::{logging, metrics};
use switchyard::Server;

#[derive(Debug, Parser)]
#[command(name = "switchyard", version, about = "Embeddable HTTP/1.1 and HTTP/2 server")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "switchyard starting");

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all().thread_name(config.workers.thread_name.clone());
    if config.workers.worker_threads > 0 {
        runtime.worker_threads(config.workers.worker_threads);
    }
    runtime.build()?.block_on(run(config))
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        rate_limit = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(address) => metrics::install_prometheus(address)?,
            Err(error) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %error,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = Server::new(config);
    if server.config().admin.enabled {
        server.serve_admin()?;
    }
    if server.config().health_check.enabled {
        server.schedule_health_checks();
    }

    let address = server.listen_and_serve().await?;
    tracing::info!(address = %address, "Listening for connections");

    tokio::signal::ctrl_c().await?;
    server.shutdown();

    tracing::info!("Shutdown complete");
    Ok(())
}
