//! Settlement Registry Server Binary
//!
//! Hosts the shared settlement directory over TCP.

use std::sync::Arc;

use clap::Parser;
use settlement_registry::{Config, IdAllocator, Registry, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// Settlement registry host
#[derive(Parser, Debug)]
#[command(name = "registry-server")]
#[command(about = "Shares settlement records between connected peers")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:9090")]
    listen: String,

    /// Connection handler threads
    #[arg(short, long, default_value = "5")]
    workers: usize,

    /// Max connections waiting for a worker (unbounded if omitted)
    #[arg(short, long)]
    queue_capacity: Option<usize>,

    /// Drop connections idle for this long (milliseconds, 0 = never)
    #[arg(long, default_value = "0")]
    read_timeout_ms: u64,

    /// Write the registry to this seed file on shutdown
    #[arg(long)]
    seed_file: Option<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,settlement_registry=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Settlement Registry v{}", settlement_registry::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let mut builder = Config::builder()
        .listen_addr(&args.listen)
        .worker_threads(args.workers)
        .queue_capacity(args.queue_capacity)
        .read_timeout_ms(args.read_timeout_ms);
    if let Some(path) = &args.seed_file {
        builder = builder.seed_file(path);
    }
    let config = builder.build();

    let registry = Arc::new(Registry::new());
    let ids = Arc::new(IdAllocator::new());

    let server = match Server::bind(config, registry, ids) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Ctrl+C stops the accept loop and closes live connections
    let handle = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        handle.shutdown();
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
