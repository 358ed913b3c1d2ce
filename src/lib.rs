pub mod chat;
pub mod config;
pub mod error;
pub mod export;
pub mod handlers;
pub mod models;
pub mod retry;
pub mod server;
pub mod startup;
pub mod transcript;
pub mod transport;
pub mod tutorial;

use tracing_subscriber::EnvFilter;

/// Stderr tracing; RUST_LOG wins over the DEBUG-derived default
pub fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::log_filter(debug)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}
