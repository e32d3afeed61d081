//! Murmur chat server.
//!
//! Run with:
//! ```not_rust
//! MURMUR_JWT_SECRET=... cargo run --bin murmur-server
//! ```

use clap::Parser;
use murmur_server::ServerConfig;
use murmur_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    // Run the server
    if let Err(e) = murmur_server::run_server(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
