//! Logger setup for Murmur binaries.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the binary, the server library and
/// `tower_http` are all logged at `default_level`.
///
/// Calling this more than once is harmless: later calls are ignored.
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_directives(bin_name, default_level))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .try_init();
}

const LIBRARY_TARGET: &str = "murmur_server";

fn default_directives(bin_name: &str, default_level: &str) -> String {
    // Cargo bin names use dashes, tracing targets use underscores
    let bin_target = bin_name.replace('-', "_");
    let mut targets = vec![bin_target.as_str()];
    if bin_target != LIBRARY_TARGET {
        targets.push(LIBRARY_TARGET);
    }
    targets.push("tower_http");
    targets
        .iter()
        .map(|target| format!("{target}={default_level}"))
        .collect::<Vec<_>>()
        .join(",")
}
