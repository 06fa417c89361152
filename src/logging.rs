//! Logging setup.
//!
//! All output goes to **stderr**; stdout carries only the handshake line.
//! `RUST_LOG` overrides the default level, e.g.
//! `RUST_LOG=terraform_provider_infra=debug`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber with `info` as the default level.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_logging() -> bool {
    init_logging_with_default("info")
}

/// Install the global subscriber, using `default_level` when `RUST_LOG` is
/// unset or invalid.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_logging_with_default(default_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .is_ok()
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
