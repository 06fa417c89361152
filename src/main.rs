use clap::Parser;
use terraform_provider_infra::{init_logging_with_default, serve, InfraProvider};

/// Provider plugin for the Infra identity and access service.
///
/// Started by the host; prints a handshake line on stdout and serves the
/// provider protocol until terminated.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging_with_default(if args.debug { "debug" } else { "info" });

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting provider");
    serve(InfraProvider::new()).await
}
