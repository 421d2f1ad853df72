//! sheet-host: an in-memory spreadsheet host served over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! - Reads `Request` objects from stdin
//! - Writes `Response` objects to stdout
//! - Diagnostic/log messages go to stderr (never stdout)

use std::io;

use sheet_host::{serve, MemoryHost};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    tracing::info!(version = sheet_host::HOST_VERSION, "starting up");

    let mut host = MemoryHost::new();
    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(e) = serve(&mut host, stdin.lock(), stdout.lock()) {
        tracing::error!(error = %e, "server loop failed");
        std::process::exit(1);
    }

    tracing::info!(batches = host.batches(), "process exiting");
}
