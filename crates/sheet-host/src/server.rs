//! The stdio protocol loop.
//!
//! Reads one `Request` per line and writes one `Response` per line. Lines
//! that do not parse get an error reply with id 0. Diagnostics go through
//! `tracing`, which the binary points at stderr.

use std::io::{BufRead, Write};

use batch_protocol::{Command, RemoteErrorKind, Request, Response, ResponseResult};

use crate::error::ServeError;
use crate::host::MemoryHost;

/// Serve requests from `input` until EOF or `Shutdown`.
pub fn serve<R: BufRead, W: Write>(host: &mut MemoryHost, input: R, mut output: W) -> Result<(), ServeError> {
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, line, "malformed request");
                let response = Response {
                    id: 0,
                    result: ResponseResult::Error {
                        kind: RemoteErrorKind::InvalidArgument,
                        message: format!("JSON parse error: {e}"),
                        op: None,
                    },
                };
                write_response(&mut output, &response)?;
                continue;
            }
        };

        let shutdown = matches!(request.command, Command::Shutdown);
        if let Some(response) = host.handle_request(request) {
            write_response(&mut output, &response)?;
        }
        if shutdown {
            tracing::info!("shutdown requested");
            return Ok(());
        }
    }

    tracing::info!("stdin closed");
    Ok(())
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> Result<(), ServeError> {
    let json = serde_json::to_string(response)?;
    writeln!(output, "{json}")?;
    output.flush()?;
    Ok(())
}
