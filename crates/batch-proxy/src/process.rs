//! Subprocess management and JSON-lines IPC for an out-of-process host.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use batch_protocol::{
    Command as HostCommand, HostInfo, LoadResult, Operation, RemoteFailure, Request, Response,
    ResponseData, ResponseResult, SessionId,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::error::{HostError, RemoteSyncError, TransportError};
use crate::host::{Host, HostFuture};

/// Configuration for a host process.
#[derive(Debug, Clone)]
pub struct ProcessHostConfig {
    /// Path to the host executable.
    pub program: PathBuf,

    /// Extra arguments passed to the host.
    pub args: Vec<String>,

    /// Timeout for each round trip.
    pub timeout: Duration,
}

impl Default for ProcessHostConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("sheet-host"),
            args: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// A host running as a child process, spoken to over stdin/stdout.
///
/// Host diagnostics are inherited onto our stderr; stdout carries only
/// protocol lines.
pub struct ProcessHost {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// Bytes of a reply line read before a timeout cut the read short.
    partial: Vec<u8>,
    next_id: u64,
    timeout: Duration,
}

impl ProcessHost {
    /// Spawn the host process. No request is sent until the first call.
    pub fn start(config: ProcessHostConfig) -> Result<Self, TransportError> {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TransportError::HostNotFound(config.program.display().to_string())
            } else {
                TransportError::SpawnFailed(e)
            }
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::UnexpectedResponse("host stdin not piped".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::UnexpectedResponse("host stdout not piped".into()))?;

        tracing::info!(program = %config.program.display(), "started host process");

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            partial: Vec::new(),
            next_id: 1,
            timeout: config.timeout,
        })
    }

    /// Send a command and, unless it is one-way, wait for its response.
    async fn send_command(&mut self, command: HostCommand) -> Result<Option<ResponseData>, HostError> {
        let id = self.next_id;
        self.next_id += 1;

        let expects_reply = command.expects_reply();
        let request = Request { id, command };
        let mut json = serde_json::to_string(&request).map_err(TransportError::from)?;
        json.push('\n');

        self.stdin
            .write_all(json.as_bytes())
            .await
            .map_err(TransportError::from)?;
        self.stdin.flush().await.map_err(TransportError::from)?;

        if !expects_reply {
            return Ok(None);
        }

        // Replies to requests that already timed out may still be in the
        // pipe ahead of ours.
        let response = loop {
            let response = self.read_response().await?;
            if response.id < id {
                tracing::debug!(stale = response.id, expected = id, "dropping late response");
                continue;
            }
            if response.id != id {
                return Err(TransportError::IdMismatch {
                    expected: id,
                    got: response.id,
                }
                .into());
            }
            break response;
        };

        match response.result {
            ResponseResult::Ok { data } => Ok(data),
            ResponseResult::Error { kind, message, op } => {
                Err(RemoteSyncError::new(RemoteFailure { kind, message, op }).into())
            }
        }
    }

    /// Read one reply line. A read cut short by the timeout keeps its bytes
    /// in `partial`, so the next call resumes mid-line.
    async fn read_response(&mut self) -> Result<Response, TransportError> {
        let read = tokio::time::timeout(
            self.timeout,
            self.stdout.read_until(b'\n', &mut self.partial),
        )
        .await
        .map_err(|_| TransportError::Timeout(self.timeout))??;
        if read == 0 {
            return Err(TransportError::Disconnected);
        }

        let line = std::mem::take(&mut self.partial);
        Ok(serde_json::from_slice(&line)?)
    }

    /// Ask the host to exit and wait for it; kill it if it does not.
    pub async fn shutdown(mut self) -> Result<(), HostError> {
        if let Err(e) = self.send_command(HostCommand::Shutdown).await {
            tracing::warn!(error = %e, "host did not acknowledge shutdown");
        }

        match tokio::time::timeout(self.timeout, self.child.wait()).await {
            Ok(status) => {
                let status = status.map_err(TransportError::from)?;
                tracing::info!(%status, "host process exited");
            }
            Err(_) => {
                tracing::warn!("host process did not exit, killing it");
                self.child.kill().await.map_err(TransportError::from)?;
            }
        }
        Ok(())
    }
}

fn unexpected(what: &str, data: Option<ResponseData>) -> HostError {
    TransportError::UnexpectedResponse(format!("expected {what}, got {data:?}")).into()
}

impl Host for ProcessHost {
    fn handshake(&mut self) -> HostFuture<'_, HostInfo> {
        Box::pin(async move {
            match self.send_command(HostCommand::Handshake).await? {
                Some(ResponseData::HostInfo { host, version }) => Ok(HostInfo { host, version }),
                other => Err(unexpected("host info", other)),
            }
        })
    }

    fn open_session(&mut self) -> HostFuture<'_, SessionId> {
        Box::pin(async move {
            match self.send_command(HostCommand::OpenSession).await? {
                Some(ResponseData::Session { session }) => Ok(session),
                other => Err(unexpected("session handle", other)),
            }
        })
    }

    fn execute(
        &mut self,
        session: SessionId,
        ops: Vec<Operation>,
    ) -> HostFuture<'_, Vec<LoadResult>> {
        Box::pin(async move {
            match self
                .send_command(HostCommand::Execute { session, ops })
                .await?
            {
                Some(ResponseData::Loads { loads }) => Ok(loads),
                None => Ok(Vec::new()),
                other => Err(unexpected("load results", other)),
            }
        })
    }

    fn release_session(&mut self, session: SessionId) -> HostFuture<'_, ()> {
        Box::pin(async move {
            self.send_command(HostCommand::ReleaseSession { session })
                .await
                .map(|_| ())
        })
    }
}
