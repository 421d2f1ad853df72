//! [`MemoryHost`]: a spreadsheet host living in this process.

use std::collections::HashMap;

use batch_protocol::{
    Command, HostInfo, HostType, LoadResult, Operation, RemoteFailure, Request, Response,
    ResponseData, ResponseResult, SessionId,
};
use batch_proxy::{Host, HostError, HostFuture, RemoteSyncError};

use crate::engine::{execute_batch, SessionResults};
use crate::error::{stale_handle, ExecResult};
use crate::model::Workbook;

/// Version reported by the readiness handshake.
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Executes batches against an in-memory [`Workbook`].
///
/// Usable directly as a [`Host`] for in-process sessions, or behind the
/// stdio server for out-of-process clients.
#[derive(Debug, Default)]
pub struct MemoryHost {
    workbook: Workbook,
    sessions: HashMap<SessionId, SessionResults>,
    next_session: u64,
    batches: usize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document.
    pub fn with_workbook(workbook: Workbook) -> Self {
        Self {
            workbook,
            ..Self::default()
        }
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    /// Sessions opened and not yet released.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Batches executed so far, successful or not.
    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn host_info(&self) -> HostInfo {
        HostInfo {
            host: HostType::Excel,
            version: HOST_VERSION.to_string(),
        }
    }

    pub fn open(&mut self) -> SessionId {
        self.next_session += 1;
        let session = SessionId(self.next_session);
        self.sessions.insert(session, SessionResults::new());
        tracing::debug!(%session, "session opened");
        session
    }

    pub fn release(&mut self, session: SessionId) {
        if self.sessions.remove(&session).is_some() {
            tracing::debug!(%session, "session released");
        } else {
            tracing::warn!(%session, "release of unknown session");
        }
    }

    /// Run one batch. Nothing is applied unless every operation succeeds.
    pub fn run_batch(&mut self, session: SessionId, ops: &[Operation]) -> ExecResult<Vec<LoadResult>> {
        self.batches += 1;
        let results = self
            .sessions
            .get_mut(&session)
            .ok_or_else(|| stale_handle(format!("{session} is not open")))?;
        let outcome = execute_batch(&mut self.workbook, results, ops);
        match &outcome {
            Ok(loads) => tracing::debug!(%session, ops = ops.len(), loads = loads.len(), "batch committed"),
            Err(failure) => tracing::debug!(%session, %failure, "batch rejected"),
        }
        outcome
    }

    /// Answer one protocol request. One-way commands produce no response.
    pub fn handle_request(&mut self, request: Request) -> Option<Response> {
        if !request.command.expects_reply() {
            if let Command::ReleaseSession { session } = request.command {
                self.release(session);
            }
            return None;
        }

        let result = match request.command {
            Command::Handshake => {
                let HostInfo { host, version } = self.host_info();
                ResponseResult::ok(ResponseData::HostInfo { host, version })
            }
            Command::OpenSession => ResponseResult::ok(ResponseData::Session {
                session: self.open(),
            }),
            Command::Execute { session, ops } => match self.run_batch(session, &ops) {
                Ok(loads) => ResponseResult::ok(ResponseData::Loads { loads }),
                Err(failure) => ResponseResult::failure(failure),
            },
            Command::Shutdown => ResponseResult::Ok { data: None },
            Command::ReleaseSession { .. } => return None,
        };
        Some(Response {
            id: request.id,
            result,
        })
    }
}

fn remote(failure: RemoteFailure) -> HostError {
    HostError::Remote(RemoteSyncError::from(failure))
}

impl Host for MemoryHost {
    fn handshake(&mut self) -> HostFuture<'_, HostInfo> {
        let info = self.host_info();
        Box::pin(async move { Ok(info) })
    }

    fn open_session(&mut self) -> HostFuture<'_, SessionId> {
        let session = self.open();
        Box::pin(async move { Ok(session) })
    }

    fn execute(&mut self, session: SessionId, ops: Vec<Operation>) -> HostFuture<'_, Vec<LoadResult>> {
        let outcome = self.run_batch(session, &ops).map_err(remote);
        Box::pin(async move { outcome })
    }

    fn release_session(&mut self, session: SessionId) -> HostFuture<'_, ()> {
        self.release(session);
        Box::pin(async move { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batch_protocol::{EntityPath, OpId, RemoteErrorKind, Segment};

    #[test]
    fn test_results_are_scoped_to_their_session() {
        let mut host = MemoryHost::new();
        let a = host.open();
        let b = host.open();
        let tables = EntityPath::workbook()
            .child(Segment::property("worksheets"))
            .child(Segment::call("getActiveWorksheet", vec![]))
            .child(Segment::property("tables"));
        host.run_batch(
            a,
            &[Operation::Invoke {
                id: OpId(0),
                target: tables,
                method: "add".into(),
                args: vec!["A1:B1".into(), true.into()],
            }],
        )
        .unwrap();

        let err = host
            .run_batch(
                b,
                &[Operation::Load {
                    id: OpId(0),
                    target: EntityPath::op_result(OpId(0)),
                    properties: vec!["name".into()],
                }],
            )
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::StaleHandle);

        host.release(a);
        assert_eq!(host.open_sessions(), 1);
        assert_eq!(host.batches(), 2);
    }

    #[test]
    fn test_release_is_one_way() {
        let mut host = MemoryHost::new();
        let session = host.open();
        let reply = host.handle_request(Request {
            id: 9,
            command: Command::ReleaseSession { session },
        });
        assert!(reply.is_none());
        assert_eq!(host.open_sessions(), 0);
    }

    #[test]
    fn test_execute_on_unknown_session() {
        let mut host = MemoryHost::new();
        let reply = host
            .handle_request(Request {
                id: 4,
                command: Command::Execute {
                    session: SessionId(77),
                    ops: vec![],
                },
            })
            .unwrap();
        assert_eq!(reply.id, 4);
        assert!(matches!(
            reply.result,
            ResponseResult::Error {
                kind: RemoteErrorKind::StaleHandle,
                ..
            }
        ));
    }
}
