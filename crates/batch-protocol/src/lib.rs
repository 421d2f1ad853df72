//! Shared protocol types for communication between a batching client and a
//! document host process.
//!
//! The protocol is JSON-over-stdio: one JSON object per line in each direction.
//! A client performs one `Handshake`, opens sessions, and sends every flush of
//! a session as a single `Execute` request carrying the queued operations.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

mod value;

pub use value::Value;

/// Identifier of a queued operation, unique within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(pub u64);

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a host-side session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A command sent from the client to the host process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Monotonically increasing request ID for correlating responses.
    pub id: u64,
    /// The command to execute.
    #[serde(flatten)]
    pub command: Command,
}

/// Commands the client can send to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum Command {
    /// Readiness exchange. Returns the host's [`HostInfo`].
    Handshake,

    /// Open a new session. Returns a session handle.
    OpenSession,

    /// Execute one batch of operations, in order, against a session.
    Execute {
        session: SessionId,
        ops: Vec<Operation>,
    },

    /// Discard a session and every object it resolved. One-way: the host
    /// does not reply.
    ReleaseSession { session: SessionId },

    /// Shut down the host process.
    Shutdown,
}

impl Command {
    /// Whether the host answers this command with a [`Response`].
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Command::ReleaseSession { .. })
    }
}

/// Where an [`EntityPath`] starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "op")]
pub enum PathRoot {
    /// The session's workbook.
    Workbook,
    /// The object returned by an earlier `Invoke` in the same session.
    OpResult(OpId),
}

/// One navigation step from an object to a related object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "seg")]
pub enum Segment {
    /// Property navigation, e.g. `worksheets` or `protection`.
    Property { name: String },
    /// Navigation through a method call, e.g. `getItem("ExpensesTable")`.
    Call { method: String, args: Vec<Value> },
}

impl Segment {
    pub fn property(name: impl Into<String>) -> Self {
        Segment::Property { name: name.into() }
    }

    pub fn call(method: impl Into<String>, args: Vec<Value>) -> Self {
        Segment::Call {
            method: method.into(),
            args,
        }
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Self {
        Segment::property(name)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Property { name } => write!(f, "{name}"),
            Segment::Call { method, args } => {
                write!(f, "{method}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", serde_json::to_string(arg).unwrap_or_default())?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Address of a remote object: a root plus navigation segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPath {
    pub root: PathRoot,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
}

impl EntityPath {
    /// The session's workbook.
    pub fn workbook() -> Self {
        Self {
            root: PathRoot::Workbook,
            segments: Vec::new(),
        }
    }

    /// The object returned by operation `op`.
    pub fn op_result(op: OpId) -> Self {
        Self {
            root: PathRoot::OpResult(op),
            segments: Vec::new(),
        }
    }

    /// A new path one step further than this one.
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self {
            root: self.root.clone(),
            segments,
        }
    }
}

impl fmt::Display for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            PathRoot::Workbook => write!(f, "workbook")?,
            PathRoot::OpResult(op) => write!(f, "result{op}")?,
        }
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

/// One queued operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Fetch properties of `target`. Property names may be slash-separated
    /// paths into related objects (`protection/protected`).
    Load {
        id: OpId,
        target: EntityPath,
        properties: Vec<String>,
    },
    /// Assign a property on `target`.
    Set {
        id: OpId,
        target: EntityPath,
        property: String,
        value: Value,
    },
    /// Call a method on `target`.
    Invoke {
        id: OpId,
        target: EntityPath,
        method: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl Operation {
    pub fn id(&self) -> OpId {
        match self {
            Operation::Load { id, .. } | Operation::Set { id, .. } | Operation::Invoke { id, .. } => {
                *id
            }
        }
    }

    pub fn target(&self) -> &EntityPath {
        match self {
            Operation::Load { target, .. }
            | Operation::Set { target, .. }
            | Operation::Invoke { target, .. } => target,
        }
    }

    pub fn is_load(&self) -> bool {
        matches!(self, Operation::Load { .. })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Load {
                id,
                target,
                properties,
            } => write!(f, "{id} load {target} [{}]", properties.join(", ")),
            Operation::Set {
                id,
                target,
                property,
                value,
            } => write!(f, "{id} set {target}.{property} = {value}"),
            Operation::Invoke {
                id,
                target,
                method,
                args,
            } => write!(
                f,
                "{id} invoke {}",
                EntityPath::child(target, Segment::call(method.clone(), args.clone()))
            ),
        }
    }
}

/// The kind of application serving the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostType {
    Excel,
    Word,
    PowerPoint,
    Outlook,
    Other,
}

/// Returned by the readiness handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub host: HostType,
    pub version: String,
}

/// A response sent from the host back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// The request ID this response corresponds to.
    pub id: u64,
    /// The result of the command.
    #[serde(flatten)]
    pub result: ResponseResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ResponseResult {
    #[serde(rename = "ok")]
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<ResponseData>,
    },
    #[serde(rename = "error")]
    Error {
        kind: RemoteErrorKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        op: Option<OpId>,
    },
}

impl ResponseResult {
    pub fn ok(data: ResponseData) -> Self {
        ResponseResult::Ok { data: Some(data) }
    }

    pub fn failure(failure: RemoteFailure) -> Self {
        ResponseResult::Error {
            kind: failure.kind,
            message: failure.message,
            op: failure.op,
        }
    }
}

/// Data returned in successful responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Readiness information.
    HostInfo { host: HostType, version: String },
    /// Handle to a newly opened session.
    Session { session: SessionId },
    /// Values for every load in an executed batch.
    Loads { loads: Vec<LoadResult> },
}

/// The values fetched for one `Load` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    pub op: OpId,
    pub values: BTreeMap<String, Value>,
}

/// Why the host rejected a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// A name or index did not resolve to an object.
    InvalidReference,
    /// The object has no such property or method.
    UnknownMember,
    /// A value had the wrong type for its property or argument.
    TypeMismatch,
    /// An argument was well-typed but unacceptable.
    InvalidArgument,
    /// The document refused the change (e.g. a protected sheet).
    PermissionDenied,
    /// A reference to an object from another session or a failed batch.
    StaleHandle,
    /// The host failed for reasons of its own.
    Internal,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteErrorKind::InvalidReference => "invalid reference",
            RemoteErrorKind::UnknownMember => "unknown member",
            RemoteErrorKind::TypeMismatch => "type mismatch",
            RemoteErrorKind::InvalidArgument => "invalid argument",
            RemoteErrorKind::PermissionDenied => "permission denied",
            RemoteErrorKind::StaleHandle => "stale handle",
            RemoteErrorKind::Internal => "internal host error",
        };
        f.write_str(s)
    }
}

/// A structured batch failure: what went wrong and at which operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFailure {
    pub kind: RemoteErrorKind,
    pub message: String,
    pub op: Option<OpId>,
}

impl RemoteFailure {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            op: None,
        }
    }

    /// Attach the failing operation, keeping an id that is already set.
    pub fn at(mut self, op: OpId) -> Self {
        self.op.get_or_insert(op);
        self
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Some(op) => write!(f, "{} at {op}: {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}
