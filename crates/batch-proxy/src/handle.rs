//! Proxy handles: local stand-ins for remote objects.

use std::sync::atomic::{AtomicU64, Ordering};

use batch_protocol::{EntityPath, Value};

static NEXT_SESSION_TAG: AtomicU64 = AtomicU64::new(1);

/// Process-unique marker of the session that minted a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SessionTag(u64);

impl SessionTag {
    pub(crate) fn fresh() -> Self {
        Self(NEXT_SESSION_TAG.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of a handle within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(pub(crate) u64);

/// A lightweight reference to a remote object.
///
/// Holds no remote state itself; cached property values live in the
/// [`RequestContext`](crate::RequestContext) that created the handle, keyed by
/// the handle's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyHandle {
    pub(crate) tag: SessionTag,
    pub(crate) id: HandleId,
    pub(crate) path: EntityPath,
}

impl ProxyHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The address the host resolves for this handle.
    pub fn path(&self) -> &EntityPath {
        &self.path
    }
}

/// Pass a handle as a method argument.
impl From<&ProxyHandle> for Value {
    fn from(handle: &ProxyHandle) -> Self {
        Value::Ref {
            entity: handle.path.clone(),
        }
    }
}
