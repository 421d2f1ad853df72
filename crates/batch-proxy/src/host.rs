//! The remote host boundary.
//!
//! A [`Host`] executes whole batches: one `execute` call is one round trip.
//! Methods return boxed futures so the trait stays object safe and a session
//! can hold a `&mut dyn Host`.

use std::sync::Arc;

use batch_protocol::{HostInfo, LoadResult, Operation, SessionId};
use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::error::HostError;

/// Future returned by every [`Host`] method.
pub type HostFuture<'a, T> = BoxFuture<'a, Result<T, HostError>>;

/// Something that owns the real document state and executes batches.
pub trait Host: Send {
    /// Readiness exchange; reports which application is on the other side.
    fn handshake(&mut self) -> HostFuture<'_, HostInfo>;

    /// Open a host-side session. Objects created by `Invoke` operations are
    /// addressable only within the session that created them.
    fn open_session(&mut self) -> HostFuture<'_, SessionId>;

    /// Execute `ops` in order as one batch. Either every operation is
    /// applied and the values of every `Load` come back, or nothing is
    /// applied and one failure comes back.
    fn execute(
        &mut self,
        session: SessionId,
        ops: Vec<Operation>,
    ) -> HostFuture<'_, Vec<LoadResult>>;

    /// Discard a session. Best effort; hosts must not reply.
    fn release_session(&mut self, session: SessionId) -> HostFuture<'_, ()>;
}

/// A host shared by several concurrent sessions.
///
/// Each call holds the lock for one round trip only, so sessions interleave
/// at flush granularity. The underlying host arbitrates conflicts.
pub struct SharedHost<H> {
    inner: Arc<Mutex<H>>,
}

impl<H> Clone for SharedHost<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: Host> SharedHost<H> {
    pub fn new(host: H) -> Self {
        Self {
            inner: Arc::new(Mutex::new(host)),
        }
    }

    /// Run `f` with exclusive access to the host, e.g. to inspect its state.
    pub async fn with<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        let mut guard = self.inner.lock().await;
        f(&mut guard)
    }
}

impl<H: Host + 'static> Host for SharedHost<H> {
    fn handshake(&mut self) -> HostFuture<'_, HostInfo> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let mut host = inner.lock().await;
            host.handshake().await
        })
    }

    fn open_session(&mut self) -> HostFuture<'_, SessionId> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let mut host = inner.lock().await;
            host.open_session().await
        })
    }

    fn execute(
        &mut self,
        session: SessionId,
        ops: Vec<Operation>,
    ) -> HostFuture<'_, Vec<LoadResult>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let mut host = inner.lock().await;
            host.execute(session, ops).await
        })
    }

    fn release_session(&mut self, session: SessionId) -> HostFuture<'_, ()> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let mut host = inner.lock().await;
            host.release_session(session).await
        })
    }
}
