//! The request context: one batch session's queue, handles and caches.

use std::collections::{BTreeMap, HashMap, HashSet};

use batch_protocol::{
    EntityPath, OpId, Operation, RemoteErrorKind, RemoteFailure, Segment, SessionId, Value,
};

use crate::error::{HostError, ProxyError, RemoteSyncError, TransportError};
use crate::handle::{HandleId, ProxyHandle, SessionTag};
use crate::host::Host;

/// Queues operations against remote objects and flushes them on [`sync`].
///
/// Navigation, loads, mutations and invocations are local and never suspend.
/// Only [`sync`] talks to the host.
///
/// [`sync`]: RequestContext::sync
pub struct RequestContext<'h> {
    host: &'h mut dyn Host,
    session: SessionId,
    tag: SessionTag,
    next_handle: u64,
    next_op: u64,
    queue: Vec<Operation>,
    /// Loads in `queue`, mapped to the handle whose cache they fill.
    queued_loads: HashMap<OpId, HandleId>,
    completed_loads: HashSet<OpId>,
    cache: HashMap<HandleId, BTreeMap<String, Value>>,
    /// First queued op that referenced a handle from another session.
    foreign_op: Option<OpId>,
    round_trips: usize,
}

impl<'h> RequestContext<'h> {
    pub(crate) fn new(host: &'h mut dyn Host, session: SessionId) -> Self {
        Self {
            host,
            session,
            tag: SessionTag::fresh(),
            // 0 is the workbook root
            next_handle: 1,
            next_op: 0,
            queue: Vec::new(),
            queued_loads: HashMap::new(),
            completed_loads: HashSet::new(),
            cache: HashMap::new(),
            foreign_op: None,
            round_trips: 0,
        }
    }

    /// The host-side session this context flushes into.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Handle to the session's workbook.
    pub fn workbook(&self) -> ProxyHandle {
        ProxyHandle {
            tag: self.tag,
            id: HandleId(0),
            path: EntityPath::workbook(),
        }
    }

    /// A new handle addressing `segment` relative to `parent`. Local only.
    pub fn navigate(&mut self, parent: &ProxyHandle, segment: impl Into<Segment>) -> ProxyHandle {
        ProxyHandle {
            tag: parent.tag,
            id: self.next_handle_id(),
            path: parent.path.child(segment.into()),
        }
    }

    /// Queue a fetch of `properties` on `handle`. The values become readable
    /// through this handle once the next [`sync`](Self::sync) completes.
    ///
    /// Returns the load's id, which [`is_load_complete`](Self::is_load_complete)
    /// accepts.
    pub fn load(&mut self, handle: &ProxyHandle, properties: &[&str]) -> OpId {
        let id = self.next_op_id();
        self.check_owner(handle, id);
        self.queued_loads.insert(id, handle.id);
        self.enqueue(Operation::Load {
            id,
            target: handle.path.clone(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
        });
        id
    }

    /// Queue a property assignment.
    pub fn set(&mut self, handle: &ProxyHandle, property: &str, value: impl Into<Value>) -> OpId {
        let id = self.next_op_id();
        self.check_owner(handle, id);
        self.enqueue(Operation::Set {
            id,
            target: handle.path.clone(),
            property: property.to_string(),
            value: value.into(),
        });
        id
    }

    /// Queue a method call and return a handle to whatever it returns.
    ///
    /// The returned handle is usable immediately for further queued work,
    /// e.g. naming a table that `tables.add(...)` will create.
    pub fn invoke(&mut self, handle: &ProxyHandle, method: &str, args: Vec<Value>) -> ProxyHandle {
        let id = self.next_op_id();
        self.check_owner(handle, id);
        self.enqueue(Operation::Invoke {
            id,
            target: handle.path.clone(),
            method: method.to_string(),
            args,
        });
        ProxyHandle {
            tag: handle.tag,
            id: self.next_handle_id(),
            path: EntityPath::op_result(id),
        }
    }

    /// Send everything queued since the last sync in one round trip.
    ///
    /// On success, every load in the batch updates its handle's cache. On
    /// failure no cache changes. Either way the sent operations leave the
    /// queue. An empty queue costs nothing.
    pub async fn sync(&mut self) -> Result<(), HostError> {
        if let Some(op) = self.foreign_op.take() {
            let discarded = self.take_queue().0.len();
            tracing::debug!(session = %self.session, discarded, "batch references a foreign handle");
            return Err(RemoteSyncError::new(
                RemoteFailure::new(
                    RemoteErrorKind::StaleHandle,
                    "handle belongs to a different session",
                )
                .at(op),
            )
            .into());
        }

        if self.queue.is_empty() {
            tracing::trace!(session = %self.session, "nothing queued, skipping round trip");
            return Ok(());
        }

        let (ops, loads) = self.take_queue();
        tracing::debug!(session = %self.session, ops = ops.len(), "flushing batch");
        for op in &ops {
            tracing::trace!("{op}");
        }

        self.round_trips += 1;
        let results = self.host.execute(self.session, ops).await?;

        // Validate the whole reply before touching any cache.
        let mut updates = Vec::with_capacity(results.len());
        for result in results {
            let handle = loads.get(&result.op).copied().ok_or_else(|| {
                TransportError::UnexpectedResponse(format!(
                    "values for {} which was not a load in this batch",
                    result.op
                ))
            })?;
            updates.push((result.op, handle, result.values));
        }

        for (op, handle, values) in updates {
            self.cache.entry(handle).or_default().extend(values);
            self.completed_loads.insert(op);
        }
        Ok(())
    }

    /// The cached value of `property` on `handle`.
    ///
    /// Fails with [`ProxyError::NotLoaded`] unless a load of exactly this
    /// property on this handle was carried by a completed sync.
    pub fn get(&self, handle: &ProxyHandle, property: &str) -> Result<&Value, ProxyError> {
        if handle.tag != self.tag {
            return Err(ProxyError::ForeignHandle {
                path: handle.path.to_string(),
            });
        }
        self.cache
            .get(&handle.id)
            .and_then(|values| values.get(property))
            .ok_or_else(|| ProxyError::NotLoaded {
                path: handle.path.to_string(),
                property: property.to_string(),
            })
    }

    pub fn get_bool(&self, handle: &ProxyHandle, property: &str) -> Result<bool, ProxyError> {
        let value = self.get(handle, property)?;
        value
            .as_bool()
            .ok_or_else(|| type_mismatch(handle, property, "bool", value))
    }

    pub fn get_f64(&self, handle: &ProxyHandle, property: &str) -> Result<f64, ProxyError> {
        let value = self.get(handle, property)?;
        value
            .as_f64()
            .ok_or_else(|| type_mismatch(handle, property, "number", value))
    }

    pub fn get_str(&self, handle: &ProxyHandle, property: &str) -> Result<&str, ProxyError> {
        let value = self.get(handle, property)?;
        value
            .as_str()
            .ok_or_else(|| type_mismatch(handle, property, "string", value))
    }

    pub fn is_loaded(&self, handle: &ProxyHandle, property: &str) -> bool {
        self.get(handle, property).is_ok()
    }

    /// Whether the load `op` has been carried by a successful sync.
    pub fn is_load_complete(&self, op: OpId) -> bool {
        self.completed_loads.contains(&op)
    }

    /// Operations queued and not yet sent.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Round trips made by [`sync`](Self::sync) so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips
    }

    /// Drop everything still queued, returning how many operations that was.
    pub(crate) fn discard_pending(&mut self) -> usize {
        self.foreign_op = None;
        self.take_queue().0.len()
    }

    pub(crate) fn host(&mut self) -> &mut dyn Host {
        &mut *self.host
    }

    fn take_queue(&mut self) -> (Vec<Operation>, HashMap<OpId, HandleId>) {
        (
            std::mem::take(&mut self.queue),
            std::mem::take(&mut self.queued_loads),
        )
    }

    fn enqueue(&mut self, op: Operation) {
        self.queue.push(op);
    }

    fn check_owner(&mut self, handle: &ProxyHandle, op: OpId) {
        if handle.tag != self.tag && self.foreign_op.is_none() {
            tracing::warn!(path = %handle.path, "handle from another session used in {op}");
            self.foreign_op = Some(op);
        }
    }

    fn next_op_id(&mut self) -> OpId {
        let id = OpId(self.next_op);
        self.next_op += 1;
        id
    }

    fn next_handle_id(&mut self) -> HandleId {
        let id = HandleId(self.next_handle);
        self.next_handle += 1;
        id
    }
}

fn type_mismatch(
    handle: &ProxyHandle,
    property: &str,
    expected: &'static str,
    actual: &Value,
) -> ProxyError {
    ProxyError::TypeMismatch {
        path: handle.path.to_string(),
        property: property.to_string(),
        expected,
        actual: actual.type_name(),
    }
}
