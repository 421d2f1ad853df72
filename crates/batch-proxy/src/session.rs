//! Batch sessions: run a unit of work and contain its failure.

use futures::future::BoxFuture;
use tracing::Instrument;

use crate::context::RequestContext;
use crate::error::SessionError;
use crate::host::Host;

/// What the session boundary does with a failure after logging it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Log and return `Ok(None)`; the caller's caller never sees the error.
    #[default]
    LogAndSwallow,
    /// Log and return the error.
    Propagate,
}

/// Configuration for one [`open_session`] call.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Name used in log records for this unit of work.
    pub label: String,
    pub policy: ErrorPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            label: "session".to_string(),
            policy: ErrorPolicy::default(),
        }
    }
}

impl SessionOptions {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Future returned by a session body.
pub type SessionFuture<'c, T> = BoxFuture<'c, Result<T, SessionError>>;

/// Open a session on `host`, run `body` against it, and tear it down.
///
/// The body queues work on handles derived from the context and calls
/// [`RequestContext::sync`] wherever it needs a flush. Work still queued when
/// the body returns is discarded, never flushed.
///
/// Returns `Ok(Some(value))` when the body succeeds. Failures from opening
/// the session, from the body, or from any sync are logged here; then
/// [`ErrorPolicy::LogAndSwallow`] turns them into `Ok(None)` and
/// [`ErrorPolicy::Propagate`] returns them.
///
/// ```rust,ignore
/// open_session(&mut host, &SessionOptions::default(), |ctx| {
///     Box::pin(async move {
///         let sheet = ctx.workbook();
///         ctx.load(&sheet, &["name"]);
///         ctx.sync().await?;
///         Ok(ctx.get_str(&sheet, "name")?.to_string())
///     })
/// })
/// .await
/// ```
pub async fn open_session<'h, T, F>(
    host: &'h mut dyn Host,
    options: &SessionOptions,
    body: F,
) -> Result<Option<T>, SessionError>
where
    F: for<'c> FnOnce(&'c mut RequestContext<'h>) -> SessionFuture<'c, T>,
{
    let span = tracing::info_span!("session", label = %options.label);
    let outcome = run_session(host, body).instrument(span.clone()).await;

    match outcome {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            span.in_scope(|| tracing::error!(error = %err, "session failed"));
            match options.policy {
                ErrorPolicy::LogAndSwallow => Ok(None),
                ErrorPolicy::Propagate => Err(err),
            }
        }
    }
}

async fn run_session<'h, T, F>(host: &'h mut dyn Host, body: F) -> Result<T, SessionError>
where
    F: for<'c> FnOnce(&'c mut RequestContext<'h>) -> SessionFuture<'c, T>,
{
    let session = host.open_session().await?;
    tracing::debug!(%session, "session opened");

    let mut ctx = RequestContext::new(host, session);
    let result = body(&mut ctx).await;

    let discarded = ctx.discard_pending();
    if discarded > 0 {
        tracing::debug!(%session, discarded, "discarding operations queued after the last sync");
    }
    if let Err(e) = ctx.host().release_session(session).await {
        tracing::warn!(%session, error = %e, "failed to release session");
    }
    tracing::debug!(%session, round_trips = ctx.round_trips(), "session closed");

    result
}
