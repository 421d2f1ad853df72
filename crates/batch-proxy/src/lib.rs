//! Command-batching proxies over a remote document host.
//!
//! Remote objects are represented locally by [`ProxyHandle`]s. Work against
//! them is queued on a [`RequestContext`] and sent to the [`Host`] in one round
//! trip per [`RequestContext::sync`]. Values requested with
//! [`RequestContext::load`] are readable only after the sync that carried the
//! load completes.
//!
//! # Architecture
//!
//! ```text
//! Your unit of work
//!     └── open_session (this crate)      catch, log, apply ErrorPolicy
//!           └── RequestContext           queue, handles, property caches
//!                 └── dyn Host           one execute() per sync
//!                       ├── ProcessHost  JSON lines over a child's stdio
//!                       ├── SharedHost   several sessions, one host
//!                       └── MemoryHost   (sheet-host crate)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use batch_proxy::{open_session, ProcessHost, ProcessHostConfig, SessionOptions};
//!
//! # async fn example() -> Result<(), batch_proxy::SessionError> {
//! let mut host = ProcessHost::start(ProcessHostConfig::default())?;
//! let protected = open_session(&mut host, &SessionOptions::default(), |ctx| {
//!     Box::pin(async move {
//!         let sheets = ctx.navigate(&ctx.workbook(), "worksheets");
//!         let sheet = ctx.invoke(&sheets, "getActiveWorksheet", vec![]);
//!         let protection = ctx.navigate(&sheet, "protection");
//!         ctx.load(&protection, &["protected"]);
//!         ctx.sync().await?;
//!         Ok(ctx.get_bool(&protection, "protected")?)
//!     })
//! })
//! .await?;
//! println!("protected: {protected:?}");
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod handle;
pub mod host;
pub mod process;
pub mod session;

pub use batch_protocol::{
    EntityPath, HostInfo, HostType, LoadResult, OpId, Operation, RemoteErrorKind, RemoteFailure,
    Segment, SessionId, Value,
};
pub use context::RequestContext;
pub use error::{HostError, ProxyError, RemoteSyncError, SessionError, TransportError};
pub use handle::{HandleId, ProxyHandle};
pub use host::{Host, HostFuture, SharedHost};
pub use process::{ProcessHost, ProcessHostConfig};
pub use session::{open_session, ErrorPolicy, SessionFuture, SessionOptions};
