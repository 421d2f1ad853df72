//! A spreadsheet add-in built on command-batching proxies.
//!
//! Task pane actions build an expenses table, filter and sort it, chart it,
//! freeze its header and toggle worksheet protection. Each action is one
//! batch session: it queues work on typed proxies and syncs explicitly.
//!
//! ```rust,no_run
//! use sheet_addin::{Action, AddIn};
//! # async fn example(host: impl batch_proxy::Host) -> sheet_addin::Result<()> {
//! let mut addin = AddIn::new(host);
//! addin.initialize().await?;
//! addin.run(Action::CreateTable).await?;
//! addin.execute_command("toggleProtection").await?;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod addin;
pub mod dialog;
pub mod error;
pub mod proxies;
pub mod readiness;
pub mod registry;

pub use addin::{try_catch, Action, AddIn};
pub use dialog::{open_dialog, DialogChild, DialogEvent, DialogParent};
pub use error::{AddInError, NotReadyError, Result};
pub use readiness::ReadinessGate;
pub use registry::{ActionEvent, ActionRegistry, CommandHandler, Notification, NotificationKind, Notifications};
