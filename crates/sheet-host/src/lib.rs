//! An in-memory spreadsheet host.
//!
//! [`MemoryHost`] keeps a [`Workbook`] of worksheets, tables and charts and
//! executes operation batches against it: tables are created, filled,
//! filtered and sorted; charts are added and formatted; worksheets are
//! protected and their panes frozen. Each batch is atomic.
//!
//! The host implements [`batch_proxy::Host`] for in-process use. The
//! `sheet-host` binary serves the same host over stdin/stdout so it can be
//! driven by a [`batch_proxy::ProcessHost`].

pub mod address;
pub mod engine;
pub mod error;
pub mod host;
pub mod model;
pub mod server;

pub use address::{CellAddress, RangeAddress};
pub use error::ServeError;
pub use host::{MemoryHost, HOST_VERSION};
pub use model::{Chart, Table, Workbook, Worksheet};
pub use server::serve;
