//! Import / Export
//!
//! Moves the whole link catalog in and out as a single JSON document.
//!
//! - Export keeps group and link ids for reference and drops timestamps
//! - Import matches groups by name, replaces the links of groups that already
//!   exist and creates the rest, inside one transaction
//!
//! # Usage
//!
//! ```rust,ignore
//! use linkdeck::transfer::{ExportDocument, Transfer};
//!
//! let conn = db.connect().await?;
//! let doc = Transfer::new(&conn).export().await?;
//!
//! let other = db.connect().await?;
//! let summary = Transfer::new(&other).import(&doc).await?;
//! ```

mod handler;
mod lib;
mod routes;

pub use lib::*;

pub use routes::{MAX_IMPORT_BYTES, routes};
