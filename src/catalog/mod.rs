//! Link Catalog
//!
//! Named groups of links. Listings are always ordered by `sort_order`, and a
//! group without links still carries an empty `links` array.
//!
//! # Usage
//!
//! ```rust,ignore
//! use linkdeck::catalog;
//!
//! let app = Router::new()
//!     .nest("/api", catalog::routes())
//!     .with_state(app_state);
//!
//! let conn = db.connect().await?;
//! let groups = catalog::Catalog::new(&conn).list_groups().await?;
//! ```

mod handler;
mod lib;
mod routes;

pub use lib::*;

pub use routes::routes;
