//! Point-in-time snapshots of live SQLite databases.
//!
//! [`acquire`] takes a consistent copy of a database that may be under
//! concurrent write, using one of two [`Strategy`]s. The resulting
//! [`Snapshot`] owns its file (deleting it on drop) and can be streamed back
//! as fixed-size [`Page`]s in file order.

mod db;
pub mod error;
mod online;
mod pages;
mod snapshot;
mod strategy;

pub use crate::db::{Geometry, geometry};
pub use crate::pages::{Page, read_pages};
pub use crate::snapshot::{Snapshot, acquire};
pub use crate::strategy::Strategy;
