//! Storage Layer - SQLite-backed persistence
//!
//! System of record is a single SQLite table:
//! - target(service, device, channel, domain, token, node, secret)
//!
//! keyed by `(device, channel)` with a secondary index on `(node, domain)`.

pub mod schema;
pub mod shared;
pub mod sqlite;

pub use shared::{global, SharedTargetStore};
pub use sqlite::{StoreStats, TargetStore};
