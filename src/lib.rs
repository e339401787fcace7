//! # p2-targets - Push target store
//!
//! Persistence for push registrations: which device channel on which
//! messaging service is reachable through which push relay node.
//!
//! p2-targets provides:
//! - `Target` records keyed by `(device, channel)`
//! - Canonical `Jid` addresses for the `service` and `domain` columns
//! - A pooled SQLite `TargetStore` that bootstraps its own schema
//! - A lazily opened `SharedTargetStore` for process-wide use

pub mod address;
pub mod target;
pub mod storage;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use address::Jid;
pub use target::Target;
pub use storage::{SharedTargetStore, StoreStats, TargetStore};
pub use config::{DatabaseConfig, P2Config};

/// Result type alias for target store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for target store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(#[from] r2d2::Error),

    #[error("Schema error: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Target already exists for device '{device}' channel '{channel}'")]
    Duplicate { device: String, channel: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
