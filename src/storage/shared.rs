//! Lazily opened, shared target store
//!
//! Prefer constructing a [`TargetStore`] and handing it to whoever needs it.
//! These wrappers exist for callers that only have configuration and want
//! every user in the process to see the same schema-ready store.

use std::sync::atomic::{AtomicUsize, Ordering};
use once_cell::sync::OnceCell;
use crate::config::DatabaseConfig;
use crate::Result;
use super::sqlite::TargetStore;

static GLOBAL: OnceCell<TargetStore> = OnceCell::new();

/// A store opened on first access, exactly once.
///
/// Concurrent first callers block until the single open finishes. A failed
/// open is returned to the caller that triggered it and leaves the cell empty,
/// so the next access tries again.
pub struct SharedTargetStore {
    config: DatabaseConfig,
    cell: OnceCell<TargetStore>,
    opens: AtomicUsize,
}

impl SharedTargetStore {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
            opens: AtomicUsize::new(0),
        }
    }

    /// The store, opening it and bootstrapping the schema if this is the first access
    pub fn get(&self) -> Result<&TargetStore> {
        self.cell.get_or_try_init(|| {
            self.opens.fetch_add(1, Ordering::SeqCst);
            TargetStore::open(&self.config)
        })
    }

    /// Whether the store has been opened
    pub fn is_open(&self) -> bool {
        self.cell.get().is_some()
    }

    /// How many times an open (and schema bootstrap) was attempted
    pub fn open_attempts(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

/// Process-wide store.
///
/// The first successful call opens the store with `config`; later calls
/// return that same store and ignore their argument.
pub fn global(config: &DatabaseConfig) -> Result<&'static TargetStore> {
    GLOBAL.get_or_try_init(|| TargetStore::open(config))
}
