//! Target - a device's push delivery registration
//!
//! A target ties a device registration on a messaging service to the
//! coordinates the push relay uses to reach it:
//! - `(device, channel)` identifies the registration
//! - `(node, domain)` is how the relay looks it back up
//! - `token` is refreshed whenever the push provider reissues credentials

use crate::address::Jid;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// A persisted push registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Messaging service / account the registration came from
    pub service: Jid,
    /// Registering device or client instance
    pub device: String,
    /// Distinguishes several registrations of one device; empty when unused
    #[serde(default)]
    pub channel: String,
    /// Domain owning the relay endpoint
    pub domain: Jid,
    /// Push token issued by the provider
    pub token: String,
    /// Relay node identifier
    pub node: String,
    /// Shared secret for relay callbacks
    pub secret: String,
}

impl Target {
    /// Create a target on the default (empty) channel
    pub fn new(
        service: Jid,
        device: impl Into<String>,
        domain: Jid,
        token: impl Into<String>,
        node: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            service,
            device: device.into(),
            channel: String::new(),
            domain,
            token: token.into(),
            node: node.into(),
            secret: secret.into(),
        }
    }

    /// Put the target on a specific channel
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Materialize a target from a row selected with [`crate::storage::schema::TARGET_COLUMNS`]
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Target {
            service: row.get("service")?,
            device: row.get("device")?,
            channel: row.get("channel")?,
            domain: row.get("domain")?,
            token: row.get("token")?,
            node: row.get("node")?,
            secret: row.get("secret")?,
        })
    }
}
