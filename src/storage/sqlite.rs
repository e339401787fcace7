//! SQLite storage implementation
//!
//! Every operation checks a connection out of the pool for its own duration;
//! the guard returns it on every exit path.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{named_params, OptionalExtension};
use crate::address::Jid;
use crate::config::{ensure_db_dir, DatabaseConfig, DatabaseLocation};
use crate::target::Target;
use crate::{Error, Result};
use super::schema;

const FILE_POOL_SIZE: u32 = 8;

/// SQLite-backed storage for push targets
pub struct TargetStore {
    pool: Pool<SqliteConnectionManager>,
}

impl TargetStore {
    /// Open the configured database and make sure the schema exists
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if config.has_credentials() {
            tracing::warn!(
                "database credentials supplied for {} are not used by sqlite",
                config.url
            );
        }

        let pool = match config.location()? {
            // A private in-memory database lives and dies with its one connection,
            // so that connection must never be recycled.
            DatabaseLocation::Memory => Pool::builder()
                .max_size(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .build(SqliteConnectionManager::memory())?,
            DatabaseLocation::File(path) => {
                ensure_db_dir(&path)?;
                Pool::builder()
                    .max_size(FILE_POOL_SIZE)
                    .build(SqliteConnectionManager::file(path))?
            }
        };

        let store = Self { pool };
        store.initialize_schema()?;
        tracing::info!("target store ready at {}", config.url);
        Ok(store)
    }

    /// Open a private in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&DatabaseConfig::in_memory())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, []).map_err(Error::Schema)?;
        }
        Ok(())
    }

    /// Insert a new target; an existing `(device, channel)` is an error
    pub fn create(&self, target: &Target) -> Result<()> {
        tracing::debug!(
            "creating target for device '{}' channel '{}' on {}",
            target.device, target.channel, target.service
        );
        let conn = self.conn()?;
        let query = format!(
            "INSERT INTO target ({cols})
             VALUES (:service, :device, :channel, :domain, :token, :node, :secret)",
            cols = schema::TARGET_COLUMNS,
        );
        conn.execute(
            &query,
            named_params! {
                ":service": target.service,
                ":device": target.device,
                ":channel": target.channel,
                ":domain": target.domain,
                ":token": target.token,
                ":node": target.node,
                ":secret": target.secret,
            },
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                return Error::Duplicate {
                    device: target.device.clone(),
                    channel: target.channel.clone(),
                };
            }
            Error::Storage(e)
        })?;
        Ok(())
    }

    /// First target registered under a relay `(domain, node)` pair, in no particular order
    pub fn find_by_node(&self, domain: &Jid, node: &str) -> Result<Option<Target>> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {cols} FROM target WHERE domain = :domain AND node = :node LIMIT 1",
            cols = schema::TARGET_COLUMNS,
        );
        conn.query_row(
            &query,
            named_params! { ":domain": domain, ":node": node },
            Target::from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// The target for a device channel on a service
    pub fn find(&self, service: &Jid, device: &str, channel: &str) -> Result<Option<Target>> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {cols} FROM target
             WHERE service = :service AND device = :device AND channel = :channel",
            cols = schema::TARGET_COLUMNS,
        );
        conn.query_row(
            &query,
            named_params! { ":service": service, ":device": device, ":channel": channel },
            Target::from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Replace the token of an existing target. Returns true iff exactly one row changed.
    pub fn update(&self, target: &Target) -> Result<bool> {
        self.update_token(&target.device, &target.channel, &target.token)
    }

    /// Same as [`update`](Self::update) without needing a full record
    pub fn update_token(&self, device: &str, channel: &str, token: &str) -> Result<bool> {
        tracing::debug!("updating token for device '{}' channel '{}'", device, channel);
        let conn = self.conn()?;
        let affected_rows = conn.execute(
            "UPDATE target SET token = :token WHERE device = :device AND channel = :channel",
            named_params! { ":token": token, ":device": device, ":channel": channel },
        )?;
        Ok(affected_rows == 1)
    }

    /// Remove one device channel. Returns true iff exactly one row was removed.
    pub fn delete(&self, device: &str, channel: &str) -> Result<bool> {
        tracing::debug!("deleting target for device '{}' channel '{}'", device, channel);
        let conn = self.conn()?;
        let affected_rows = conn.execute(
            "DELETE FROM target WHERE device = :device AND channel = :channel",
            named_params! { ":device": device, ":channel": channel },
        )?;
        Ok(affected_rows == 1)
    }

    /// Remove every channel of a device on a service.
    ///
    /// Returns true only when exactly one row was removed. A device with several
    /// channels has all of them deleted and still reports false.
    pub fn delete_by_service(&self, service: &Jid, device: &str) -> Result<bool> {
        tracing::debug!("deleting targets for device '{}' on {}", device, service);
        let conn = self.conn()?;
        let affected_rows = conn.execute(
            "DELETE FROM target WHERE device = :device AND service = :service",
            named_params! { ":device": device, ":service": service },
        )?;
        if affected_rows > 1 {
            tracing::debug!("removed {} channels for device '{}'", affected_rows, device);
        }
        Ok(affected_rows == 1)
    }

    /// Row counts
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let (targets, devices): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT device) FROM target",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(StoreStats {
            targets: targets as usize,
            devices: devices as usize,
        })
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub targets: usize,
    pub devices: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Target Statistics:")?;
        writeln!(f, "  Targets: {}", self.targets)?;
        write!(f, "  Devices: {}", self.devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jid(s: &str) -> Jid {
        Jid::parse(s).unwrap()
    }

    fn sample_target(service: &str, device: &str, channel: &str) -> Target {
        Target::new(jid(service), device, jid("push.example"), "tok1", "nodeX", "s3cr3t")
            .with_channel(channel)
    }

    #[test]
    fn test_create_then_find_by_node() {
        let store = TargetStore::open_in_memory().unwrap();
        let target = sample_target("svc1", "dev-A", "");

        store.create(&target).unwrap();

        let found = store.find_by_node(&jid("push.example"), "nodeX").unwrap().unwrap();
        assert_eq!(found, target);
    }

    #[test]
    fn test_create_then_find_by_device() {
        let store = TargetStore::open_in_memory().unwrap();
        let target = sample_target("svc1", "dev-A", "work");

        store.create(&target).unwrap();

        let found = store.find(&jid("svc1"), "dev-A", "work").unwrap().unwrap();
        assert_eq!(found, target);
        assert!(store.find(&jid("svc1"), "dev-A", "").unwrap().is_none());
        assert!(store.find(&jid("svc2"), "dev-A", "work").unwrap().is_none());
    }

    #[test]
    fn test_find_missing_is_none() {
        let store = TargetStore::open_in_memory().unwrap();
        assert!(store.find_by_node(&jid("push.example"), "nope").unwrap().is_none());
        assert!(store.find(&jid("svc1"), "dev-A", "").unwrap().is_none());
    }

    #[test]
    fn test_lookups_normalize_address_casing() {
        let store = TargetStore::open_in_memory().unwrap();
        let target = Target::new(
            jid("Alice@Chat.Example"),
            "dev-A",
            jid("PUSH.example"),
            "tok1",
            "nodeX",
            "s3cr3t",
        );
        store.create(&target).unwrap();

        let by_node = store.find_by_node(&jid("push.EXAMPLE"), "nodeX").unwrap().unwrap();
        assert_eq!(by_node.domain.to_string(), "push.example");
        let by_device = store.find(&jid("alice@chat.example"), "dev-A", "").unwrap();
        assert_eq!(by_device, Some(target));
    }

    #[test]
    fn test_domain_addresses_round_trip() {
        let store = TargetStore::open_in_memory().unwrap();
        assert!(Jid::domain("User@Chat.Example").is_err());
        assert!(Jid::domain("").is_err());

        let target = Target::new(
            Jid::domain("Chat.Example").unwrap(),
            "d",
            Jid::domain("Push.Example.").unwrap(),
            "tok1",
            "nodeX",
            "s3cr3t",
        );
        store.create(&target).unwrap();

        let found = store.find(&Jid::domain("chat.example").unwrap(), "d", "").unwrap();
        assert_eq!(found, Some(target.clone()));
        let by_node = store.find_by_node(&Jid::domain("push.example").unwrap(), "nodeX").unwrap();
        assert_eq!(by_node, Some(target));
    }

    #[test]
    fn test_duplicate_device_channel() {
        let store = TargetStore::open_in_memory().unwrap();

        store.create(&sample_target("svc1", "dev-A", "")).unwrap();
        let result = store.create(&sample_target("svc2", "dev-A", ""));

        assert!(matches!(
            result,
            Err(Error::Duplicate { ref device, ref channel }) if device == "dev-A" && channel.is_empty()
        ));
        // Different channel on the same device is fine
        store.create(&sample_target("svc1", "dev-A", "second")).unwrap();
    }

    #[test]
    fn test_update_token() {
        let store = TargetStore::open_in_memory().unwrap();
        let mut target = sample_target("svc1", "dev-A", "");
        store.create(&target).unwrap();

        target.token = "tok2".to_string();
        assert!(store.update(&target).unwrap());

        let found = store.find(&jid("svc1"), "dev-A", "").unwrap().unwrap();
        assert_eq!(found.token, "tok2");
        assert_eq!(found.secret, "s3cr3t");
    }

    #[test]
    fn test_update_missing_leaves_table_unchanged() {
        let store = TargetStore::open_in_memory().unwrap();
        let existing = sample_target("svc1", "dev-A", "");
        store.create(&existing).unwrap();

        let mut other = sample_target("svc1", "dev-B", "");
        other.token = "tok2".to_string();
        assert!(!store.update(&other).unwrap());

        assert_eq!(store.find(&jid("svc1"), "dev-A", "").unwrap(), Some(existing));
        assert_eq!(store.stats().unwrap().targets, 1);
    }

    #[test]
    fn test_delete_device_channel() {
        let store = TargetStore::open_in_memory().unwrap();
        store.create(&sample_target("svc1", "dev-A", "")).unwrap();

        assert!(store.delete("dev-A", "").unwrap());
        assert!(store.find(&jid("svc1"), "dev-A", "").unwrap().is_none());
        assert!(!store.delete("dev-A", "").unwrap());
    }

    #[test]
    fn test_delete_by_service_only_touches_that_service() {
        let store = TargetStore::open_in_memory().unwrap();
        store.create(&sample_target("svc1", "dev-A", "")).unwrap();
        store.create(&sample_target("svc2", "dev-A", "other")).unwrap();

        assert!(store.delete_by_service(&jid("svc1"), "dev-A").unwrap());
        assert!(store.find(&jid("svc1"), "dev-A", "").unwrap().is_none());
        assert!(store.find(&jid("svc2"), "dev-A", "other").unwrap().is_some());
        assert!(!store.delete_by_service(&jid("svc1"), "dev-A").unwrap());
    }

    #[test]
    fn test_delete_by_service_multiple_channels_reports_false() {
        let store = TargetStore::open_in_memory().unwrap();
        store.create(&sample_target("svc1", "dev-A", "")).unwrap();
        store.create(&sample_target("svc1", "dev-A", "second")).unwrap();

        // Both rows go, but the exactly-one-row contract reports false
        assert!(!store.delete_by_service(&jid("svc1"), "dev-A").unwrap());
        assert!(store.find(&jid("svc1"), "dev-A", "").unwrap().is_none());
        assert!(store.find(&jid("svc1"), "dev-A", "second").unwrap().is_none());
        assert_eq!(store.stats().unwrap().targets, 0);
    }

    #[test]
    fn test_stats() {
        let store = TargetStore::open_in_memory().unwrap();
        store.create(&sample_target("svc1", "dev-A", "")).unwrap();
        store.create(&sample_target("svc1", "dev-A", "second")).unwrap();
        store.create(&sample_target("svc1", "dev-B", "")).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats, StoreStats { targets: 3, devices: 2 });
        assert!(stats.to_string().contains("Targets: 3"));
    }

    #[test]
    fn test_file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("nested/p2.db").display());
        let config = DatabaseConfig::new(url);

        {
            let store = TargetStore::open(&config).unwrap();
            store.create(&sample_target("svc1", "dev-A", "")).unwrap();
        }

        // Reopening runs the idempotent schema statements again
        let store = TargetStore::open(&config).unwrap();
        assert!(store.find(&jid("svc1"), "dev-A", "").unwrap().is_some());
    }

    #[test]
    fn test_schema_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p2.db");
        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE target (id INTEGER PRIMARY KEY)").unwrap();
        }

        let config = DatabaseConfig::new(format!("sqlite://{}", path.display()));
        let result = TargetStore::open(&config);
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_rejects_unsupported_url() {
        let result = TargetStore::open(&DatabaseConfig::new("mysql://localhost/p2"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
