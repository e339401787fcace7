//! Database schema definitions

/// SQL to create the target table
pub const CREATE_TARGET_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS target (
    service TEXT,
    device TEXT NOT NULL,
    channel TEXT NOT NULL DEFAULT '',
    domain TEXT,
    token TEXT,
    node TEXT,
    secret TEXT,
    PRIMARY KEY(device, channel)
)
"#;

/// Reverse lookup from the relay side, not unique
pub const CREATE_NODE_DOMAIN_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS nodeDomain ON target(node, domain)";

/// Columns selected whenever a full target is materialized
pub const TARGET_COLUMNS: &str = "service, device, channel, domain, token, node, secret";

/// All schema creation statements, in order
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_TARGET_TABLE, CREATE_NODE_DOMAIN_INDEX]
}
