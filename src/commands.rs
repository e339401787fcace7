use crate::{emit_success, OutputMode};
use anyhow::Context;
use p2_targets::config::{write_config, DatabaseConfig, P2Config};
use p2_targets::ui::{self, Icons};
use p2_targets::{Jid, Target, TargetStore};
use std::path::Path;

pub struct CreateArgs {
    pub service: String,
    pub device: String,
    pub channel: String,
    pub domain: String,
    pub token: String,
    pub node: String,
    pub secret: String,
}

fn open_store(database: &DatabaseConfig) -> anyhow::Result<TargetStore> {
    TargetStore::open(database).with_context(|| format!("could not open target store at {}", database.url))
}

pub fn run_init(
    output_mode: OutputMode,
    config_path: &Path,
    config: &P2Config,
    force: bool,
) -> anyhow::Result<()> {
    write_config(config_path, &config_to_persist(config), force)?;
    open_store(&config.database)?;

    if output_mode.is_human() {
        ui::header("Initialized target store");
        ui::info("Config", &config_path.display().to_string());
        ui::info("Database", &config.database.url);
    } else {
        let data = serde_json::json!({
            "config": config_path.display().to_string(),
            "database": config.database.url,
        });
        emit_success(output_mode, "init", data)?;
    }
    Ok(())
}

/// The config `init` writes to disk; the password stays in the environment.
fn config_to_persist(config: &P2Config) -> P2Config {
    let mut persisted = config.clone();
    persisted.database.password = None;
    persisted
}

pub fn run_create(output_mode: OutputMode, database: &DatabaseConfig, args: CreateArgs) -> anyhow::Result<()> {
    let target = Target {
        service: Jid::parse(&args.service)?,
        device: args.device,
        channel: args.channel,
        domain: Jid::parse(&args.domain)?,
        token: args.token,
        node: args.node,
        secret: args.secret,
    };

    let store = open_store(database)?;
    store.create(&target)?;

    if output_mode.is_human() {
        ui::success(&format!("Registered {} {}", Icons::PHONE, describe(&target.device, &target.channel)));
    } else {
        emit_success(output_mode, "create", serde_json::to_value(&target)?)?;
    }
    Ok(())
}

pub fn run_find_node(
    output_mode: OutputMode,
    database: &DatabaseConfig,
    domain: &str,
    node: &str,
    reveal: bool,
) -> anyhow::Result<()> {
    let domain = Jid::parse(domain)?;
    let store = open_store(database)?;
    let found = store.find_by_node(&domain, node)?;
    report_found(output_mode, "find-node", found, reveal, &format!("node {} on {}", node, domain))
}

pub fn run_find(
    output_mode: OutputMode,
    database: &DatabaseConfig,
    service: &str,
    device: &str,
    channel: &str,
    reveal: bool,
) -> anyhow::Result<()> {
    let service = Jid::parse(service)?;
    let store = open_store(database)?;
    let found = store.find(&service, device, channel)?;
    report_found(
        output_mode,
        "find",
        found,
        reveal,
        &format!("{} on {}", describe(device, channel), service),
    )
}

fn report_found(
    output_mode: OutputMode,
    command: &str,
    found: Option<Target>,
    reveal: bool,
    what: &str,
) -> anyhow::Result<()> {
    if output_mode.is_human() {
        match &found {
            Some(target) => {
                println!("{} Target for {}", Icons::SEARCH, what);
                println!("{}", ui::target_table(target, reveal));
            }
            None => ui::warn(&format!("No target for {}", what)),
        }
    } else {
        let data = serde_json::json!({
            "found": found.is_some(),
            "target": found,
        });
        emit_success(output_mode, command, data)?;
    }
    Ok(())
}

pub fn run_update(
    output_mode: OutputMode,
    database: &DatabaseConfig,
    device: &str,
    channel: &str,
    token: &str,
) -> anyhow::Result<()> {
    let store = open_store(database)?;
    let updated = store.update_token(device, channel, token)?;

    if output_mode.is_human() {
        if updated {
            ui::success(&format!("{} Token updated for {}", Icons::KEY, describe(device, channel)));
        } else {
            ui::warn(&format!("No target for {}", describe(device, channel)));
        }
    } else {
        emit_success(output_mode, "update", serde_json::json!({ "updated": updated }))?;
    }
    Ok(())
}

pub fn run_delete(
    output_mode: OutputMode,
    database: &DatabaseConfig,
    device: &str,
    channel: &str,
) -> anyhow::Result<()> {
    let store = open_store(database)?;
    let deleted = store.delete(device, channel)?;
    report_deleted(output_mode, "delete", deleted, &describe(device, channel))
}

pub fn run_delete_device(
    output_mode: OutputMode,
    database: &DatabaseConfig,
    service: &str,
    device: &str,
) -> anyhow::Result<()> {
    let service = Jid::parse(service)?;
    let store = open_store(database)?;
    let deleted = store.delete_by_service(&service, device)?;
    report_deleted(
        output_mode,
        "delete-device",
        deleted,
        &format!("device '{}' on {}", device, service),
    )
}

fn report_deleted(output_mode: OutputMode, command: &str, deleted: bool, what: &str) -> anyhow::Result<()> {
    if output_mode.is_human() {
        if deleted {
            ui::success(&format!("{} Removed {}", Icons::DEL, what));
        } else {
            ui::warn(&format!("Did not remove exactly one target for {}", what));
        }
    } else {
        emit_success(output_mode, command, serde_json::json!({ "deleted": deleted }))?;
    }
    Ok(())
}

pub fn run_stats(output_mode: OutputMode, database: &DatabaseConfig) -> anyhow::Result<()> {
    let store = open_store(database)?;
    let stats = store.stats()?;

    if output_mode.is_human() {
        ui::section(&format!("{} Target Store", Icons::STATS));
        ui::summary_row(&format!("{} Database", Icons::DATABASE), &database.url);
        ui::summary_row("Targets", &stats.targets.to_string());
        ui::summary_row("Devices", &stats.devices.to_string());
    } else {
        emit_success(output_mode, "stats", serde_json::to_value(stats)?)?;
    }
    Ok(())
}

fn describe(device: &str, channel: &str) -> String {
    if channel.is_empty() {
        format!("device '{}'", device)
    } else {
        format!("device '{}' channel '{}'", device, channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p2_targets::config::load_config;

    #[test]
    fn test_init_does_not_write_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p2.toml");
        let mut config = P2Config::default();
        config.database.url = format!("sqlite://{}", dir.path().join("p2.db").display());
        config.database.username = Some("p2".to_string());
        config.database.password = Some("hunter2".to_string());

        run_init(OutputMode::Json, &path, &config, false).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("hunter2"));
        assert!(!contents.contains("password"));
        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database.username.as_deref(), Some("p2"));
        assert!(loaded.database.password.is_none());
        assert!(dir.path().join("p2.db").exists());
    }
}
