//! p2-targets CLI - inspect and maintain the push target store

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use p2_targets::config::{load_config, P2Config};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "p2-targets")]
#[command(version)]
#[command(about = "Push target store - device registrations mapped to push relay coordinates")]
#[command(long_about = r#"
p2-targets maintains the table that maps device push registrations to the
node/domain pairs a push relay uses to reach them.

Example usage:
  p2-targets init --db-url sqlite://p2.db
  p2-targets create --service svc1 --device dev-A --domain push.example \
      --token tok1 --node nodeX --secret s3cr3t
  p2-targets find-node --domain push.example --node nodeX
  p2-targets update --device dev-A --token tok2
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(long, global = true, default_value = "p2.toml")]
    config: PathBuf,

    /// Database URL (overrides the config file)
    #[arg(long, global = true, env = "P2_DB_URL")]
    db_url: Option<String>,

    /// Database username (overrides the config file)
    #[arg(long, global = true, env = "P2_DB_USERNAME")]
    db_username: Option<String>,

    /// Database password (overrides the config file)
    #[arg(long, global = true, env = "P2_DB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the schema
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Register a new target
    Create {
        #[arg(short, long)]
        service: String,

        #[arg(short, long)]
        device: String,

        /// Channel of the device (empty for the default channel)
        #[arg(short, long, default_value = "")]
        channel: String,

        /// Domain owning the relay endpoint
        #[arg(long)]
        domain: String,

        #[arg(short, long)]
        token: String,

        /// Relay node identifier
        #[arg(short, long)]
        node: String,

        #[arg(long)]
        secret: String,
    },

    /// Find the target behind a relay node
    FindNode {
        #[arg(long)]
        domain: String,

        #[arg(short, long)]
        node: String,

        /// Show the secret in human output
        #[arg(long)]
        reveal: bool,
    },

    /// Find the target of a device channel on a service
    Find {
        #[arg(short, long)]
        service: String,

        #[arg(short, long)]
        device: String,

        #[arg(short, long, default_value = "")]
        channel: String,

        /// Show the secret in human output
        #[arg(long)]
        reveal: bool,
    },

    /// Replace the push token of a device channel
    Update {
        #[arg(short, long)]
        device: String,

        #[arg(short, long, default_value = "")]
        channel: String,

        #[arg(short, long)]
        token: String,
    },

    /// Remove one device channel
    Delete {
        #[arg(short, long)]
        device: String,

        #[arg(short, long, default_value = "")]
        channel: String,
    },

    /// Remove every channel of a device on a service
    DeleteDevice {
        #[arg(short, long)]
        service: String,

        #[arg(short, long)]
        device: String,
    },

    /// Show statistics about the store
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

pub fn emit_success(
    output_mode: OutputMode,
    command: &str,
    data: serde_json::Value,
) -> anyhow::Result<()> {
    if output_mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn emit_error(output_mode: OutputMode, e: &anyhow::Error) {
    match output_mode {
        OutputMode::Human => p2_targets::ui::error(&format!("{:#}", e)),
        OutputMode::Json => {
            let envelope = serde_json::json!({ "ok": false, "error": format!("{:#}", e) });
            println!("{}", envelope);
        }
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<P2Config> {
    let mut config = load_config(Some(&cli.config))?.unwrap_or_default();
    if let Some(url) = &cli.db_url {
        config.database.url = url.clone();
    }
    if let Some(username) = &cli.db_username {
        config.database.username = Some(username.clone());
    }
    if let Some(password) = &cli.db_password {
        config.database.password = Some(password.clone());
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let config = resolve_config(&cli)?;
    tracing::debug!("using {:?}", config.database);

    let result = match cli.command {
        Commands::Init { force } => commands::run_init(output_mode, &cli.config, &config, force),
        Commands::Create { service, device, channel, domain, token, node, secret } => {
            let args = commands::CreateArgs { service, device, channel, domain, token, node, secret };
            commands::run_create(output_mode, &config.database, args)
        }
        Commands::FindNode { domain, node, reveal } => {
            commands::run_find_node(output_mode, &config.database, &domain, &node, reveal)
        }
        Commands::Find { service, device, channel, reveal } => {
            commands::run_find(output_mode, &config.database, &service, &device, &channel, reveal)
        }
        Commands::Update { device, channel, token } => {
            commands::run_update(output_mode, &config.database, &device, &channel, &token)
        }
        Commands::Delete { device, channel } => {
            commands::run_delete(output_mode, &config.database, &device, &channel)
        }
        Commands::DeleteDevice { service, device } => {
            commands::run_delete_device(output_mode, &config.database, &service, &device)
        }
        Commands::Stats => commands::run_stats(output_mode, &config.database),
    };

    if let Err(e) = result {
        emit_error(output_mode, &e);
        std::process::exit(1);
    }
    Ok(())
}
