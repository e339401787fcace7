use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct P2Config {
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Connection parameters for the target database.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Where a database URL points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }

    /// Resolve the URL to an in-memory or file database
    ///
    /// Accepts `sqlite://path`, `sqlite:path`, `jdbc:sqlite:path` or a bare path.
    pub fn location(&self) -> Result<DatabaseLocation> {
        let url = self.url.trim();
        let rest = url.strip_prefix("jdbc:").unwrap_or(url);
        let path = match rest.strip_prefix("sqlite:") {
            Some(p) => p.strip_prefix("//").unwrap_or(p),
            None if rest.contains("://") => {
                return Err(Error::Config(format!("unsupported database url: {}", url)));
            }
            None => rest,
        };

        match path {
            "" => Err(Error::Config(format!("database url has no path: {}", url))),
            ":memory:" => Ok(DatabaseLocation::Memory),
            p => Ok(DatabaseLocation::File(PathBuf::from(p))),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new(default_database_url())
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub fn default_database_url() -> String {
    "sqlite://p2.db".to_string()
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("p2.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<P2Config>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: P2Config = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &P2Config, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
