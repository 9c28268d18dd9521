use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the dump directory next to the database file
pub const DUMP_DIR_NAME: &str = "dumps";

pub const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = crate::storage::pool::DEFAULT_CACHE_CAPACITY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    pub database: Option<String>,
    pub dump_dir: Option<String>,
    /// Capacity of the connection's prepared statement cache
    pub statement_cache_capacity: usize,
    /// Reject items whose list or author name matches no stored row
    pub strict_references: bool,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            database: None,
            dump_dir: None,
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
            strict_references: true,
        }
    }
}

impl ShelfConfig {
    /// Database file; a relative configured path is taken from `base`
    pub fn database_path_in(&self, base: &Path) -> PathBuf {
        self.database
            .as_deref()
            .map(|path| base.join(path))
            .unwrap_or_else(|| default_database_path_in(base))
    }

    /// Dump directory; a relative configured path is taken from `base`
    pub fn dump_dir_in(&self, base: &Path) -> PathBuf {
        self.dump_dir
            .as_deref()
            .map(|dir| base.join(dir))
            .unwrap_or_else(|| default_dump_dir_in(base))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("shelfmark.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".shelfmark").join("shelfmark.db")
}

pub fn default_dump_dir_in(base: &Path) -> PathBuf {
    base.join(".shelfmark").join(DUMP_DIR_NAME)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ShelfConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ShelfConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &ShelfConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
