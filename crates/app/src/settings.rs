//! Settings for `rollup_admin`, read from `settings.toml` (or the file given
//! with `--config`) and from `ROLLUP__*` environment variables.
//!
//! ```toml
//! [app]
//! level = "debug"
//!
//! [database]
//! sqlite = "./rollup.db"
//!
//! [cache]
//! backend = "sql"
//! namespace = "erp"
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: String::from("info"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
    Url(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite(String::from("./rollup.db"))
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
            Database::Url(url) => url.clone(),
        }
    }
}

/// Where the Aggregate Store lives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process memory; every run starts cold.
    Memory,
    /// Tables in the same database as the ledger.
    #[default]
    Sql,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
    pub backend: CacheBackend,
    pub namespace: String,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            namespace: String::from(rollup::DEFAULT_NAMESPACE),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub cache: Cache,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("ROLLUP").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::new("does-not-exist").unwrap();
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database.url(), "sqlite:./rollup.db?mode=rwc");
        assert_eq!(settings.cache.backend, CacheBackend::Sql);
        assert_eq!(settings.cache.namespace, "erp");
    }

    #[test]
    fn database_variants_build_urls() {
        assert_eq!(Database::Memory.url(), "sqlite::memory:");
        assert_eq!(
            Database::Url(String::from("sqlite:/tmp/x.db")).url(),
            "sqlite:/tmp/x.db"
        );
    }
}
