//! Handles settings for the application.
//!
//! Sources, later ones winning:
//! - `settings.toml` in the working directory (optional)
//! - environment variables prefixed with `DOTS`, nested keys joined by
//!   `__` (e.g. `DOTS__APP__LEVEL=debug`)
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! [database]
//! sqlite = "./dots.db"   # or: database = "memory"
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_SQLITE_PATH: &str = "./dots.db";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Database::Sqlite(DEFAULT_SQLITE_PATH.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("DOTS").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_sqlite_file() {
        let settings = Settings::default();
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database.url(), "sqlite:./dots.db?mode=rwc");
    }

    #[test]
    fn memory_database_is_a_unit_variant() {
        let settings: Settings = Config::builder()
            .add_source(config::File::from_str(
                "database = \"memory\"\n[app]\nlevel = \"debug\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.database, Database::Memory);
        assert_eq!(settings.app.level, "debug");
    }
}
