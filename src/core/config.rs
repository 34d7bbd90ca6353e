use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use super::error::MigrateError;

/// Default number of change log entries fetched per replay round
pub const DEFAULT_PEEK_COUNT: usize = 1000;

/// Migration settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MigrateConfig {
    /// Upper bound on entries fetched by one replay round
    #[serde(default = "default_batch_cap")]
    pub batch_cap: usize,
    /// Schema holding shadow tables, shadow indexes and log tables
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Name of the capture trigger installed on the source table
    #[serde(default = "default_trigger_name")]
    pub trigger_name: String,
    /// Name prefix of auxiliary large-object storage relations
    #[serde(default = "default_toast_prefix")]
    pub toast_prefix: String,
}

fn default_batch_cap() -> usize { DEFAULT_PEEK_COUNT }
fn default_schema() -> String { "migrate".to_string() }
fn default_trigger_name() -> String { "migrate_trigger".to_string() }
fn default_toast_prefix() -> String { "pg_toast".to_string() }

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            batch_cap: default_batch_cap(),
            schema: default_schema(),
            trigger_name: default_trigger_name(),
            toast_prefix: default_toast_prefix(),
        }
    }
}

impl MigrateConfig {
    pub const CONFIG_PATHS: [&'static str; 2] = [
        "/etc/postgrust-migrate/migrate.toml",
        "./migrate.toml",
    ];

    /// Load configuration with priority: ENV > config file > defaults
    pub fn load() -> Result<Self, MigrateError> {
        let path = Self::CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists());
        Self::load_from(path)
    }

    /// Same as [`load`](Self::load) with an explicit (optional) config file
    pub fn load_from(path: Option<&Path>) -> Result<Self, MigrateError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
            tracing::debug!(path = %path.display(), "loaded migrate config file");
        }

        // PGR_MIGRATE_BATCH_CAP, PGR_MIGRATE_SCHEMA, ...
        builder = builder.add_source(Environment::with_prefix("PGR_MIGRATE").try_parsing(true));

        let config: Self = builder.build()?.try_deserialize()?;
        if config.batch_cap == 0 {
            return Err(MigrateError::Config(config::ConfigError::Message(
                "batch_cap must be positive".to_string(),
            )));
        }
        Ok(config)
    }

    /// Name of the shadow table built for `source`
    #[must_use]
    pub fn shadow_table_name(&self, source: super::Oid) -> String {
        format!("table_{source}")
    }

    /// Name of the shadow index built for `original`
    #[must_use]
    pub fn shadow_index_name(&self, original: super::Oid) -> String {
        format!("index_{original}")
    }

    /// Auxiliary storage relation name owned by `owner`
    #[must_use]
    pub fn toast_name(&self, owner: &str) -> String {
        format!("{}_{owner}", self.toast_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MigrateConfig::default();
        assert_eq!(config.batch_cap, 1000);
        assert_eq!(config.schema, "migrate");
        assert_eq!(config.trigger_name, "migrate_trigger");
        assert_eq!(config.toast_name("16384"), "pg_toast_16384");
        assert_eq!(config.shadow_index_name(super::super::Oid(42)), "index_42");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "batch_cap = 250").unwrap();
        writeln!(file, "schema = \"repack\"").unwrap();

        let config = MigrateConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.batch_cap, 250);
        assert_eq!(config.schema, "repack");
        assert_eq!(config.trigger_name, "migrate_trigger");
    }

    #[test]
    fn test_zero_batch_cap_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "batch_cap = 0").unwrap();

        assert!(matches!(
            MigrateConfig::load_from(Some(file.path())),
            Err(MigrateError::Config(_))
        ));
    }
}
