//! Building `LayeredConfig` for a CLI invocation, and the `config show|init|validate`
//! subcommand's on-disk TOML file (spec §6.3).

use crate::errors::write_failed;
use geodash_core::config::{CliConfigOverrides, LayeredConfig};
use geodash_core::error::Result;
use std::path::Path;

/// Layers defaults -> file at `path` (if it exists) -> environment -> `--db-uri`, matching
/// the precedence `LayeredConfig` enforces internally.
pub fn load(path: &Path, db_uri: Option<String>) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();
    if path.exists() {
        config = config.load_from_file(path)?;
    }
    config = config.load_from_env();
    config.update_from_cli(CliConfigOverrides { db_uri, mode: None });
    Ok(config)
}

/// The file `config init` writes: every key from spec §6.3 at its default value, so `config
/// show`/`config validate` have something to layer over immediately.
pub const DEFAULT_CONFIG_TOML: &str = r#"mode = "full"

[database]
type = "embedded-file"
spatial = true
fts = true

[database.embedded]
path = "geodash.db"

[database.network]
url = ""

[database.pool]
min = 2
max = 10
timeout_secs = 30

[search.fuzzy]
enabled = true
threshold = 70

[search.location_aware]
enabled = true
distance_weight = 0.3
country_boost = 25000.0

[search.cache]
enabled = true
size = 5000
ttl_secs = 300

[search.limits]
default = 10
max = 100

[data]
# location = "cities.csv"
# countries = ["US", "CA"]
# download_url = "https://example.com/cities.csv"
batch_size = 5000
"#;

pub fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(geodash_core::error::GeodashError::ConfigurationError(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )));
    }
    std::fs::write(path, DEFAULT_CONFIG_TOML).map_err(|e| write_failed(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_toml_parses_into_layered_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geodash.toml");
        std::fs::write(&path, DEFAULT_CONFIG_TOML).unwrap();

        let config = load(&path, None).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.fuzzy_threshold.value, 70);
        assert_eq!(config.limits_max.value, 100);
    }

    #[test]
    fn write_default_refuses_to_overwrite_without_force() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geodash.toml");
        write_default(&path, false).unwrap();
        assert!(write_default(&path, false).is_err());
        assert!(write_default(&path, true).is_ok());
    }

    #[test]
    fn load_applies_cli_db_uri_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let config = load(&path, Some("sqlite://test.db".to_string())).unwrap();
        assert_eq!(config.database_embedded_path.value, "test.db");
    }
}

