//! Configuration management for catalog resolution
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (catalog.toml)
//! - Environment variables (CATALOG__*)
//!
//! ## Example config file (catalog.toml):
//! ```toml
//! [resolver]
//! strict_mode = true
//! kind_processing_order = ["Artist", "Album", "Track"]
//!
//! [input]
//! records_dir = "./records"
//! skip_prefixes = [".git/", "archive/"]
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Record input settings
    #[serde(default)]
    pub input: InputConfig,
}

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Abort the pass on the first data defect instead of skipping the record
    #[serde(default = "default_true")]
    pub strict_mode: bool,

    /// Explicit kind processing order; empty means derive it from the schema
    #[serde(default)]
    pub kind_processing_order: Vec<String>,
}

/// Record input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory of `<Kind>.json` record files
    #[serde(default = "default_records_dir")]
    pub records_dir: PathBuf,

    /// Paths to ignore while walking the records directory
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_records_dir() -> PathBuf {
    PathBuf::from("records")
}

fn default_skip_prefixes() -> Vec<String> {
    vec![".git/".to_string(), "target/".to_string()]
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strict_mode: true,
            kind_processing_order: Vec::new(),
        }
    }
}

impl ResolverConfig {
    pub fn lenient() -> Self {
        Self {
            strict_mode: false,
            ..Self::default()
        }
    }

    pub fn with_processing_order<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kind_processing_order = kinds.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            records_dir: default_records_dir(),
            skip_prefixes: default_skip_prefixes(),
        }
    }
}

impl CatalogConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["catalog.toml", ".catalog.toml", "config/catalog.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        let project_dirs = directories::ProjectDirs::from("dev", "familiar", "catalog-graph");
        if let Some(config_dir) = project_dirs {
            let xdg_config = config_dir.config_dir().join("catalog.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // CATALOG__RESOLVER__STRICT_MODE=false etc.
        builder = builder.add_source(
            Environment::with_prefix("CATALOG")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("resolver.kind_processing_order")
                .with_list_parse_key("input.skip_prefixes"),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get the records directory (resolves relative paths)
    pub fn records_dir(&self) -> PathBuf {
        if self.input.records_dir.is_absolute() {
            self.input.records_dir.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.input.records_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();
        assert!(config.resolver.strict_mode);
        assert!(config.resolver.kind_processing_order.is_empty());
        assert_eq!(config.input.records_dir, PathBuf::from("records"));
    }

    #[test]
    fn test_serialize_config() {
        let config = CatalogConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[resolver]"));
        assert!(toml_str.contains("strict_mode = true"));
        assert!(toml_str.contains("[input]"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[resolver]
strict_mode = false
kind_processing_order = ["Artist", "Album", "Track"]
"#,
        )
        .unwrap();

        let config = CatalogConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert!(!config.resolver.strict_mode);
        assert_eq!(config.resolver.kind_processing_order, vec!["Artist", "Album", "Track"]);
        assert_eq!(config.input.records_dir, PathBuf::from("records"));
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = CatalogConfig::load_from(Some(path.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = CatalogConfig::default();
        config.resolver = ResolverConfig::lenient().with_processing_order(["Artist", "Album"]);
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = CatalogConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.resolver, config.resolver);
    }
}
