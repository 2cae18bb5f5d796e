//! Configuration types for Veil.
//!
//! Discriminator rules are declared in YAML and loaded into a
//! [`DiscriminatorConfig`]. Each rule names the tables it applies to and the
//! column values every statement on those tables must carry.
//!
//! ```yaml
//! throw_on_unsupported: true
//! rules:
//!   - table: orders
//!     columns:
//!       tenant_id: { placeholder: "$1" }
//!   - table: { glob: "tenant_*" }
//!     schema: public
//!     columns:
//!       tenant_id: 42
//!       deleted: false
//! ```

pub mod rule;

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub use rule::{ColumnDefinitions, ColumnValue, RuleDefinition};

/// Complete discriminator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscriminatorConfig {
    /// Fail on INSERT statements whose rows do not come from a literal
    /// `VALUES` list. When false such statements pass through untouched.
    #[serde(default = "default_true")]
    pub throw_on_unsupported: bool,

    /// Rules, applied in the order they are declared.
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            throw_on_unsupported: default_true(),
            rules: Vec::new(),
        }
    }
}

impl DiscriminatorConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Load the rules file `config_file`, resolved against `base_dir` unless
    /// it is absolute.
    ///
    /// A missing rules file is a [`ConfigError::Config`] naming the resolved
    /// path. Other read failures stay [`ConfigError::Io`].
    pub fn load_from_path(
        config_file: impl AsRef<Path>,
        base_dir: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let path = base_dir.as_ref().join(config_file);
        match fs::read_to_string(&path) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::Config(
                format!("discriminator rules not found at {}", path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("invalid table pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const YAML: &str = r#"
throw_on_unsupported: false
rules:
  - table: orders
    columns:
      tenant_id: { placeholder: "$1" }
  - table: { glob: "tenant_*" }
    schema: public
    columns:
      tenant_id: 42
      deleted: false
      region: eu
"#;

    #[test]
    fn test_parse_rules_yaml() {
        let config = DiscriminatorConfig::from_yaml(YAML).unwrap();
        assert!(!config.throw_on_unsupported);
        assert_eq!(config.rules.len(), 2);

        let orders = config.rules[0].pattern();
        assert!(orders.test("orders", Some("anything")));

        let tenant = config.rules[1].pattern();
        assert!(tenant.test("tenant_users", Some("public")));
        assert!(!tenant.test("tenant_users", None));

        let names: Vec<&str> = config.rules[1].columns.names().collect();
        assert_eq!(names, vec!["tenant_id", "deleted", "region"]);
    }

    #[test]
    fn test_defaults() {
        let config = DiscriminatorConfig::from_yaml("rules: []").unwrap();
        assert!(config.throw_on_unsupported);
        assert!(config.rules.is_empty());
        assert!(DiscriminatorConfig::default().throw_on_unsupported);
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let yaml = r#"
rules:
  - table: { regex: "(unclosed" }
    columns:
      tenant_id: 1
"#;
        let err = DiscriminatorConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn test_unmatchable_column_values_are_rejected() {
        let yaml = r#"
rules:
  - table: orders
    columns:
      deleted_at: null
"#;
        let err = DiscriminatorConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));

        let yaml = r#"
rules:
  - table: orders
    columns:
      weight: .inf
"#;
        let err = DiscriminatorConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("not a finite number"));
    }

    #[test]
    fn test_empty_table_name_is_rejected() {
        let yaml = r#"
rules:
  - table: ""
    columns:
      tenant_id: 1
"#;
        assert!(DiscriminatorConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_from_path_relative_to_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("veil.yaml")).unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = DiscriminatorConfig::load_from_path("veil.yaml", dir.path()).unwrap();
        assert_eq!(config.rules.len(), 2);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DiscriminatorConfig::load_from_path("missing.yaml", dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Config(_)));
        assert!(err.to_string().contains("missing.yaml"));
    }

    #[test]
    fn test_load_from_path_absolute_ignores_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veil.yaml");
        fs::write(&path, YAML).unwrap();

        let config = DiscriminatorConfig::load_from_path(&path, "/nonexistent").unwrap();
        assert_eq!(config.rules.len(), 2);
    }
}
