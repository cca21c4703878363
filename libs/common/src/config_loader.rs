//! Layered configuration loading
//!
//! Sources are merged lowest priority first:
//! 1. Serialized defaults of the target type
//! 2. A config file (`config/{service}.yaml` unless a path is given)
//! 3. Environment variables `{SERVICE}_SECTION__KEY`

use std::path::{Path, PathBuf};

use errors::{KilnError, KilnResult};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default config file location for a service
pub fn default_config_path(service_name: &str) -> PathBuf {
    PathBuf::from(format!("config/{}.yaml", service_name))
}

/// Environment prefix for a service, e.g. `KILNSRV_`
pub fn env_prefix(service_name: &str) -> String {
    format!("{}_", service_name.to_uppercase())
}

/// Select the figment file provider by extension
fn file_figment(figment: Figment, path: &Path) -> KilnResult<Figment> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| KilnError::config("Config file must have an extension"))?;

    match extension {
        "toml" => Ok(figment.merge(Toml::file(path))),
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        "json" => Ok(figment.merge(Json::file(path))),
        _ => Err(KilnError::config(format!(
            "Unsupported config file format: {}",
            extension
        ))),
    }
}

/// Load configuration for `service_name`
///
/// An explicit `path` must exist; the default path is optional.
pub fn load_config<T>(service_name: &str, path: Option<&Path>) -> KilnResult<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Default,
{
    load_config_with_prefix(path, service_name, &env_prefix(service_name))
}

/// Same as [`load_config`] with a caller-chosen environment prefix
pub fn load_config_with_prefix<T>(
    path: Option<&Path>,
    service_name: &str,
    prefix: &str,
) -> KilnResult<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    match path {
        Some(path) => {
            if !path.exists() {
                return Err(KilnError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            info!("Config: {}", path.display());
            figment = file_figment(figment, path)?;
        },
        None => {
            let default_path = default_config_path(service_name);
            if default_path.exists() {
                info!("Config: {}", default_path.display());
                figment = file_figment(figment, &default_path)?;
            } else {
                debug!("No config file at {}, using defaults", default_path.display());
            }
        },
    }

    figment = figment.merge(Env::prefixed(prefix).split("__"));

    figment
        .extract()
        .map_err(|e| KilnError::config(format!("Failed to load configuration: {}", e)))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    struct TestConfig {
        name: String,
        nested: NestedConfig,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    struct NestedConfig {
        port: u16,
        enabled: bool,
    }

    impl Default for TestConfig {
        fn default() -> Self {
            Self {
                name: "default".to_string(),
                nested: NestedConfig::default(),
            }
        }
    }

    impl Default for NestedConfig {
        fn default() -> Self {
            Self {
                port: 8000,
                enabled: false,
            }
        }
    }

    #[test]
    fn test_defaults_when_no_sources() {
        let config: TestConfig =
            load_config_with_prefix(None, "no-such-service", "CFG_TEST_NONE_").unwrap();
        assert_eq!(config, TestConfig::default());
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "name: kiln\nnested:\n  port: 9000").unwrap();

        let config: TestConfig =
            load_config_with_prefix(Some(file.path()), "test", "CFG_TEST_YAML_").unwrap();
        assert_eq!(config.name, "kiln");
        assert_eq!(config.nested.port, 9000);
        assert!(!config.nested.enabled);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "nested:\n  port: 9000").unwrap();

        std::env::set_var("CFG_TEST_ENV_NESTED__PORT", "9100");
        let config: TestConfig =
            load_config_with_prefix(Some(file.path()), "test", "CFG_TEST_ENV_").unwrap();
        std::env::remove_var("CFG_TEST_ENV_NESTED__PORT");

        assert_eq!(config.nested.port, 9100);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result: KilnResult<TestConfig> = load_config_with_prefix(
            Some(Path::new("/nonexistent/kilnsrv.yaml")),
            "test",
            "CFG_TEST_MISSING_",
        );
        assert!(matches!(result, Err(KilnError::Config { .. })));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result: KilnResult<TestConfig> =
            load_config_with_prefix(Some(file.path()), "test", "CFG_TEST_INI_");
        assert!(matches!(result, Err(KilnError::Config { .. })));
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(env_prefix("kilnsrv"), "KILNSRV_");
        assert_eq!(default_config_path("kilnsrv"), PathBuf::from("config/kilnsrv.yaml"));
    }
}
