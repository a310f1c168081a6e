//! # Configuration
//!
//! Recognized configuration keys, loaded from a YAML file whose path is
//! supplied by the `WPYS_CONFIG_FILE` environment variable.

pub mod circuit_breaker;

use serde::{Deserialize, Serialize};

use crate::errors::{WpysError, WpysResult};

fn default_main_endpoint() -> String {
    "/".to_string()
}

fn default_result_chunk_size() -> usize {
    65535
}

/// Service-identification metadata returned by GetCapabilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub fees: Option<String>,
    pub access_constraints: Option<String>,
    pub provider_name: Option<String>,
    pub provider_site: Option<String>,
    pub individual_name: Option<String>,
    pub electronical_mail_address: Option<String>,
}

/// `module:name` references to register at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub locations: Vec<String>,
}

/// Opaque backend selection plus backend-specific option bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(rename = "type")]
    pub backend_type: String,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend_type: "memory".to_string(),
            options: serde_json::Map::new(),
        }
    }
}

/// Opaque logger configuration, passed through to `tracing_subscriber`'s
/// `EnvFilter` rather than interpreted field-by-field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WpysConfig {
    #[serde(default = "default_main_endpoint")]
    pub main_endpoint_name: String,
    pub result_endpoint_name: Option<String>,
    #[serde(default = "default_result_chunk_size")]
    pub result_chunk_size: usize,
    #[serde(default)]
    pub broker: BackendConfig,
    #[serde(default)]
    pub result_backend: BackendConfig,
    /// TTL in seconds; `None` means jobs never expire.
    pub expiration_time: Option<u64>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub pretty_print: bool,
    #[serde(default)]
    pub service_info: ServiceInfo,
    #[serde(default)]
    pub process_config: ProcessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub circuit_breaker: circuit_breaker::CircuitBreakerConfig,
}

impl Default for WpysConfig {
    fn default() -> Self {
        Self {
            main_endpoint_name: default_main_endpoint(),
            result_endpoint_name: None,
            result_chunk_size: default_result_chunk_size(),
            broker: BackendConfig::default(),
            result_backend: BackendConfig::default(),
            expiration_time: None,
            debug: false,
            pretty_print: false,
            service_info: ServiceInfo::default(),
            process_config: ProcessConfig::default(),
            logging: LoggingConfig::default(),
            circuit_breaker: circuit_breaker::CircuitBreakerConfig::default(),
        }
    }
}

impl WpysConfig {
    /// Reads `WPYS_CONFIG_FILE` and parses the YAML document it points to.
    pub fn load() -> WpysResult<Self> {
        let path = std::env::var("WPYS_CONFIG_FILE")
            .map_err(|_| WpysError::config_error("WPYS_CONFIG_FILE is not set"))?;
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &str) -> WpysResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| WpysError::config_error(format!("cannot read {path}: {e}")))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| WpysError::config_error(format!("cannot parse {path}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = WpysConfig::default();
        assert_eq!(config.main_endpoint_name, "/");
        assert_eq!(config.result_chunk_size, 65535);
        assert!(config.expiration_time.is_none());
        assert!(!config.debug);
    }

    #[test]
    fn load_missing_env_var_fails() {
        std::env::remove_var("WPYS_CONFIG_FILE");
        let err = WpysConfig::load().unwrap_err();
        assert!(matches!(err, WpysError::ConfigError(_)));
    }

    #[test]
    fn parses_minimal_yaml_document() {
        let yaml = r#"
main_endpoint_name: "/wps"
debug: true
service_info:
  title: "Test Service"
"#;
        let config: WpysConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.main_endpoint_name, "/wps");
        assert!(config.debug);
        assert_eq!(config.service_info.title.as_deref(), Some("Test Service"));
        assert_eq!(config.result_chunk_size, 65535);
    }
}
