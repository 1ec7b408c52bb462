use crate::constants::VARIABLE_REGEX;
use crate::users::FileSystemConfig;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file: {0}")]
    Syntax(#[from] toml::de::Error),

    #[error("Error for node <{node}>: {reason}")]
    InvalidNode { node: String, reason: String },
}

impl ConfigError {
    pub fn invalid(node: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidNode {
            node: node.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_port: u16,
    pub banner: String,
    /// Address advertised in PASV replies
    pub pasv_address: String,
    pub data_bind_address: String,
    pub data_ports: Vec<u16>,      // 0 binds an ephemeral port
    pub idle_timeout_secs: u64,    // 0 disables the idle check
    pub service_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_port: 21,
            banner: String::from("ferroftpd ready."),
            pasv_address: String::from("127.0.0.1"),
            data_bind_address: String::from("0.0.0.0"),
            data_ports: (40000..40010).collect(),
            idle_timeout_secs: 900,
            service_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Process properties, consulted by `${NAME}` after the environment.
    #[serde(default)]
    pub properties: HashMap<String, String>,

    pub file_system: FileSystemConfig,
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&config_str)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_str)?;
        if config.server.data_bind_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::invalid(
                "server/data_bind_address",
                "must be an IP address",
            ));
        }
        if config.server.service_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "server/service_interval_ms",
                "must be greater than zero",
            ));
        }
        Ok(config)
    }

    pub fn substitute(&self, source: &str) -> String {
        substitute_variables(source, &self.properties)
    }
}

/// Replaces every `${NAME}` with the environment variable `NAME`, or failing that with the
/// property `NAME`. Unknown variables are left as written.
pub fn substitute_variables(source: &str, properties: &HashMap<String, String>) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(VARIABLE_REGEX).expect("valid variable regex"));

    pattern
        .replace_all(source, |caps: &Captures| {
            let name = &caps[1];
            std::env::var(name)
                .ok()
                .or_else(|| properties.get(name).cloned())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_prefers_environment() {
        std::env::set_var("FERRO_TEST_ROOT", "/srv/env");
        let mut properties = HashMap::new();
        properties.insert("FERRO_TEST_ROOT".to_string(), "/srv/props".to_string());
        properties.insert("FERRO_TEST_ONLY_PROP".to_string(), "users".to_string());

        assert_eq!(
            substitute_variables("${FERRO_TEST_ROOT}/${FERRO_TEST_ONLY_PROP}", &properties),
            "/srv/env/users"
        );
    }

    #[test]
    fn test_substitute_keeps_unknown_variables() {
        let properties = HashMap::new();
        assert_eq!(
            substitute_variables("/data/${FERRO_TEST_UNSET_VARIABLE}/x", &properties),
            "/data/${FERRO_TEST_UNSET_VARIABLE}/x"
        );
        assert_eq!(substitute_variables("/plain/path", &properties), "/plain/path");
    }

    #[test]
    fn test_server_defaults() {
        let config = Config::from_toml_str(
            r#"
            [file_system]
            users_path = "/home"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen_port, 21);
        assert_eq!(config.server.data_ports.len(), 10);
        assert!(config.file_system.users.is_empty());
    }

    #[test]
    fn test_missing_file_system_is_an_error() {
        assert!(matches!(
            Config::from_toml_str("[server]\nlisten_port = 2121\n"),
            Err(ConfigError::Syntax(_))
        ));
    }
}
