//! Configuration management for hostfactsd.
//!
//! Loads settings from /etc/hostfacts/config.toml or uses defaults.
//! Network-facing settings are checked by `Config::validate` before any
//! request is sent.

use hostfacts_common::GathererOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/hostfacts/config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("mTLS is enabled: {}", .0.join(", "))]
    MissingTlsMaterial(Vec<&'static str>),

    #[error("ssh_address is required, cannot start agent")]
    MissingSshAddress,

    #[error("invalid collector server_url {url:?}: {reason}")]
    InvalidServerUrl { url: String, reason: String },
}

/// Collector connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Base URL, e.g. https://collector.example.com
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Sent as X-API-Key when set
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub enable_mtls: bool,

    /// Client certificate (PEM)
    #[serde(default)]
    pub cert: Option<PathBuf>,

    /// Client private key (PEM)
    #[serde(default)]
    pub key: Option<PathBuf>,

    /// CA used to verify the collector (PEM)
    #[serde(default)]
    pub ca: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            api_key: None,
            enable_mtls: false,
            cert: None,
            key: None,
            ca: None,
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Agent identity and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Address the collector uses to reach this host over ssh
    #[serde(default)]
    pub ssh_address: String,

    /// Defaults to the hostname
    #[serde(default)]
    pub instance_name: Option<String>,

    /// Agent id is derived from this file
    #[serde(default = "default_machine_id_path")]
    pub machine_id_path: PathBuf,

    /// Heartbeat period in seconds
    #[serde(default = "default_discovery_period")]
    pub discovery_period_secs: u64,

    /// Upper bound for one gatherer's batch
    #[serde(default = "default_gather_timeout")]
    pub gather_timeout_secs: u64,
}

fn default_machine_id_path() -> PathBuf {
    PathBuf::from("/etc/machine-id")
}

fn default_discovery_period() -> u64 {
    10
}

fn default_gather_timeout() -> u64 {
    30
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ssh_address: String::new(),
            instance_name: None,
            machine_id_path: default_machine_id_path(),
            discovery_period_secs: default_discovery_period(),
            gather_timeout_secs: default_gather_timeout(),
        }
    }
}

/// Settings for the built-in gatherers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatherersConfig {
    #[serde(default = "default_corosync_conf_path")]
    pub corosync_conf_path: PathBuf,

    /// Fail on unbalanced sections instead of serving a partial tree
    #[serde(default = "default_true")]
    pub strict_corosync_conf: bool,
}

fn default_corosync_conf_path() -> PathBuf {
    GathererOptions::default().corosync_conf_path
}

fn default_true() -> bool {
    true
}

impl Default for GatherersConfig {
    fn default() -> Self {
        Self {
            corosync_conf_path: default_corosync_conf_path(),
            strict_corosync_conf: true,
        }
    }
}

impl GatherersConfig {
    pub fn options(&self) -> GathererOptions {
        GathererOptions {
            corosync_conf_path: self.corosync_conf_path.clone(),
            strict_corosync_conf: self.strict_corosync_conf,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub gatherers: GatherersConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from `path`, or from CONFIG_PATH when none is given.
    ///
    /// An explicit path must exist. A missing default file falls back to
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let default_path = Path::new(CONFIG_PATH);
                if default_path.exists() {
                    Self::load_from_path(default_path)
                } else {
                    warn!("Config not found at {}, using defaults", CONFIG_PATH);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Check everything a network command needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let collector = &self.collector;

        if collector.enable_mtls {
            let mut missing = Vec::new();
            if collector.cert.is_none() {
                missing.push("you must provide a server ssl certificate");
            }
            if collector.key.is_none() {
                missing.push("you must provide a key to enable mTLS");
            }
            if collector.ca.is_none() {
                missing.push("you must provide a CA ssl certificate");
            }
            if !missing.is_empty() {
                return Err(ConfigError::MissingTlsMaterial(missing));
            }
        }

        reqwest::Url::parse(&collector.server_url).map_err(|e| ConfigError::InvalidServerUrl {
            url: collector.server_url.clone(),
            reason: e.to_string(),
        })?;

        if self.agent.ssh_address.trim().is_empty() {
            return Err(ConfigError::MissingSshAddress);
        }

        Ok(())
    }

    /// Configured instance name, else the hostname.
    pub fn instance_name(&self) -> String {
        if let Some(name) = &self.agent.instance_name {
            return name.clone();
        }

        match nix::unistd::gethostname() {
            Ok(name) => name.to_string_lossy().into_owned(),
            Err(e) => {
                warn!("could not read the hostname: {}", e);
                "unknown".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.agent.ssh_address = "192.168.1.10".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.collector.server_url, "http://localhost:8081");
        assert!(!config.collector.enable_mtls);
        assert_eq!(config.agent.discovery_period_secs, 10);
        assert_eq!(
            config.gatherers.corosync_conf_path,
            PathBuf::from("/etc/corosync/corosync.conf")
        );
        assert!(config.gatherers.strict_corosync_conf);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[collector]
server_url = "https://collector.example.com"
enable_mtls = true
cert = "/etc/hostfacts/cert.pem"
key = "/etc/hostfacts/key.pem"
ca = "/etc/hostfacts/ca.pem"

[agent]
ssh_address = "10.0.0.5"

[gatherers]
strict_corosync_conf = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.collector.server_url, "https://collector.example.com");
        assert_eq!(config.collector.ca, Some(PathBuf::from("/etc/hostfacts/ca.pem")));
        assert_eq!(config.agent.ssh_address, "10.0.0.5");
        assert!(!config.gatherers.strict_corosync_conf);
        // Defaults for missing fields
        assert_eq!(config.collector.timeout_secs, 10);
        assert_eq!(config.agent.gather_timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mtls_reports_every_missing_file() {
        let mut config = valid_config();
        config.collector.enable_mtls = true;
        config.collector.key = Some(PathBuf::from("/etc/hostfacts/key.pem"));

        match config.validate() {
            Err(ConfigError::MissingTlsMaterial(missing)) => {
                assert_eq!(
                    missing,
                    vec![
                        "you must provide a server ssl certificate",
                        "you must provide a CA ssl certificate",
                    ]
                );
            }
            other => panic!("expected missing TLS material, got {:?}", other),
        }
    }

    #[test]
    fn test_mtls_disabled_ignores_paths() {
        let config = valid_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ssh_address_required() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingSshAddress)));
    }

    #[test]
    fn test_invalid_server_url() {
        let mut config = valid_config();
        config.collector.server_url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidServerUrl { .. })
        ));
    }

    #[test]
    fn test_load_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.collector.server_url, "http://localhost:8081");
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[agent\nssh_address = 1").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_instance_name_override() {
        let mut config = Config::default();
        config.agent.instance_name = Some("node01".to_string());
        assert_eq!(config.instance_name(), "node01");
    }
}
