// src/config.rs
// =============================================================================
// Runtime configuration.
//
// Sources, in order:
// 1. The file passed with --config (must exist)
// 2. ./config/config.toml if present
// 3. Built-in defaults
//
// Every field has a default, so a config file only needs the keys it changes:
//
//   [server]
//   host = "0.0.0.0"
//   port = 8080
//
//   [log]
//   level = "info"     # any EnvFilter directive; RUST_LOG wins if set
//   format = "text"    # or "json"
//   path = "link-vigil.log"  # append to this file instead of stderr
//
//   [storage]
//   cache_size = 1024  # liveness cache capacity, must be > 0
//   links_size = 1024  # batch registry pre-allocation hint
//
//   [checker]
//   probe_timeout_secs = 10
//   call_deadline_secs = 30
//   revalidate_interval_secs = 900
//   max_concurrent_probes = 50
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::EngineConfig;
use crate::error::{Error, Result};
use crate::revalidate::RevalidatorConfig;

/// Where we look when no --config flag is given
pub const DEFAULT_CONFIG_PATH: &str = "./config/config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub storage: StorageConfig,
    pub checker: CheckerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    /// Log file to append to; stderr when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Liveness cache capacity
    pub cache_size: usize,
    /// Initial size hint for the batch registry
    pub links_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_size: 1024,
            links_size: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckerConfig {
    pub probe_timeout_secs: u64,
    pub call_deadline_secs: u64,
    pub revalidate_interval_secs: u64,
    pub max_concurrent_probes: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 10,
            call_deadline_secs: 30,
            revalidate_interval_secs: 15 * 60,
            max_concurrent_probes: 50,
        }
    }
}

impl CheckerConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn call_deadline(&self) -> Duration {
        Duration::from_secs(self.call_deadline_secs)
    }

    pub fn revalidate_interval(&self) -> Duration {
        Duration::from_secs(self.revalidate_interval_secs)
    }
}

impl Config {
    /// Resolves and loads the config file, then validates it
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Rejects values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.storage.cache_size == 0 {
            return Err(invalid("storage.cache_size must be greater than 0"));
        }
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0"));
        }
        if self.checker.probe_timeout_secs == 0 {
            return Err(invalid("checker.probe_timeout_secs must be greater than 0"));
        }
        if self.checker.call_deadline_secs == 0 {
            return Err(invalid("checker.call_deadline_secs must be greater than 0"));
        }
        if self.checker.revalidate_interval_secs == 0 {
            return Err(invalid("checker.revalidate_interval_secs must be greater than 0"));
        }
        if self.checker.max_concurrent_probes == 0 {
            return Err(invalid("checker.max_concurrent_probes must be greater than 0"));
        }

        if self.checker.probe_timeout_secs >= self.checker.call_deadline_secs {
            warn!(
                probe_timeout_secs = self.checker.probe_timeout_secs,
                call_deadline_secs = self.checker.call_deadline_secs,
                "probe timeout is not shorter than the call deadline; slow links will fail whole calls"
            );
        }

        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_concurrent_probes: self.checker.max_concurrent_probes,
            call_deadline: self.checker.call_deadline(),
        }
    }

    pub fn revalidator_config(&self) -> RevalidatorConfig {
        RevalidatorConfig {
            interval: self.checker.revalidate_interval(),
            max_concurrent_probes: self.checker.max_concurrent_probes,
        }
    }
}

fn invalid(message: &str) -> Error {
    Error::Configuration(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_behaviour() {
        let config = Config::default();
        assert_eq!(config.checker.probe_timeout(), Duration::from_secs(10));
        assert_eq!(config.checker.call_deadline(), Duration::from_secs(30));
        assert_eq!(config.checker.revalidate_interval(), Duration::from_secs(900));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
[storage]
cache_size = 2

[log]
format = "json"
"#,
        )
        .unwrap();

        assert_eq!(config.storage.cache_size, 2);
        assert_eq!(config.storage.links_size, 1024);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.path, None);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_log_path() {
        let config = Config::from_toml_str("[log]\npath = \"logs/link-vigil.log\"\n").unwrap();
        assert_eq!(config.log.path, Some(PathBuf::from("logs/link-vigil.log")));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_zero_cache_size_is_rejected() {
        let config = Config::from_toml_str("[storage]\ncache_size = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Config::from_toml_str("[storage]\ncache_sise = 3\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9090\n[checker]\nmax_concurrent_probes = 4").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.listen_addr(), "0.0.0.0:9090");
        assert_eq!(config.engine_config().max_concurrent_probes, 4);
        assert_eq!(config.revalidator_config().interval, Duration::from_secs(900));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
