//! Daemon configuration module.
//!
//! Contains the runtime configuration for the midigen daemon: listen
//! address, browser origins, model directory, startup model handling, and
//! log filter.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default listen host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8000;

/// Browser origins allowed to call the API by default.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost", "http://localhost:3000"];

/// Default `env_logger` filter when neither `RUST_LOG` nor `MIDIGEN_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Runtime configuration for the daemon.
///
/// This configuration is typically loaded from environment variables at
/// startup and then overridden by command-line arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Interface to bind the HTTP server to.
    pub host: String,

    /// TCP port for the HTTP server.
    pub port: u16,

    /// Origins allowed to make cross-origin requests, e.g. `http://localhost:3000`.
    pub cors_origins: Vec<String>,

    /// Path to the directory containing model checkpoints.
    /// If None, uses the platform-specific default cache location.
    pub model_path: Option<PathBuf>,

    /// Write built-in checkpoints for any registered model missing on disk
    /// before serving.
    pub install_missing_models: bool,

    /// Load every registered model at startup instead of on first request.
    pub preload_models: bool,

    /// Default log filter in `env_logger` syntax.
    pub log_filter: String,
}

impl DaemonConfig {
    /// Creates a new DaemonConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a DaemonConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `MIDIGEN_HOST` - Interface to bind
    /// - `MIDIGEN_PORT` - TCP port
    /// - `MIDIGEN_CORS_ORIGINS` - Comma-separated allowed browser origins
    /// - `MIDIGEN_MODEL_PATH` - Path to model checkpoint directory
    /// - `MIDIGEN_INSTALL_MODELS` - Install missing built-in checkpoints (true/false)
    /// - `MIDIGEN_PRELOAD` - Load all models at startup (true/false)
    /// - `MIDIGEN_LOG` - Default log filter
    ///
    /// Falls back to defaults for unset or unparseable variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("MIDIGEN_HOST") {
            if !host.trim().is_empty() {
                config.host = host.trim().to_string();
            }
        }

        if let Some(port_str) = lookup("MIDIGEN_PORT") {
            if let Ok(port) = port_str.trim().parse::<u16>() {
                config.port = port;
            }
        }

        if let Some(origins) = lookup("MIDIGEN_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(path) = lookup("MIDIGEN_MODEL_PATH") {
            config.model_path = Some(PathBuf::from(path));
        }

        if let Some(flag) = lookup("MIDIGEN_INSTALL_MODELS").as_deref().and_then(parse_flag) {
            config.install_missing_models = flag;
        }

        if let Some(flag) = lookup("MIDIGEN_PRELOAD").as_deref().and_then(parse_flag) {
            config.preload_models = flag;
        }

        if let Some(filter) = lookup("MIDIGEN_LOG") {
            config.log_filter = filter;
        }

        config
    }

    /// Returns the effective model path, using platform defaults if not specified.
    pub fn effective_model_path(&self) -> PathBuf {
        if let Some(ref path) = self.model_path {
            path.clone()
        } else {
            default_model_path()
        }
    }

    /// Returns the `host:port` string the server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.host.is_empty() {
            return Some("host must not be empty".to_string());
        }

        // SocketAddr does not resolve names; localhost is the one we accept.
        let resolvable = self.host.eq_ignore_ascii_case("localhost")
            || self.bind_address().parse::<SocketAddr>().is_ok();
        if !resolvable {
            return Some(format!("invalid bind address: {}", self.bind_address()));
        }

        for origin in &self.cors_origins {
            let scheme_ok = origin.starts_with("http://") || origin.starts_with("https://");
            if !scheme_ok || origin.ends_with('/') || origin.contains(char::is_whitespace) {
                return Some(format!(
                    "invalid CORS origin '{}': expected scheme://host[:port]",
                    origin
                ));
            }
        }

        if self.log_filter.trim().is_empty() {
            return Some("log filter must not be empty".to_string());
        }

        None
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            model_path: None,
            install_missing_models: true,
            preload_models: false,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Returns the platform-specific default model storage path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Caches/midigen/models
/// - Linux: ~/.cache/midigen/models
/// - Windows: C:\Users\<user>\AppData\Local\midigen\cache\models
fn default_model_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "midigen") {
        proj_dirs.cache_dir().join("models")
    } else {
        // Fallback to current directory
        PathBuf::from("./models")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = DaemonConfig::new();
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
        assert!(config.install_missing_models);
        assert!(!config.preload_models);
        assert_eq!(config.cors_origins, DEFAULT_CORS_ORIGINS);
        assert!(config.validate().is_none());
    }

    #[test]
    fn reads_midigen_vars() {
        let config = DaemonConfig::from_vars(lookup(&[
            ("MIDIGEN_HOST", "0.0.0.0"),
            ("MIDIGEN_PORT", "9100"),
            ("MIDIGEN_CORS_ORIGINS", "https://beats.example, http://localhost:5173 ,"),
            ("MIDIGEN_MODEL_PATH", "/srv/models"),
            ("MIDIGEN_INSTALL_MODELS", "no"),
            ("MIDIGEN_PRELOAD", "TRUE"),
            ("MIDIGEN_LOG", "midigen_daemon=debug"),
        ]));
        assert_eq!(config.bind_address(), "0.0.0.0:9100");
        assert_eq!(
            config.cors_origins,
            vec!["https://beats.example", "http://localhost:5173"]
        );
        assert_eq!(config.effective_model_path(), PathBuf::from("/srv/models"));
        assert!(!config.install_missing_models);
        assert!(config.preload_models);
        assert_eq!(config.log_filter, "midigen_daemon=debug");
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = DaemonConfig::from_vars(lookup(&[
            ("MIDIGEN_PORT", "eighty"),
            ("MIDIGEN_PRELOAD", "maybe"),
            ("MIDIGEN_HOST", "  "),
        ]));
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn config_validation() {
        let mut config = DaemonConfig::new();
        config.host = "not a host".to_string();
        assert!(config.validate().is_some());

        config.host = "localhost".to_string();
        assert!(config.validate().is_none());

        for origin in ["*", "localhost:3000", "http://localhost:3000/", "http://a b"] {
            let mut bad = DaemonConfig::new();
            bad.cors_origins = vec![origin.to_string()];
            assert!(bad.validate().is_some(), "{} accepted", origin);
        }

        config.log_filter = " ".to_string();
        assert!(config.validate().is_some());
    }

    #[test]
    fn effective_paths() {
        let config = DaemonConfig::new();
        assert!(!config.effective_model_path().as_os_str().is_empty());
    }
}
