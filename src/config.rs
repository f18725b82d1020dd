//! Configuration management for uwsgi-stats-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use uwsgi_stats_exporter::collector::DEFAULT_MAX_CONCURRENT_FETCHES;
use uwsgi_stats_exporter::source::validate_pattern;
use uwsgi_stats_exporter::{CollectorOptions, FetchOptions, SourceDescriptor, SourceKind};

// Default configuration constants
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9031";
pub const DEFAULT_STATS_ADDRESS: &str = "unix://uwsgi.sock";
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5000;

/// Exporter configuration. Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    #[serde(alias = "listen-address")]
    pub listen_address: Option<String>,

    // Stats source
    #[serde(alias = "stats-address", alias = "uwsgi_stats_address")]
    pub stats_address: Option<String>,
    #[serde(alias = "fetch-timeout-ms")]
    pub fetch_timeout_ms: Option<u64>,
    #[serde(alias = "max-concurrent-fetches")]
    pub max_concurrent_fetches: Option<usize>,

    // Feature flags
    #[serde(alias = "enable-health")]
    pub enable_health: Option<bool>,
    #[serde(alias = "enable-telemetry")]
    pub enable_telemetry: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: Some(DEFAULT_LISTEN_ADDRESS.to_string()),
            stats_address: Some(DEFAULT_STATS_ADDRESS.to_string()),
            fetch_timeout_ms: Some(DEFAULT_FETCH_TIMEOUT_MS),
            max_concurrent_fetches: Some(DEFAULT_MAX_CONCURRENT_FETCHES),
            enable_health: Some(true),
            enable_telemetry: Some(true),
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    pub fn listen_address(&self) -> &str {
        self.listen_address
            .as_deref()
            .unwrap_or(DEFAULT_LISTEN_ADDRESS)
    }

    pub fn stats_address(&self) -> &str {
        self.stats_address.as_deref().unwrap_or(DEFAULT_STATS_ADDRESS)
    }

    /// Collector options derived from this config.
    pub fn collector_options(&self) -> CollectorOptions {
        CollectorOptions {
            fetch: FetchOptions {
                timeout: Duration::from_millis(
                    self.fetch_timeout_ms.unwrap_or(DEFAULT_FETCH_TIMEOUT_MS),
                ),
            },
            max_concurrent_fetches: self
                .max_concurrent_fetches
                .unwrap_or(DEFAULT_MAX_CONCURRENT_FETCHES),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let listen = cfg.listen_address();
    if listen.parse::<SocketAddr>().is_err() {
        return Err(format!(
            "Invalid listen_address '{}', expected ip:port (e.g. {})",
            listen, DEFAULT_LISTEN_ADDRESS
        )
        .into());
    }

    let descriptor = SourceDescriptor::resolve(cfg.stats_address())?;
    if descriptor.kind.is_glob() {
        validate_pattern(&descriptor.location)?;
    }

    if cfg.fetch_timeout_ms == Some(0) {
        return Err("fetch_timeout_ms must be greater than 0".into());
    }

    if cfg.max_concurrent_fetches == Some(0) {
        return Err("max_concurrent_fetches must be greater than 0".into());
    }

    Ok(())
}

/// Returns a warning for configurations that are valid but cannot produce
/// stats.
pub fn config_warning(cfg: &Config) -> Option<String> {
    match SourceDescriptor::resolve(cfg.stats_address()) {
        Ok(desc) if desc.kind == SourceKind::Http => Some(format!(
            "stats_address '{}' uses the http scheme, which is not supported for fetching; every scrape will fail",
            desc.location
        )),
        _ => None,
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(listen) = &args.listen_address {
        config.listen_address = Some(listen.clone());
    }
    if let Some(address) = &args.stats_address {
        config.stats_address = Some(address.clone());
    }
    if let Some(timeout) = args.fetch_timeout_ms {
        config.fetch_timeout_ms = Some(timeout);
    }
    if let Some(n) = args.max_concurrent_fetches {
        config.max_concurrent_fetches = Some(n);
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_telemetry {
        config.enable_telemetry = Some(false);
    }

    Ok(config)
}

/// Configuration loading with multiple format support.
///
/// Missing keys in the file fall back to the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/uwsgi-stats-exporter/config.yaml",
                "./uwsgi-stats-exporter.yaml",
                "./uwsgi-stats-exporter.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            }
        }
    };

    if !path.exists() {
        return Err(format!("Config file not found: {}", path.display()).into());
    }

    let content = fs::read_to_string(&path)?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            config
        }
        Some("toml") => {
            let config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            config
        }
        _ => {
            let config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            config
        }
    };

    Ok(merge_defaults(config))
}

fn merge_defaults(cfg: Config) -> Config {
    let d = Config::default();
    Config {
        listen_address: cfg.listen_address.or(d.listen_address),
        stats_address: cfg.stats_address.or(d.stats_address),
        fetch_timeout_ms: cfg.fetch_timeout_ms.or(d.fetch_timeout_ms),
        max_concurrent_fetches: cfg.max_concurrent_fetches.or(d.max_concurrent_fetches),
        enable_health: cfg.enable_health.or(d.enable_health),
        enable_telemetry: cfg.enable_telemetry.or(d.enable_telemetry),
        log_level: cfg.log_level.or(d.log_level),
    }
}

/// Shows configuration in requested format
pub fn show_config(
    config: &Config,
    format: ConfigFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };

    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = Config::default();
        assert!(validate_effective_config(&cfg).is_ok());
        assert!(config_warning(&cfg).is_none());
    }

    #[test]
    fn test_invalid_listen_address() {
        let cfg = Config {
            listen_address: Some(":9031".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_invalid_stats_address() {
        let cfg = Config {
            stats_address: Some("tcp://127.0.0.1:1717".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            stats_address: Some("fileglob:///tmp/[.json".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let cfg = Config {
            fetch_timeout_ms: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            max_concurrent_fetches: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_http_address_warns() {
        let cfg = Config {
            stats_address: Some("http://127.0.0.1:1717".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_ok());
        assert!(config_warning(&cfg).is_some());
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "stats_address: \"file:///tmp/stats.json\"").unwrap();
        writeln!(file, "fetch_timeout_ms: 250").unwrap();

        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.stats_address(), "file:///tmp/stats.json");
        assert_eq!(cfg.fetch_timeout_ms, Some(250));
        assert_eq!(cfg.listen_address(), DEFAULT_LISTEN_ADDRESS);
        assert_eq!(cfg.max_concurrent_fetches, Some(DEFAULT_MAX_CONCURRENT_FETCHES));
    }

    #[test]
    fn test_load_json_with_legacy_key() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(file, r#"{{"uwsgi_stats_address": "unix:///run/uwsgi.sock"}}"#).unwrap();

        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.stats_address(), "unix:///run/uwsgi.sock");
    }

    #[test]
    fn test_collector_options_from_config() {
        let cfg = Config {
            fetch_timeout_ms: Some(1500),
            max_concurrent_fetches: Some(2),
            ..Config::default()
        };
        let opts = cfg.collector_options();
        assert_eq!(opts.fetch.timeout, Duration::from_millis(1500));
        assert_eq!(opts.max_concurrent_fetches, 2);
    }
}
