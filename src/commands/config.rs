//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::Config;

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("uwsgi-stats-exporter.yaml"));

    let content = render(&config, format, commented)?;

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

fn render(
    config: &Config,
    format: ConfigFormat,
    commented: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => {
            let yaml = serde_yaml::to_string(config)?;
            if commented {
                add_config_comments(yaml)
            } else {
                yaml
            }
        }
    })
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# uWSGI Stats Exporter Configuration
# ===================================
#
# Server
# ------
# listen_address: "0.0.0.0:9031"   # ip:port for the HTTP server
#
# Stats Source
# ------------
# stats_address: "unix://uwsgi.sock"
#   file:///path/stats.json          one JSON file
#   fileglob:///path/*.json          every matching file
#   unix:///run/uwsgi.sock           one stats socket
#   unixglob:///run/uwsgi/*.sock     every matching socket
# fetch_timeout_ms: 5000           # Deadline for reading one source
# max_concurrent_fetches: 4        # Sources read in parallel per scrape
#
# Feature Flags
# -------------
# enable_health: true              # Enable /health endpoint
# enable_telemetry: true           # Export uwsgi_exporter_* metrics
#
# Logging
# -------
# log_level: "info"                # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}
