//! CLI command implementations for uwsgi-stats-exporter.
//!
//! - `config`: Configuration file generation
//! - `test`: Collection testing against the configured stats source

pub mod config;
pub mod test;

// Re-export command functions
pub use config::command_config;
pub use test::command_test;
