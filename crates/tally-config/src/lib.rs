// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the tally audit trail.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe resolved configuration
//! - Consistent environment variable naming (`TALLY_*`)
//!
//! # Usage
//!
//! ```ignore
//! use tally_config::load_config;
//!
//! let config = load_config()?;
//! println!("audit log at {}", config.audit.log_file_path);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::TallyConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use serde::Serialize;
use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TallyConfig {
	pub audit: AuditConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`TALLY_*`)
/// 2. Config file (`/etc/tally/tally.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<TallyConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<TallyConfig, ConfigError> {
	load_from_sources(vec![Box::new(DefaultsSource), Box::new(EnvSource)])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<TallyConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<TallyConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = TallyConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	Ok(finalize(merged))
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: TallyConfigLayer) -> TallyConfig {
	let audit = layer.audit.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		audit_enabled = audit.enabled,
		audit_log_file = %audit.log_file_path,
		flush_on_write = audit.flush_on_write,
		flush_interval_ms = audit.flush_interval_ms,
		"configuration loaded"
	);

	TallyConfig { audit, logging }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_finalize_empty_layer_gives_defaults() {
		let config = finalize(TallyConfigLayer::default());
		assert_eq!(config.audit, AuditConfig::default());
		assert_eq!(config.logging, LoggingConfig::default());
	}

	#[test]
	fn test_toml_file_values_are_resolved() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("tally.toml");
		std::fs::write(
			&path,
			"[audit]\nenabled = true\nlog_file_path = \"/srv/audit.log\"\nflush_interval_ms = 250\n",
		)
		.unwrap();

		let config = load_from_sources(vec![
			Box::new(DefaultsSource),
			Box::new(TomlSource::new(&path)),
		])
		.unwrap();

		assert!(config.audit.enabled);
		assert_eq!(config.audit.log_file_path, "/srv/audit.log");
		assert_eq!(config.audit.flush_interval_ms, 250);
		assert!(!config.audit.flush_on_write);
	}

	#[test]
	fn test_sources_are_applied_in_precedence_order() {
		struct Fixed(Precedence, bool);

		impl ConfigSource for Fixed {
			fn name(&self) -> &'static str {
				"fixed"
			}

			fn precedence(&self) -> Precedence {
				self.0
			}

			fn load(&self) -> Result<TallyConfigLayer, ConfigError> {
				Ok(TallyConfigLayer {
					audit: Some(AuditConfigLayer {
						enabled: Some(self.1),
						..Default::default()
					}),
					logging: None,
				})
			}
		}

		// Listed out of order on purpose; the environment must still win.
		let config = load_from_sources(vec![
			Box::new(Fixed(Precedence::Environment, true)),
			Box::new(Fixed(Precedence::ConfigFile, false)),
		])
		.unwrap();
		assert!(config.audit.enabled);
	}
}
