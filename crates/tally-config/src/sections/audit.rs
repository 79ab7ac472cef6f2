// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit trail configuration section.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

fn default_flush_interval_ms() -> u64 {
	DEFAULT_FLUSH_INTERVAL_MS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditConfigLayer {
	pub enabled: Option<bool>,
	pub log_file_path: Option<String>,
	pub flush_on_write: Option<bool>,
	pub flush_interval_ms: Option<u64>,
}

impl AuditConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.log_file_path.is_some() {
			self.log_file_path = other.log_file_path;
		}
		if other.flush_on_write.is_some() {
			self.flush_on_write = other.flush_on_write;
		}
		if other.flush_interval_ms.is_some() {
			self.flush_interval_ms = other.flush_interval_ms;
		}
	}

	pub fn finalize(self) -> AuditConfig {
		AuditConfig {
			enabled: self.enabled.unwrap_or(false),
			log_file_path: self
				.log_file_path
				.map(|path| path.trim().to_string())
				.unwrap_or_default(),
			flush_on_write: self.flush_on_write.unwrap_or(false),
			flush_interval_ms: self
				.flush_interval_ms
				.filter(|ms| *ms > 0)
				.unwrap_or_else(default_flush_interval_ms),
		}
	}
}

/// Resolved audit configuration. Read-only once the process has started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditConfig {
	/// When false the audit trail is inert: nothing is opened, written or flushed.
	pub enabled: bool,
	/// Path of the single append-only log file.
	pub log_file_path: String,
	/// Flush after every line instead of relying on the periodic flush.
	pub flush_on_write: bool,
	/// Period of the background flush when `flush_on_write` is off.
	#[serde(default = "default_flush_interval_ms")]
	pub flush_interval_ms: u64,
}

impl AuditConfig {
	/// A config with auditing switched on, writing to `path`.
	pub fn enabled_at(path: impl Into<String>) -> Self {
		Self {
			enabled: true,
			log_file_path: path.into(),
			..Default::default()
		}
	}

	/// Checks that an enabled config names a log file.
	///
	/// Returns the configured path on success. A disabled config is reported
	/// as a validation error too, so callers can log why nothing gets opened.
	pub fn validate(&self) -> Result<&Path, ConfigError> {
		if !self.enabled {
			return Err(ConfigError::Validation(
				"audit logging is disabled".to_string(),
			));
		}
		self.log_path().ok_or_else(|| {
			ConfigError::Validation(
				"audit logging is enabled but no log file path is configured".to_string(),
			)
		})
	}

	/// The configured path without surrounding whitespace, if one is set.
	///
	/// Writer and query both resolve the file through this.
	pub fn log_path(&self) -> Option<&Path> {
		let trimmed = self.log_file_path.trim();
		(!trimmed.is_empty()).then(|| Path::new(trimmed))
	}

	/// Whether a periodic flush task should run.
	pub fn needs_scheduled_flush(&self) -> bool {
		self.enabled && !self.flush_on_write
	}

	pub fn flush_interval(&self) -> Duration {
		Duration::from_millis(self.flush_interval_ms.max(1))
	}
}

impl Default for AuditConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			log_file_path: String::new(),
			flush_on_write: false,
			flush_interval_ms: default_flush_interval_ms(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_default_values() {
		let config = AuditConfig::default();
		assert!(!config.enabled);
		assert!(config.log_file_path.is_empty());
		assert!(!config.flush_on_write);
		assert_eq!(config.flush_interval_ms, 1000);
	}

	#[test]
	fn test_layer_finalize_defaults() {
		let config = AuditConfigLayer::default().finalize();
		assert_eq!(config, AuditConfig::default());
	}

	#[test]
	fn test_layer_finalize_with_values() {
		let layer = AuditConfigLayer {
			enabled: Some(true),
			log_file_path: Some("/var/log/tally/audit.log".to_string()),
			flush_on_write: Some(true),
			flush_interval_ms: Some(250),
		};
		let config = layer.finalize();
		assert!(config.enabled);
		assert_eq!(config.log_file_path, "/var/log/tally/audit.log");
		assert!(config.flush_on_write);
		assert_eq!(config.flush_interval_ms, 250);
	}

	#[test]
	fn test_zero_interval_falls_back_to_default() {
		let layer = AuditConfigLayer {
			flush_interval_ms: Some(0),
			..Default::default()
		};
		assert_eq!(layer.finalize().flush_interval_ms, 1000);
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = AuditConfigLayer {
			enabled: Some(true),
			log_file_path: Some("audit.log".to_string()),
			..Default::default()
		};
		let overlay = AuditConfigLayer {
			enabled: Some(false),
			flush_interval_ms: Some(5000),
			..Default::default()
		};
		base.merge(overlay);
		assert_eq!(base.enabled, Some(false));
		assert_eq!(base.log_file_path.as_deref(), Some("audit.log"));
		assert_eq!(base.flush_interval_ms, Some(5000));
	}

	#[test]
	fn test_validate_accepts_enabled_with_path() {
		let config = AuditConfig::enabled_at("/tmp/audit.log");
		assert_eq!(config.validate().unwrap(), Path::new("/tmp/audit.log"));
	}

	#[test]
	fn test_validate_rejects_missing_path() {
		let config = AuditConfig::enabled_at("   ");
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("no log file path"));
	}

	#[test]
	fn test_validate_rejects_disabled() {
		let config = AuditConfig {
			log_file_path: "/tmp/audit.log".to_string(),
			..Default::default()
		};
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_finalize_trims_path() {
		let layer = AuditConfigLayer {
			enabled: Some(true),
			log_file_path: Some("  /var/log/tally/audit.log \n".to_string()),
			..Default::default()
		};
		assert_eq!(layer.finalize().log_file_path, "/var/log/tally/audit.log");
	}

	#[test]
	fn test_validate_and_log_path_ignore_surrounding_whitespace() {
		let config = AuditConfig::enabled_at("/tmp/audit.log ");
		assert_eq!(config.validate().unwrap(), Path::new("/tmp/audit.log"));
		assert_eq!(config.log_path(), Some(Path::new("/tmp/audit.log")));
		assert_eq!(AuditConfig::enabled_at(" \t").log_path(), None);
	}

	#[test]
	fn test_needs_scheduled_flush() {
		let mut config = AuditConfig::enabled_at("audit.log");
		assert!(config.needs_scheduled_flush());

		config.flush_on_write = true;
		assert!(!config.needs_scheduled_flush());

		config.flush_on_write = false;
		config.enabled = false;
		assert!(!config.needs_scheduled_flush());
	}

	#[test]
	fn test_toml_roundtrip() {
		let config = AuditConfig {
			enabled: true,
			log_file_path: "/var/log/tally/audit.log".to_string(),
			flush_on_write: false,
			flush_interval_ms: 30000,
		};
		let toml_str = toml::to_string(&config).unwrap();
		let parsed: AuditConfig = toml::from_str(&toml_str).unwrap();
		assert_eq!(config, parsed);
	}

	#[test]
	fn test_layer_parses_partial_toml() {
		let layer: AuditConfigLayer = toml::from_str("enabled = true\n").unwrap();
		assert_eq!(layer.enabled, Some(true));
		assert!(layer.log_file_path.is_none());
	}

	proptest! {
		#[test]
		fn finalized_interval_is_always_positive(ms in proptest::option::of(0u64..100_000)) {
			let layer = AuditConfigLayer {
				flush_interval_ms: ms,
				..Default::default()
			};
			let config = layer.finalize();
			prop_assert!(config.flush_interval_ms > 0);
			prop_assert!(config.flush_interval() > Duration::ZERO);
		}
	}
}
