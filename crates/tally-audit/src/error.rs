// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

pub type AuditResult<T> = Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
	#[error("i/o error on audit log {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("configuration error: {0}")]
	Config(#[from] tally_config::ConfigError),

	#[error("audit writer panicked: {0}")]
	Panicked(String),
}

impl AuditError {
	pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		AuditError::Io {
			path: path.into(),
			source,
		}
	}
}
