// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The single append point for the audit log file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tally_config::AuditConfig;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{AuditError, AuditResult};
use crate::event::AuditEvent;
use crate::line::{format_line, LOG_HEADER};

/// Fixed file name used in the temp directory when the configured path is unusable.
pub const FALLBACK_FILE_NAME: &str = "user-audit.log";

/// Location the writer falls back to and the query side checks second.
pub fn default_fallback_path() -> PathBuf {
	std::env::temp_dir().join(FALLBACK_FILE_NAME)
}

/// Destination for audit events.
///
/// Implementations never return errors: failures are logged and swallowed so
/// that auditing cannot fail the operation being audited.
#[async_trait]
pub trait AuditWriter: Send + Sync {
	fn name(&self) -> &str;

	async fn write(&self, event: &AuditEvent);

	async fn flush(&self);
}

struct OpenLog {
	path: PathBuf,
	file: BufWriter<fs::File>,
}

impl OpenLog {
	async fn append(&mut self, line: &str, flush: bool) -> AuditResult<()> {
		self
			.file
			.write_all(line.as_bytes())
			.await
			.map_err(|e| AuditError::io(&self.path, e))?;
		if flush {
			self.flush().await?;
		}
		Ok(())
	}

	async fn flush(&mut self) -> AuditResult<()> {
		self
			.file
			.flush()
			.await
			.map_err(|e| AuditError::io(&self.path, e))
	}
}

enum WriterState {
	Unopened,
	/// Configuration was invalid or no file could be opened. Permanent.
	Disabled,
	Open(OpenLog),
	Closed,
}

/// Appends one pipe-delimited line per event to the configured log file.
///
/// All operations serialize on one mutex, so lines from concurrent writers
/// never interleave and a flush never races a write.
pub struct FileAuditLogWriter {
	config: AuditConfig,
	fallback_path: PathBuf,
	state: Mutex<WriterState>,
	warned_discard: AtomicBool,
}

impl FileAuditLogWriter {
	pub fn new(config: AuditConfig) -> Self {
		Self {
			config,
			fallback_path: default_fallback_path(),
			state: Mutex::new(WriterState::Unopened),
			warned_discard: AtomicBool::new(false),
		}
	}

	/// Override the temp-directory fallback location.
	pub fn with_fallback_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.fallback_path = path.into();
		self
	}

	pub fn config(&self) -> &AuditConfig {
		&self.config
	}

	pub fn fallback_path(&self) -> &Path {
		&self.fallback_path
	}

	/// Path of the file currently being appended to, if any.
	pub async fn current_path(&self) -> Option<PathBuf> {
		match &*self.state.lock().await {
			WriterState::Open(log) => Some(log.path.clone()),
			_ => None,
		}
	}

	pub async fn is_open(&self) -> bool {
		matches!(&*self.state.lock().await, WriterState::Open(_))
	}

	/// Open the log file, writing the header if the file is new or empty.
	///
	/// Calling this while already open does nothing. An invalid configuration
	/// or an unopenable file turns the writer into a permanent no-op.
	#[instrument(skip(self), fields(path = %self.config.log_file_path))]
	pub async fn open(&self) {
		let mut state = self.state.lock().await;
		match &*state {
			WriterState::Open(_) | WriterState::Disabled => return,
			WriterState::Unopened | WriterState::Closed => {}
		}

		let path = match self.validated_path() {
			Ok(path) => path,
			Err(e) => {
				if self.config.enabled {
					error!(error = %e, "audit log configuration is invalid, audit events will be discarded");
				} else {
					info!("audit logging is disabled");
				}
				*state = WriterState::Disabled;
				return;
			}
		};

		let opened = match open_log(&path).await {
			Ok(log) => Ok(log),
			Err(e) => {
				warn!(
					error = %e,
					fallback = %self.fallback_path.display(),
					"could not open audit log, falling back to temp directory"
				);
				open_log(&self.fallback_path).await
			}
		};

		*state = match opened {
			Ok(log) => {
				info!(path = %log.path.display(), "audit log opened");
				WriterState::Open(log)
			}
			Err(e) => {
				error!(error = %e, "could not open any audit log, audit events will be discarded");
				WriterState::Disabled
			}
		};
	}

	/// Flush and release the file. A later [`open`](Self::open) reopens it.
	#[instrument(skip(self))]
	pub async fn close(&self) {
		let mut state = self.state.lock().await;
		if let WriterState::Open(log) = &mut *state {
			if let Err(e) = log.flush().await {
				warn!(error = %e, "failed to flush audit log on close");
			}
			debug!(path = %log.path.display(), "audit log closed");
			*state = WriterState::Closed;
		}
	}

	fn validated_path(&self) -> AuditResult<PathBuf> {
		Ok(self.config.validate()?.to_path_buf())
	}

	fn note_discarded(&self, state: &WriterState, event: &AuditEvent) {
		let misconfigured = self.config.enabled && matches!(state, WriterState::Disabled);
		if misconfigured && !self.warned_discard.swap(true, Ordering::Relaxed) {
			warn!(
				action = event.action(),
				"audit log is unavailable, discarding audit events"
			);
		} else {
			debug!(action = event.action(), "audit log not open, event discarded");
		}
	}
}

#[async_trait]
impl AuditWriter for FileAuditLogWriter {
	fn name(&self) -> &str {
		"file"
	}

	async fn write(&self, event: &AuditEvent) {
		let mut state = self.state.lock().await;
		match &mut *state {
			WriterState::Open(log) => {
				let mut line = format_line(event);
				line.push('\n');
				if let Err(e) = log.append(&line, self.config.flush_on_write).await {
					warn!(error = %e, action = event.action(), "failed to write audit event");
				}
			}
			other => self.note_discarded(other, event),
		}
	}

	async fn flush(&self) {
		let mut state = self.state.lock().await;
		if let WriterState::Open(log) = &mut *state {
			if let Err(e) = log.flush().await {
				warn!(error = %e, "failed to flush audit log");
			}
		}
	}
}

async fn open_log(path: &Path) -> AuditResult<OpenLog> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent)
			.await
			.map_err(|e| AuditError::io(parent, e))?;
	}

	let needs_header = match fs::metadata(path).await {
		Ok(meta) => meta.len() == 0,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
		Err(e) => return Err(AuditError::io(path, e)),
	};

	let file = OpenOptions::new()
		.create(true)
		.append(true)
		.open(path)
		.await
		.map_err(|e| AuditError::io(path, e))?;

	let mut log = OpenLog {
		path: path.to_path_buf(),
		file: BufWriter::new(file),
	};
	if needs_header {
		log.append(&format!("{LOG_HEADER}\n"), true).await?;
	}
	Ok(log)
}
