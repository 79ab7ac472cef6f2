// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::sync::Arc;

use tally_config::AuditConfig;
use tracing::{info, instrument};

use crate::dispatcher::AuditDispatcher;
use crate::query::FileAuditLogQueryService;
use crate::scheduler::FlushScheduler;
use crate::writer::{default_fallback_path, AuditWriter, FileAuditLogWriter};

/// The audit trail of one process: writer, dispatcher, periodic flush and query.
///
/// Construct once at startup and hand out [`dispatcher`](Self::dispatcher)
/// clones to the code that emits events. Call [`shutdown`](Self::shutdown)
/// before exit so buffered lines reach the file.
pub struct AuditSystem {
	config: AuditConfig,
	writer: Arc<FileAuditLogWriter>,
	dispatcher: AuditDispatcher,
	query: Arc<FileAuditLogQueryService>,
	scheduler: Option<FlushScheduler>,
}

impl AuditSystem {
	/// Open the log and start the flush scheduler if the config asks for one.
	///
	/// Never fails. A disabled or invalid config yields an inert system whose
	/// queries still read any existing log file.
	pub async fn start(config: AuditConfig) -> Self {
		Self::start_with_fallback(config, default_fallback_path()).await
	}

	/// Like [`start`](Self::start) with a custom temp-directory fallback.
	#[instrument(skip(config, fallback_path), fields(enabled = config.enabled))]
	pub async fn start_with_fallback(config: AuditConfig, fallback_path: impl Into<PathBuf>) -> Self {
		let fallback_path = fallback_path.into();
		let writer = Arc::new(
			FileAuditLogWriter::new(config.clone()).with_fallback_path(fallback_path.clone()),
		);
		writer.open().await;

		let query =
			Arc::new(FileAuditLogQueryService::new(&config).with_fallback_path(fallback_path));
		let dispatcher = AuditDispatcher::new(config.enabled, writer.clone());

		let scheduler = config.needs_scheduled_flush().then(|| {
			FlushScheduler::start(
				writer.clone() as Arc<dyn AuditWriter>,
				config.flush_interval(),
			)
		});

		info!(
			enabled = config.enabled,
			flush_on_write = config.flush_on_write,
			scheduled_flush = scheduler.is_some(),
			"audit system started"
		);

		Self {
			config,
			writer,
			dispatcher,
			query,
			scheduler,
		}
	}

	pub fn config(&self) -> &AuditConfig {
		&self.config
	}

	pub fn dispatcher(&self) -> AuditDispatcher {
		self.dispatcher.clone()
	}

	pub fn query(&self) -> Arc<FileAuditLogQueryService> {
		self.query.clone()
	}

	pub fn writer(&self) -> Arc<FileAuditLogWriter> {
		self.writer.clone()
	}

	pub fn has_scheduler(&self) -> bool {
		self.scheduler.is_some()
	}

	/// Stop the scheduler, then flush and close the writer.
	#[instrument(skip(self))]
	pub async fn shutdown(self) {
		if let Some(scheduler) = &self.scheduler {
			scheduler.shutdown().await;
		}
		self.writer.close().await;
		info!("audit system stopped");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::{actions, AuditEvent, AuditUser};
	use crate::query::AuditLogQuery;
	use tempfile::TempDir;

	fn config_in(dir: &TempDir, flush_on_write: bool) -> AuditConfig {
		let mut config = AuditConfig::enabled_at(dir.path().join("audit.log").to_string_lossy());
		config.flush_on_write = flush_on_write;
		config
	}

	#[tokio::test]
	async fn scheduler_runs_only_without_flush_on_write() {
		let dir = TempDir::new().unwrap();
		let fallback = dir.path().join("fallback.log");

		let buffered = AuditSystem::start_with_fallback(config_in(&dir, false), &fallback).await;
		assert!(buffered.has_scheduler());
		buffered.shutdown().await;

		let immediate = AuditSystem::start_with_fallback(config_in(&dir, true), &fallback).await;
		assert!(!immediate.has_scheduler());
		immediate.shutdown().await;

		let disabled = AuditSystem::start_with_fallback(AuditConfig::default(), &fallback).await;
		assert!(!disabled.has_scheduler());
		assert!(!disabled.dispatcher().is_enabled());
		disabled.shutdown().await;
	}

	#[tokio::test]
	async fn shutdown_flushes_buffered_events() {
		let dir = TempDir::new().unwrap();
		let system = AuditSystem::start_with_fallback(
			config_in(&dir, false),
			dir.path().join("fallback.log"),
		)
		.await;
		let user = AuditUser::new(5, "e@x.com");

		system
			.dispatcher()
			.dispatch(AuditEvent::builder(actions::LOGIN).actor(user.clone()).build())
			.await;
		let query = system.query();
		system.shutdown().await;

		let events = query.find_by_user(&user).await;
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].action.as_deref(), Some("Login"));
	}

	#[tokio::test]
	async fn writer_and_query_agree_on_padded_path() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("audit.log");
		let config = AuditConfig {
			flush_on_write: true,
			..AuditConfig::enabled_at(format!(" {} ", path.display()))
		};
		let system = AuditSystem::start_with_fallback(config, dir.path().join("fallback.log")).await;
		assert_eq!(system.writer().current_path().await, Some(path.clone()));

		let user = AuditUser::with_email("a@x.com");
		system
			.dispatcher()
			.dispatch(AuditEvent::builder(actions::LOGIN).actor(user.clone()).build())
			.await;
		let query = system.query();
		system.shutdown().await;

		assert_eq!(query.resolve_log_path().await, Some(path));
		assert_eq!(query.find_by_user(&user).await.len(), 1);
	}
}
