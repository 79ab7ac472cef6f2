// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::writer::AuditWriter;

/// Background task that flushes the writer on a fixed period.
///
/// A tick that comes due while a previous flush still holds the writer is
/// skipped rather than queued.
pub struct FlushScheduler {
	shutdown_tx: broadcast::Sender<()>,
	handle: Mutex<Option<JoinHandle<()>>>,
}

impl FlushScheduler {
	/// Spawn the flush loop. Must be called inside a tokio runtime.
	pub fn start(writer: Arc<dyn AuditWriter>, interval: Duration) -> Self {
		let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

		let handle = tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
			// The first tick completes immediately.
			ticker.tick().await;

			loop {
				tokio::select! {
					_ = ticker.tick() => {
						writer.flush().await;
					}
					_ = shutdown_rx.recv() => {
						debug!(writer = writer.name(), "audit flush scheduler shutting down");
						break;
					}
				}
			}
		});

		info!(interval_ms = interval.as_millis() as u64, "audit flush scheduler started");
		Self {
			shutdown_tx,
			handle: Mutex::new(Some(handle)),
		}
	}

	/// Stop the loop and wait for it to exit. Safe to call more than once.
	pub async fn shutdown(&self) {
		let Some(handle) = self.handle.lock().await.take() else {
			return;
		};
		let _ = self.shutdown_tx.send(());
		if let Err(e) = handle.await {
			warn!(error = %e, "audit flush scheduler task failed");
		}
	}

	pub async fn is_running(&self) -> bool {
		self
			.handle
			.lock()
			.await
			.as_ref()
			.is_some_and(|handle| !handle.is_finished())
	}
}
