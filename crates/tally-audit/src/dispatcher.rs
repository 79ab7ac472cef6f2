// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, instrument, warn};

use crate::error::{AuditError, AuditResult};
use crate::event::AuditEvent;
use crate::writer::AuditWriter;

/// Entry point application code uses to record events.
///
/// Nothing that goes wrong while writing, including a panic inside the
/// writer, reaches the caller.
#[derive(Clone)]
pub struct AuditDispatcher {
	enabled: bool,
	writer: Arc<dyn AuditWriter>,
}

impl AuditDispatcher {
	pub fn new(enabled: bool, writer: Arc<dyn AuditWriter>) -> Self {
		Self { enabled, writer }
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	/// Write the event on the calling task.
	///
	/// Events dispatched one after another from the same task are written in
	/// that order.
	#[instrument(skip(self, event), fields(action = %event.action()))]
	pub async fn dispatch(&self, event: AuditEvent) {
		if !self.enabled {
			return;
		}
		if let Err(e) = write_isolated(self.writer.as_ref(), &event).await {
			error!(writer = self.writer.name(), error = %e, "audit write failed");
		}
	}

	/// Hand the write to the runtime and return immediately.
	///
	/// Returns `None` when auditing is off or when called outside a tokio
	/// runtime, in which case the event is dropped.
	pub fn dispatch_detached(&self, event: AuditEvent) -> Option<JoinHandle<()>> {
		if !self.enabled {
			return None;
		}
		let Ok(runtime) = Handle::try_current() else {
			warn!(action = event.action(), "no async runtime, audit event dropped");
			return None;
		};

		let dispatcher = self.clone();
		Some(runtime.spawn(async move { dispatcher.dispatch(event).await }))
	}
}

async fn write_isolated(writer: &dyn AuditWriter, event: &AuditEvent) -> AuditResult<()> {
	AssertUnwindSafe(writer.write(event))
		.catch_unwind()
		.await
		.map_err(|payload| AuditError::Panicked(panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic payload".to_string()
	}
}
