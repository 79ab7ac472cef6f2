// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::Write;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use tally_audit::{
	AuditEvent, AuditEventDto, AuditSystem, AuditUser, FileAuditLogQueryService, QueryFilter,
	UserId,
};
use tally_config::{AuditConfig, TallyConfig};
use tracing::{info, instrument};

#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
	/// Email of the user whose events to list (matched case-insensitively)
	#[arg(long, required_unless_present = "user_id")]
	pub email: Option<String>,

	/// Numeric ID of the user whose events to list
	#[arg(long)]
	pub user_id: Option<i64>,

	/// Only events at or after this RFC 3339 instant
	#[arg(long)]
	pub since: Option<DateTime<Utc>>,

	/// Only events with exactly this action
	#[arg(long)]
	pub action: Option<String>,

	/// Print one JSON object per line
	#[arg(long)]
	pub json: bool,
}

impl QueryArgs {
	fn user(&self) -> AuditUser {
		AuditUser {
			id: self.user_id.map(UserId::new),
			email: self.email.clone(),
		}
	}

	fn filter(&self) -> QueryFilter {
		QueryFilter {
			since: self.since,
			action: self.action.clone(),
		}
	}
}

#[derive(Debug, Clone, Args)]
pub struct RecordArgs {
	/// Action name, e.g. Login or CONSENT_GRANTED
	#[arg(long)]
	pub action: String,

	/// Outcome, e.g. Success or Failed
	#[arg(long)]
	pub status: Option<String>,

	#[arg(long)]
	pub email: Option<String>,

	#[arg(long)]
	pub user_id: Option<i64>,

	/// Source IP address
	#[arg(long)]
	pub ip: Option<String>,

	#[arg(long)]
	pub session_id: Option<String>,

	#[arg(long)]
	pub user_agent: Option<String>,

	#[arg(long)]
	pub message: Option<String>,

	/// Opaque supplementary payload
	#[arg(long)]
	pub extra: Option<String>,
}

impl RecordArgs {
	fn to_event(&self) -> AuditEvent {
		let mut builder = AuditEvent::builder(&self.action);
		let user = AuditUser {
			id: self.user_id.map(UserId::new),
			email: self.email.clone(),
		};
		if !user.is_anonymous() {
			builder = builder.actor(user);
		}
		if let Some(status) = &self.status {
			builder = builder.status(status);
		}
		if let Some(ip) = &self.ip {
			builder = builder.ip_address(ip);
		}
		if let Some(session_id) = &self.session_id {
			builder = builder.session_id(session_id);
		}
		if let Some(user_agent) = &self.user_agent {
			builder = builder.user_agent(user_agent);
		}
		if let Some(message) = &self.message {
			builder = builder.message(message);
		}
		if let Some(extra) = &self.extra {
			builder = builder.extra_data(extra);
		}
		builder.build()
	}
}

/// Print matching events newest first. Returns how many were printed.
#[instrument(skip(config, out))]
pub async fn run_query(args: &QueryArgs, config: &AuditConfig, out: &mut impl Write) -> Result<usize> {
	let service = FileAuditLogQueryService::new(config);
	let events = service.find(&args.user(), &args.filter()).await;

	for event in &events {
		if args.json {
			let line = serde_json::to_string(event).context("failed to serialize audit event")?;
			writeln!(out, "{line}")?;
		} else {
			writeln!(out, "{}", render_row(event))?;
		}
	}
	Ok(events.len())
}

/// Append one event, flushing before returning.
#[instrument(skip(config), fields(action = %args.action))]
pub async fn run_record(args: &RecordArgs, config: &AuditConfig) -> Result<()> {
	if !config.enabled {
		bail!("audit logging is disabled; set TALLY_AUDIT_ENABLED=true or enable it in the config file");
	}
	let mut config = config.clone();
	config.flush_on_write = true;

	let system = AuditSystem::start(config).await;
	let writer = system.writer();
	let Some(path) = writer.current_path().await else {
		system.shutdown().await;
		bail!("audit log could not be opened");
	};

	system.dispatcher().dispatch(args.to_event()).await;
	system.shutdown().await;

	info!(path = %path.display(), "audit event recorded");
	Ok(())
}

pub fn render_config(config: &TallyConfig) -> Result<String> {
	toml::to_string_pretty(config).context("failed to render configuration")
}

fn render_row(event: &AuditEventDto) -> String {
	let timestamp = event
		.timestamp
		.map(tally_audit::timestamp::format_timestamp)
		.unwrap_or_else(|| "unknown".to_string());
	let user = match (&event.user_id, &event.user_email) {
		(Some(id), Some(email)) => format!("{id} <{email}>"),
		(Some(id), None) => id.clone(),
		(None, Some(email)) => email.clone(),
		(None, None) => "-".to_string(),
	};

	format!(
		"{timestamp}  {:<24}  {:<8}  {user}  {}",
		or_dash(&event.action),
		or_dash(&event.action_status),
		or_dash(&event.message),
	)
}

fn or_dash(value: &Option<String>) -> &str {
	value.as_deref().unwrap_or("-")
}
