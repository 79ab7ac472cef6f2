// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read side of the audit trail.
//!
//! Every query reads the whole log file once, without coordinating with the
//! writer, so lines still sitting in the writer's buffer are not visible.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_config::AuditConfig;
use tokio::fs;
use tracing::{debug, instrument, warn};

use crate::dto::AuditEventDto;
use crate::event::AuditUser;
use crate::line::{is_header, parse_line};
use crate::writer::default_fallback_path;

/// Lookups over recorded events, newest first.
///
/// None of these fail: a missing log file or an anonymous user yields an
/// empty list.
#[async_trait]
pub trait AuditLogQuery: Send + Sync {
	async fn find_by_user(&self, user: &AuditUser) -> Vec<AuditEventDto>;

	/// Events at or after `since`. Events with an unknown timestamp are kept.
	async fn find_by_user_since(
		&self,
		user: &AuditUser,
		since: DateTime<Utc>,
	) -> Vec<AuditEventDto>;

	async fn find_by_user_and_action(&self, user: &AuditUser, action: &str)
		-> Vec<AuditEventDto>;
}

/// Optional restrictions applied on top of the user match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
	pub since: Option<DateTime<Utc>>,
	pub action: Option<String>,
}

impl QueryFilter {
	pub fn since(mut self, since: DateTime<Utc>) -> Self {
		self.since = Some(since);
		self
	}

	pub fn action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	fn allows(&self, event: &AuditEventDto) -> bool {
		if let (Some(since), Some(timestamp)) = (self.since, event.timestamp) {
			if timestamp < since {
				return false;
			}
		}
		match &self.action {
			Some(action) => event.has_action(action),
			None => true,
		}
	}
}

/// Queries the pipe-delimited log written by
/// [`FileAuditLogWriter`](crate::writer::FileAuditLogWriter).
pub struct FileAuditLogQueryService {
	log_path: PathBuf,
	fallback_path: PathBuf,
}

impl FileAuditLogQueryService {
	pub fn new(config: &AuditConfig) -> Self {
		Self {
			log_path: config.log_path().map(Path::to_path_buf).unwrap_or_default(),
			fallback_path: default_fallback_path(),
		}
	}

	/// Override the temp-directory fallback location.
	pub fn with_fallback_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.fallback_path = path.into();
		self
	}

	/// The file a query would read right now: the configured path if it
	/// exists, otherwise the fallback if that exists.
	pub async fn resolve_log_path(&self) -> Option<PathBuf> {
		let configured = (!self.log_path.as_os_str().is_empty()).then_some(&self.log_path);
		for candidate in configured.into_iter().chain([&self.fallback_path]) {
			if fs::try_exists(candidate).await.unwrap_or(false) {
				return Some(candidate.clone());
			}
		}
		None
	}

	/// Events belonging to `user` that pass `filter`, newest first.
	#[instrument(skip(self))]
	pub async fn find(&self, user: &AuditUser, filter: &QueryFilter) -> Vec<AuditEventDto> {
		if user.is_anonymous() {
			debug!("anonymous user, no audit events to match");
			return Vec::new();
		}
		let Some(path) = self.resolve_log_path().await else {
			debug!(path = %self.log_path.display(), "no audit log file found");
			return Vec::new();
		};
		let Some(content) = read_log(&path).await else {
			return Vec::new();
		};

		let mut events: Vec<AuditEventDto> = content
			.lines()
			.filter(|line| !is_header(line))
			.filter_map(parse_line)
			.filter(|event| belongs_to(event, user) && filter.allows(event))
			.collect();
		sort_newest_first(&mut events);

		debug!(path = %path.display(), count = events.len(), "audit query complete");
		events
	}
}

#[async_trait]
impl AuditLogQuery for FileAuditLogQueryService {
	async fn find_by_user(&self, user: &AuditUser) -> Vec<AuditEventDto> {
		self.find(user, &QueryFilter::default()).await
	}

	async fn find_by_user_since(
		&self,
		user: &AuditUser,
		since: DateTime<Utc>,
	) -> Vec<AuditEventDto> {
		self.find(user, &QueryFilter::default().since(since)).await
	}

	async fn find_by_user_and_action(
		&self,
		user: &AuditUser,
		action: &str,
	) -> Vec<AuditEventDto> {
		self.find(user, &QueryFilter::default().action(action)).await
	}
}

async fn read_log(path: &Path) -> Option<String> {
	match fs::read(path).await {
		Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
		Err(e) => {
			warn!(path = %path.display(), error = %e, "failed to read audit log");
			None
		}
	}
}

/// Email matches case-insensitively (Unicode lowercase), ID matches exactly.
/// Either is enough.
fn belongs_to(event: &AuditEventDto, user: &AuditUser) -> bool {
	let email_matches = match (&user.email, &event.user_email) {
		(Some(wanted), Some(found)) => wanted.to_lowercase() == found.to_lowercase(),
		_ => false,
	};
	let id_matches = match (user.id, &event.user_id) {
		(Some(wanted), Some(found)) => wanted.to_string() == *found,
		_ => false,
	};
	email_matches || id_matches
}

/// Descending by timestamp; unknown timestamps last, in file order.
fn sort_newest_first(events: &mut [AuditEventDto]) {
	events.sort_by(|a, b| match (a.timestamp, b.timestamp) {
		(Some(a), Some(b)) => b.cmp(&a),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	});
}
