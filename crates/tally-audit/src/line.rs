// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The pipe-delimited line format of the audit log file.
//!
//! Column order is fixed:
//! `Date|Action|Action Status|User ID|Email|IP Address|SessionId|Message|User Agent|Extra Data`.
//! Absent values are written as the literal `null`. The delimiter is not
//! escaped, so a value containing `|` shifts every column after it. Line
//! breaks are not escaped either: a line feed inside a value splits the
//! record into two short lines and both are dropped on read.

use std::borrow::Cow;

use tracing::debug;

use crate::dto::AuditEventDto;
use crate::event::AuditEvent;
use crate::timestamp::{format_timestamp, parse_timestamp};

/// First line of every log file.
pub const LOG_HEADER: &str =
	"Date|Action|Action Status|User ID|Email|IP Address|SessionId|Message|User Agent|Extra Data";

/// Prefix identifying a header line wherever it appears.
pub const HEADER_PREFIX: &str = "Date|Action";

pub const FIELD_DELIMITER: char = '|';
pub const FIELD_COUNT: usize = 10;

const NULL_FIELD: &str = "null";

/// Render one event as a log line, without the line terminator.
pub fn format_line(event: &AuditEvent) -> String {
	let actor = event.actor();
	let user_id = actor.and_then(|user| user.id).map(|id| id.to_string());
	let email = actor.and_then(|user| user.email.as_deref());

	let fields: [Cow<'_, str>; FIELD_COUNT] = [
		Cow::Owned(format_timestamp(event.timestamp())),
		Cow::Borrowed(event.action()),
		field(event.action_status()),
		field(user_id.as_deref()),
		field(email),
		field(event.ip_address()),
		field(event.session_id()),
		field(event.message()),
		field(event.user_agent()),
		field(event.extra_data()),
	];

	fields.join("|")
}

fn field(value: Option<&str>) -> Cow<'_, str> {
	Cow::Borrowed(value.unwrap_or(NULL_FIELD))
}

/// True for the column-header line.
pub fn is_header(line: &str) -> bool {
	line.starts_with(HEADER_PREFIX)
}

/// Parse one data line.
///
/// Returns `None` for blank lines and for lines with fewer than
/// [`FIELD_COUNT`] columns. Extra columns (from an unescaped `|` in a value)
/// are ignored. An unparseable date keeps the line with an unknown timestamp.
pub fn parse_line(line: &str) -> Option<AuditEventDto> {
	let line = line.trim_end_matches(['\r', '\n']);
	if line.trim().is_empty() {
		return None;
	}

	let parts: Vec<&str> = line.split(FIELD_DELIMITER).collect();
	if parts.len() < FIELD_COUNT {
		debug!(
			fields = parts.len(),
			expected = FIELD_COUNT,
			line,
			"skipping malformed audit log line"
		);
		return None;
	}

	Some(AuditEventDto {
		timestamp: parse_timestamp(parts[0]),
		action: normalize(parts[1]),
		action_status: normalize(parts[2]),
		user_id: normalize(parts[3]),
		user_email: normalize(parts[4]),
		ip_address: normalize(parts[5]),
		session_id: normalize(parts[6]),
		message: normalize(parts[7]),
		user_agent: normalize(parts[8]),
		extra_data: normalize(parts[9]),
	})
}

/// `null`, empty and whitespace-only values all mean "absent".
fn normalize(value: &str) -> Option<String> {
	let trimmed = value.trim();
	if trimmed.is_empty() || trimmed == NULL_FIELD {
		None
	} else {
		Some(trimmed.to_string())
	}
}
