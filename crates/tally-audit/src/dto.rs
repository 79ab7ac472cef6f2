// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One log line reconstructed by the query side.
///
/// Every field is optional: `null`, empty and whitespace-only columns are
/// absent, and `timestamp` is `None` when the date text matched no known
/// format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEventDto {
	pub timestamp: Option<DateTime<Utc>>,
	pub action: Option<String>,
	pub action_status: Option<String>,
	pub user_id: Option<String>,
	pub user_email: Option<String>,
	pub ip_address: Option<String>,
	pub session_id: Option<String>,
	pub message: Option<String>,
	pub user_agent: Option<String>,
	pub extra_data: Option<String>,
}

impl AuditEventDto {
	pub fn has_action(&self, action: &str) -> bool {
		self.action.as_deref() == Some(action)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn serializes_with_camel_case_keys() {
		let dto = AuditEventDto {
			action: Some("Login".to_string()),
			user_email: Some("a@x.com".to_string()),
			..Default::default()
		};
		let json = serde_json::to_value(&dto).unwrap();
		assert_eq!(json["action"], "Login");
		assert_eq!(json["userEmail"], "a@x.com");
		assert!(json["sessionId"].is_null());
	}

	#[test]
	fn has_action_is_exact() {
		let dto = AuditEventDto {
			action: Some("CONSENT_GRANTED".to_string()),
			..Default::default()
		};
		assert!(dto.has_action("CONSENT_GRANTED"));
		assert!(!dto.has_action("consent_granted"));
		assert!(!AuditEventDto::default().has_action(""));
	}
}
