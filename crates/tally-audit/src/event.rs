// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core event types for the audit trail.
//!
//! - [`AuditUser`]: the identity an event concerns, and the identity queries match on
//! - [`AuditEvent`]: one immutable occurrence, timestamped at construction
//! - [`AuditEventBuilder`]: fluent API for constructing events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action names emitted by the built-in flows.
pub mod actions {
	pub const LOGIN: &str = "Login";
	pub const LOGOUT: &str = "Logout";
	pub const REGISTRATION: &str = "Registration";
	pub const OAUTH2_REGISTRATION: &str = "OAuth2 Registration Success";
	pub const PASSWORD_UPDATE: &str = "PasswordUpdate";
	pub const FORGOT_PASSWORD_EMAIL: &str = "sendForgotPasswordVerificationEmail";
	pub const ADMIN_PASSWORD_RESET: &str = "adminInitiatedPasswordReset";
	pub const ACCOUNT_DELETED: &str = "DeleteAccount";
	pub const CONSENT_GRANTED: &str = "CONSENT_GRANTED";
	pub const CONSENT_WITHDRAWN: &str = "CONSENT_WITHDRAWN";
	pub const CONSENT_EXPIRED: &str = "CONSENT_EXPIRED";
}

/// Outcome strings emitted by the built-in flows.
pub mod statuses {
	pub const SUCCESS: &str = "Success";
	pub const FAILED: &str = "Failed";
}

/// Numeric identifier of an application user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
	pub fn new(id: i64) -> Self {
		Self(id)
	}

	pub fn into_inner(self) -> i64 {
		self.0
	}
}

impl fmt::Display for UserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<i64> for UserId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}

/// The user an event concerns.
///
/// Either part may be unknown: registration events are emitted before the
/// user has an ID, and some flows only know the ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditUser {
	pub id: Option<UserId>,
	pub email: Option<String>,
}

impl AuditUser {
	pub fn new(id: impl Into<UserId>, email: impl Into<String>) -> Self {
		Self {
			id: Some(id.into()),
			email: Some(email.into()),
		}
	}

	pub fn with_email(email: impl Into<String>) -> Self {
		Self {
			id: None,
			email: Some(email.into()),
		}
	}

	pub fn with_id(id: impl Into<UserId>) -> Self {
		Self {
			id: Some(id.into()),
			email: None,
		}
	}

	/// True when neither an ID nor an email is known.
	pub fn is_anonymous(&self) -> bool {
		self.id.is_none() && self.email.is_none()
	}
}

/// One occurrence to be recorded in the audit trail.
///
/// Fields are private so an event cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
	timestamp: DateTime<Utc>,
	actor: Option<AuditUser>,
	session_id: Option<String>,
	ip_address: Option<String>,
	user_agent: Option<String>,
	action: String,
	action_status: Option<String>,
	message: Option<String>,
	extra_data: Option<String>,
}

impl AuditEvent {
	/// Create a new builder for the given action.
	pub fn builder(action: impl Into<String>) -> AuditEventBuilder {
		AuditEventBuilder::new(action)
	}

	pub fn timestamp(&self) -> DateTime<Utc> {
		self.timestamp
	}

	pub fn actor(&self) -> Option<&AuditUser> {
		self.actor.as_ref()
	}

	pub fn session_id(&self) -> Option<&str> {
		self.session_id.as_deref()
	}

	pub fn ip_address(&self) -> Option<&str> {
		self.ip_address.as_deref()
	}

	pub fn user_agent(&self) -> Option<&str> {
		self.user_agent.as_deref()
	}

	pub fn action(&self) -> &str {
		&self.action
	}

	pub fn action_status(&self) -> Option<&str> {
		self.action_status.as_deref()
	}

	pub fn message(&self) -> Option<&str> {
		self.message.as_deref()
	}

	pub fn extra_data(&self) -> Option<&str> {
		self.extra_data.as_deref()
	}
}

/// Builder for constructing audit events with a fluent API.
#[derive(Debug, Clone)]
pub struct AuditEventBuilder {
	actor: Option<AuditUser>,
	session_id: Option<String>,
	ip_address: Option<String>,
	user_agent: Option<String>,
	action: String,
	action_status: Option<String>,
	message: Option<String>,
	extra_data: Option<String>,
}

impl AuditEventBuilder {
	/// Create a new builder for the given action.
	pub fn new(action: impl Into<String>) -> Self {
		Self {
			actor: None,
			session_id: None,
			ip_address: None,
			user_agent: None,
			action: action.into(),
			action_status: None,
			message: None,
			extra_data: None,
		}
	}

	/// Set the user the event concerns.
	pub fn actor(mut self, user: AuditUser) -> Self {
		self.actor = Some(user);
		self
	}

	pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
		self.session_id = Some(session_id.into());
		self
	}

	/// Set the IP address of the request origin.
	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	/// Set the user agent string from the request.
	pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	/// Set the outcome, e.g. [`statuses::SUCCESS`].
	pub fn status(mut self, status: impl Into<String>) -> Self {
		self.action_status = Some(status.into());
		self
	}

	/// Set the human-readable description.
	pub fn message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}

	/// Set the opaque supplementary payload.
	pub fn extra_data(mut self, extra: impl Into<String>) -> Self {
		self.extra_data = Some(extra.into());
		self
	}

	/// Serialize `value` as JSON into the supplementary payload.
	pub fn extra_json(self, value: &serde_json::Value) -> Self {
		self.extra_data(value.to_string())
	}

	/// Build the event, stamping it with the current time.
	pub fn build(self) -> AuditEvent {
		AuditEvent {
			timestamp: Utc::now(),
			actor: self.actor,
			session_id: self.session_id,
			ip_address: self.ip_address,
			user_agent: self.user_agent,
			action: self.action,
			action_status: self.action_status,
			message: self.message,
			extra_data: self.extra_data,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	mod audit_user {
		use super::*;

		#[test]
		fn new_sets_both_identifiers() {
			let user = AuditUser::new(1, "a@x.com");
			assert_eq!(user.id, Some(UserId::new(1)));
			assert_eq!(user.email.as_deref(), Some("a@x.com"));
			assert!(!user.is_anonymous());
		}

		#[test]
		fn default_is_anonymous() {
			assert!(AuditUser::default().is_anonymous());
			assert!(!AuditUser::with_id(7).is_anonymous());
			assert!(!AuditUser::with_email("b@x.com").is_anonymous());
		}

		#[test]
		fn user_id_displays_as_plain_number() {
			assert_eq!(UserId::new(42).to_string(), "42");
			assert_eq!(serde_json::to_string(&UserId::new(42)).unwrap(), "42");
		}
	}

	mod audit_event_builder {
		use super::*;

		#[test]
		fn builds_minimal_event() {
			let event = AuditEvent::builder(actions::LOGOUT).build();

			assert_eq!(event.action(), "Logout");
			assert!(event.actor().is_none());
			assert!(event.session_id().is_none());
			assert!(event.ip_address().is_none());
			assert!(event.user_agent().is_none());
			assert!(event.action_status().is_none());
			assert!(event.message().is_none());
			assert!(event.extra_data().is_none());
		}

		#[test]
		fn builds_full_event() {
			let event = AuditEvent::builder(actions::CONSENT_GRANTED)
				.actor(AuditUser::new(3, "c@x.com"))
				.session_id("sess-1")
				.ip_address("10.0.0.1")
				.user_agent("Mozilla/5.0")
				.status(statuses::SUCCESS)
				.message("Consent granted: marketing")
				.extra_json(&json!({"consentType": "marketing"}))
				.build();

			assert_eq!(event.actor(), Some(&AuditUser::new(3, "c@x.com")));
			assert_eq!(event.session_id(), Some("sess-1"));
			assert_eq!(event.ip_address(), Some("10.0.0.1"));
			assert_eq!(event.user_agent(), Some("Mozilla/5.0"));
			assert_eq!(event.action(), "CONSENT_GRANTED");
			assert_eq!(event.action_status(), Some("Success"));
			assert_eq!(event.message(), Some("Consent granted: marketing"));
			assert_eq!(event.extra_data(), Some(r#"{"consentType":"marketing"}"#));
		}

		#[test]
		fn sets_timestamp_to_now() {
			let before = Utc::now();
			let event = AuditEvent::builder(actions::LOGIN).build();
			let after = Utc::now();

			assert!(event.timestamp() >= before);
			assert!(event.timestamp() <= after);
		}

		#[test]
		fn timestamps_follow_construction_order_on_one_thread() {
			let first = AuditEvent::builder(actions::LOGIN).build();
			let second = AuditEvent::builder(actions::LOGIN).build();
			assert!(second.timestamp() >= first.timestamp());
		}
	}

	proptest! {
		#[test]
		fn builder_keeps_arbitrary_strings(
			action in ".*",
			ip in "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
			message in ".*",
		) {
			let event = AuditEvent::builder(&action)
				.ip_address(&ip)
				.message(&message)
				.build();

			prop_assert_eq!(event.action(), action.as_str());
			prop_assert_eq!(event.ip_address(), Some(ip.as_str()));
			prop_assert_eq!(event.message(), Some(message.as_str()));
		}
	}
}
