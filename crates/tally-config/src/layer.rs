// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

use crate::sections::{AuditConfigLayer, LoggingConfigLayer};

/// A partial configuration as produced by a single source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TallyConfigLayer {
	pub audit: Option<AuditConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
}

impl TallyConfigLayer {
	/// Overlay `other` on top of `self`, section by section.
	pub fn merge(&mut self, other: Self) {
		if let Some(audit) = other.audit {
			self.audit.get_or_insert_with(Default::default).merge(audit);
		}
		if let Some(logging) = other.logging {
			self.logging.get_or_insert_with(Default::default).merge(logging);
		}
	}
}
