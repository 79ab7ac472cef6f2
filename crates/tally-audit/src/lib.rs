// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only audit trail backed by a single pipe-delimited log file.
//!
//! Application code builds an [`AuditEvent`] and hands it to the
//! [`AuditDispatcher`]. The [`FileAuditLogWriter`] appends it as one line,
//! flushing immediately or on the [`FlushScheduler`]'s period. The
//! [`FileAuditLogQueryService`] reads the file back into [`AuditEventDto`]s.
//! [`AuditSystem`] wires the pieces together for one process.

pub mod dispatcher;
pub mod dto;
pub mod error;
pub mod event;
pub mod line;
pub mod query;
pub mod scheduler;
pub mod system;
pub mod timestamp;
pub mod writer;

pub use dispatcher::AuditDispatcher;
pub use dto::AuditEventDto;
pub use error::{AuditError, AuditResult};
pub use event::{actions, statuses, AuditEvent, AuditEventBuilder, AuditUser, UserId};
pub use line::LOG_HEADER;
pub use query::{AuditLogQuery, FileAuditLogQueryService, QueryFilter};
pub use scheduler::FlushScheduler;
pub use system::AuditSystem;
pub use writer::{default_fallback_path, AuditWriter, FileAuditLogWriter, FALLBACK_FILE_NAME};

pub use tally_config::AuditConfig;
