// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rendering and best-effort parsing of the `Date` column.
//!
//! New lines are always written as RFC 3339 UTC with millisecond precision.
//! Older log files carry whatever text the writing platform produced, so
//! reading tries a fixed list of known renderings in priority order, then
//! epoch milliseconds, and otherwise reports the timestamp as unknown.

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::debug;

type Parser = fn(&str) -> Option<DateTime<Utc>>;

/// Known textual renderings, most likely first.
const PARSERS: &[(&str, Parser)] = &[
	("platform_default", parse_platform_default),
	("medium_locale", parse_medium_locale),
	("rfc3339", parse_rfc3339),
	("iso_date_time", parse_iso_date_time),
];

/// Render a timestamp the way the writer stores it.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
	timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a `Date` column value. Returns `None` when no known format matches.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
	let value = raw.trim();
	if value.is_empty() || value == "null" {
		return None;
	}

	let parsed = PARSERS
		.iter()
		.find_map(|(_, parse)| parse(value))
		.or_else(|| parse_epoch_millis(value));

	if parsed.is_none() {
		debug!(value, "could not parse audit timestamp");
	}
	parsed
}

/// `Thu Jan 15 10:30:00 EST 2025`. The weekday is not checked against the date.
fn parse_platform_default(value: &str) -> Option<DateTime<Utc>> {
	let tokens: Vec<&str> = value.split_whitespace().collect();
	let [weekday, month, day, time, zone, year] = tokens.as_slice() else {
		return None;
	};
	if weekday.len() != 3 || !weekday.chars().all(|c| c.is_ascii_alphabetic()) {
		return None;
	}

	let naive = NaiveDateTime::parse_from_str(
		&format!("{month} {day} {year} {time}"),
		"%b %d %Y %H:%M:%S",
	)
	.ok()?;
	resolve_in_zone(&naive, zone)
}

/// `Jan 15, 2025, 10:30:00 AM`, read as UTC.
fn parse_medium_locale(value: &str) -> Option<DateTime<Utc>> {
	// Newer locale data puts a narrow no-break space before the meridiem.
	let normalized = value.replace(['\u{202f}', '\u{a0}'], " ");
	let naive = NaiveDateTime::parse_from_str(&normalized, "%b %d, %Y, %I:%M:%S %p").ok()?;
	Some(Utc.from_utc_datetime(&naive))
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.ok()
		.map(|dt| dt.with_timezone(&Utc))
}

/// `2025-01-15T10:30:00+01:00[Europe/Paris]` or a zone-less `2025-01-15T10:30:00`.
fn parse_iso_date_time(value: &str) -> Option<DateTime<Utc>> {
	if let Some((base, zone)) = value
		.strip_suffix(']')
		.and_then(|rest| rest.split_once('['))
	{
		if let Some(instant) = parse_rfc3339(base) {
			return Some(instant);
		}
		let naive = parse_naive_iso(base)?;
		return resolve_in_zone(&naive, zone);
	}

	parse_naive_iso(value).map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_naive_iso(value: &str) -> Option<NaiveDateTime> {
	NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
		.or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
		.ok()
}

fn parse_epoch_millis(value: &str) -> Option<DateTime<Utc>> {
	let millis: i64 = value.parse().ok()?;
	Utc.timestamp_millis_opt(millis).single()
}

fn resolve_in_zone(naive: &NaiveDateTime, zone: &str) -> Option<DateTime<Utc>> {
	if let Some(seconds) = abbreviation_offset_secs(zone) {
		let offset = FixedOffset::east_opt(seconds)?;
		return offset
			.from_local_datetime(naive)
			.single()
			.map(|dt| dt.with_timezone(&Utc));
	}

	let tz: Tz = zone.parse().ok()?;
	tz.from_local_datetime(naive)
		.earliest()
		.map(|dt| dt.with_timezone(&Utc))
}

/// UTC offsets of the zone abbreviations platforms commonly print.
fn abbreviation_offset_secs(zone: &str) -> Option<i32> {
	const HOUR: i32 = 3600;
	let offset = match zone.to_ascii_uppercase().as_str() {
		"UTC" | "GMT" | "UT" | "Z" | "WET" => 0,
		"BST" | "CET" | "WEST" => HOUR,
		"CEST" | "EET" => 2 * HOUR,
		"EEST" => 3 * HOUR,
		"IST" => 5 * HOUR + 30 * 60,
		"JST" => 9 * HOUR,
		"AEST" => 10 * HOUR,
		"AEDT" => 11 * HOUR,
		"EDT" => -4 * HOUR,
		"EST" | "CDT" => -5 * HOUR,
		"CST" | "MDT" => -6 * HOUR,
		"MST" | "PDT" => -7 * HOUR,
		"PST" | "AKDT" => -8 * HOUR,
		"AKST" => -9 * HOUR,
		"HST" => -10 * HOUR,
		_ => return None,
	};
	Some(offset)
}
