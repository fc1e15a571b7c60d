//! Time utilities: due-date parsing and display.

use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;

fn relative_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+(\d+)\s*(m|min|h|d|w)$").expect("static regex"))
}

pub fn parse_timezone(tz: &str) -> Result<Tz> {
    tz.parse().map_err(|_| anyhow!("invalid timezone: {tz}"))
}

/// Parse a deadline like "2026-02-20 23:59" in an IANA tz like "America/Chicago",
/// returning UTC. A bare date means the end of that day.
pub fn parse_local_deadline_to_utc(local: &str, tz: &str) -> Result<DateTime<Utc>> {
    let tz = parse_timezone(tz)?;

    let ndt = match NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M") {
        Ok(ndt) => ndt,
        Err(e) => NaiveDate::parse_from_str(local, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(23, 59, 0))
            .ok_or_else(|| anyhow!("invalid local datetime '{local}': {e}"))?,
    };

    let local_dt = tz
        .from_local_datetime(&ndt)
        .single()
        .ok_or_else(|| anyhow!("ambiguous or invalid local time (DST?): {local} {tz}"))?;

    Ok(local_dt.with_timezone(&Utc))
}

/// Parse a relative offset such as `+90m`, `+2h`, `+10d` or `+1w`.
pub fn parse_relative(input: &str) -> Option<Duration> {
    let caps = relative_re().captures(input.trim())?;
    let n: i64 = caps[1].parse().ok()?;
    match &caps[2] {
        "m" | "min" => Duration::try_minutes(n),
        "h" => Duration::try_hours(n),
        "d" => Duration::try_days(n),
        "w" => Duration::try_weeks(n),
        _ => None,
    }
}

/// Accepts RFC 3339, a relative offset from `now`, or a local
/// `YYYY-MM-DD[ HH:MM]` in `tz`.
pub fn parse_due(input: &str, tz: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        bail!("empty due date");
    }
    if let Some(offset) = parse_relative(input) {
        return now
            .checked_add_signed(offset)
            .ok_or_else(|| anyhow!("due date out of range: {input}"));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    parse_local_deadline_to_utc(input, tz).with_context(|| format!("parsing due date '{input}'"))
}

/// Helper: format a UTC time into RFC3339.
pub fn to_rfc3339_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Short local rendering for listings, e.g. "Mar 01 14:30".
pub fn format_local(dt: DateTime<Utc>, tz: &Tz) -> String {
    dt.with_timezone(tz).format("%b %d %H:%M").to_string()
}
