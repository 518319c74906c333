//! Time parsing utilities for Slurm output.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::fmt;

const SLURM_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a Slurm timestamp (YYYY-MM-DDTHH:MM:SS or placeholder values).
///
/// Returns None for empty strings or placeholder values like "N/A", "Unknown", "None".
pub fn parse_slurm_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() || s == "N/A" || s == "Unknown" || s == "None" {
        return None;
    }
    NaiveDateTime::parse_from_str(s, SLURM_TIMESTAMP_FORMAT)
        .ok()
        .and_then(|dt| Utc.from_local_datetime(&dt).single())
}

/// Format a timestamp the way Slurm prints it.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(SLURM_TIMESTAMP_FORMAT).to_string()
}

/// Parse a duration to seconds.
///
/// Supports:
/// - D-HH:MM:SS (elapsed and time limits longer than a day)
/// - HH:MM:SS
/// - MM:SS
/// - Seconds as integer
///
/// Fractional seconds ("05:03.123", as printed for TotalCPU) are dropped.
/// Returns None for "UNLIMITED", placeholders and malformed input.
pub fn parse_duration_secs(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || s == "UNLIMITED" || s == "-" {
        return None;
    }

    // Strip milliseconds (e.g., "01:30:00.123" -> "01:30:00")
    let s = s.split('.').next().unwrap_or(s);

    // Check for day separator (D-HH:MM:SS)
    let (days, time_part) = match s.split_once('-') {
        Some((days, rest)) => (days.parse::<u64>().ok()?, rest),
        None => (0, s),
    };

    let time_parts = time_part
        .split(':')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<u64>>>()?;

    let seconds = match time_parts.as_slice() {
        [h, m, s] => h * 3600 + m * 60 + s,
        [m, s] => m * 60 + s,
        [s] => *s,
        _ => return None,
    };

    Some(days * 86400 + seconds)
}

/// Exit status as sacct reports it (exit_code:signal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode {
    pub code: i32,
    pub signal: i32,
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.code, self.signal)
    }
}

/// Parse exit code from Slurm format (exit_code:signal).
///
/// A bare number is taken as the exit code with no signal.
pub fn parse_exit_code(s: &str) -> Option<ExitCode> {
    let s = s.trim();
    let (code, signal) = match s.split_once(':') {
        Some((code, signal)) => (code.parse().ok()?, signal.parse().ok()?),
        None => (s.parse().ok()?, 0),
    };
    Some(ExitCode { code, signal })
}

/// Format seconds as Slurm duration format (D-HH:MM:SS).
pub fn format_duration_slurm(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}-{:02}:{:02}:{:02}", days, hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    }
}
