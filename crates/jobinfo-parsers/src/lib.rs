//! Shared parsing utilities for Slurm command output.
//!
//! This crate provides the field-level parsers used by the record
//! parsers in jobinfo-slurm, plus command execution and hostlist expansion.

pub mod command;
pub mod hostlist;
pub mod memory;
pub mod time;

pub use command::{CommandError, run_command_allow_failure};
pub use hostlist::expand_hostlist;
pub use memory::{MemoryScope, format_memory_kb, parse_memory_kb, parse_requested_memory};
pub use time::{
    ExitCode, format_duration_slurm, format_timestamp, parse_duration_secs, parse_exit_code,
    parse_slurm_timestamp,
};

/// Placeholder values Slurm prints for fields it has no value for.
const PLACEHOLDERS: [&str; 6] = ["-", "N/A", "Unknown", "None", "(null)", "n/a"];

/// Returns true if the field carries no value.
pub fn is_placeholder(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.is_empty() || PLACEHOLDERS.contains(&trimmed)
}

/// Filter helper for optional string fields.
/// Returns None if the string is empty or a placeholder value.
pub fn non_empty_string(s: &str) -> Option<String> {
    if is_placeholder(s) {
        None
    } else {
        Some(s.trim().to_string())
    }
}

/// Parse an optional field with the given parser.
///
/// Placeholders become `Ok(None)`. A non-placeholder value the parser
/// rejects is an error naming the field, so malformed output is never
/// mistaken for an unknown value.
pub fn parse_optional<T>(
    s: &str,
    field: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, String> {
    if is_placeholder(s) {
        return Ok(None);
    }
    parse(s.trim())
        .map(Some)
        .ok_or_else(|| format!("invalid {}: {:?}", field, s.trim()))
}

/// Parse an optional integer field (`AllocCPUS`, `NNodes`, `Priority`, ...).
pub fn parse_optional_number<T: std::str::FromStr>(
    s: &str,
    field: &str,
) -> Result<Option<T>, String> {
    parse_optional(s, field, |v| v.parse().ok())
}

/// Split a delimited line into at most `max_fields` fields and validate
/// the field count.
///
/// The last field keeps any further delimiters, so free text placed last
/// (job names) survives intact.
pub fn split_delimited<'a>(
    line: &'a str,
    delimiter: &str,
    min_fields: usize,
    max_fields: usize,
) -> Result<Vec<&'a str>, String> {
    let fields: Vec<&str> = line.splitn(max_fields, delimiter).collect();
    if fields.len() < min_fields {
        return Err(format!(
            "Expected {} fields, got {}: {}",
            min_fields,
            fields.len(),
            line
        ));
    }
    Ok(fields)
}
