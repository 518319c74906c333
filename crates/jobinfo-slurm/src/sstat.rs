//! Query live resource usage of running steps via sstat.

use crate::job_id::JobId;
use crate::source::{SlurmSource, SourceError, SourceKind};
use crate::types::{LiveStatRecord, ParsedLines, StepId};
use jobinfo_parsers::{
    non_empty_string, parse_duration_secs, parse_memory_kb, parse_optional, split_delimited,
};

/// sstat output format (--parsable2 uses | delimiter)
const SSTAT_FORMAT: &str = "JobID,TotalCPU,MaxRSS,MaxVMSize,MaxDiskRead,MaxDiskWrite";
const SSTAT_FIELD_COUNT: usize = 6;

pub(crate) fn command_args(identifier: &str) -> Vec<String> {
    vec![
        "-j".to_string(),
        identifier.to_string(),
        "--noheader".to_string(),
        "--parsable2".to_string(),
        "--format".to_string(),
        SSTAT_FORMAT.to_string(),
    ]
}

/// Parse a single line of sstat output.
pub fn parse_sstat_line(line: &str) -> Result<LiveStatRecord, String> {
    // One spare field absorbs the trailing '|' that --parsable adds
    let fields = split_delimited(line.trim(), "|", SSTAT_FIELD_COUNT, SSTAT_FIELD_COUNT + 1)?;
    let step_id = non_empty_string(fields[0]).ok_or("missing JobID")?;

    Ok(LiveStatRecord {
        step_id: StepId::new(step_id),
        cpu_time_secs: parse_optional(fields[1], "TotalCPU", parse_duration_secs)?,
        max_rss_kb: parse_optional(fields[2], "MaxRSS", parse_memory_kb)?,
        max_vmem_kb: parse_optional(fields[3], "MaxVMSize", parse_memory_kb)?,
        max_disk_read_kb: parse_optional(fields[4], "MaxDiskRead", parse_memory_kb)?,
        max_disk_write_kb: parse_optional(fields[5], "MaxDiskWrite", parse_memory_kb)?,
    })
}

pub fn parse_sstat_output(output: &str) -> ParsedLines<LiveStatRecord> {
    ParsedLines::parse(output, "sstat", parse_sstat_line)
}

/// Query live stats for every running step of the request.
///
/// Finished and pending jobs have none; that is an empty result.
pub async fn query_live_stats<S: SlurmSource>(
    source: &S,
    job_id: &JobId,
) -> Result<Vec<LiveStatRecord>, SourceError> {
    let mut records = Vec::new();

    for id in job_id.live_stat_ids() {
        match source.fetch(SourceKind::LiveStats, &id).await? {
            Some(stdout) => records.extend(parse_sstat_output(&stdout).into_records()),
            None => tracing::debug!("sstat has no running step {}", id),
        }
    }

    Ok(records)
}
