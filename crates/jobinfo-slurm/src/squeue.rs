//! Query the scheduler queue via squeue.

use crate::job_id::JobId;
use crate::source::{SlurmSource, SourceError, SourceKind};
use crate::types::{ParsedLines, QueueRecord, SlurmJobState};
use jobinfo_parsers::{
    non_empty_string, parse_optional_number, parse_slurm_timestamp, split_delimited,
};

/// squeue output format:
/// %i - Job ID (prefix field)
/// %T - State (extended)
/// %r - Reason
/// %S - Start time (actual or expected)
/// %Q - Priority
/// %N - Nodelist
const SQUEUE_FORMAT: &str = "%i|%T|%r|%S|%Q|%N";
const SQUEUE_FIELD_COUNT: usize = 6;

pub(crate) fn command_args(identifier: &str) -> Vec<String> {
    vec![
        "-j".to_string(),
        identifier.to_string(),
        "--noheader".to_string(),
        "-o".to_string(),
        SQUEUE_FORMAT.to_string(),
    ]
}

/// Parse a single line of squeue output.
pub fn parse_squeue_line(line: &str) -> Result<QueueRecord, String> {
    let fields = split_delimited(line.trim(), "|", SQUEUE_FIELD_COUNT, SQUEUE_FIELD_COUNT)?;
    let job_id = non_empty_string(fields[0]).ok_or("missing job id")?;
    let state = non_empty_string(fields[1]).ok_or("missing state")?;

    Ok(QueueRecord {
        job_id,
        state: SlurmJobState::parse(&state),
        reason: non_empty_string(fields[2]),
        start_time: parse_slurm_timestamp(fields[3]),
        priority: parse_optional_number(fields[4], "Priority")?,
        nodelist: non_empty_string(fields[5]),
    })
}

pub fn parse_squeue_output(output: &str) -> ParsedLines<QueueRecord> {
    ParsedLines::parse(output, "squeue", parse_squeue_line)
}

/// Query the queue entry for a job.
///
/// Jobs leave the queue when they finish, so `None` is a normal answer.
pub async fn query_queue<S: SlurmSource>(
    source: &S,
    job_id: &JobId,
) -> Result<Option<QueueRecord>, SourceError> {
    let Some(stdout) = source.fetch(SourceKind::Queue, job_id.base()).await? else {
        tracing::debug!("{} is not in the queue", job_id.base());
        return Ok(None);
    };

    Ok(parse_squeue_output(&stdout).into_records().into_iter().next())
}
