//! Query job accounting via sacct.

use crate::job_id::JobId;
use crate::source::{SlurmSource, SourceError, SourceKind};
use crate::types::{AccountingRecord, ParsedLines, RequestedMemory, SlurmJobState, StepId};
use jobinfo_parsers::{
    non_empty_string, parse_duration_secs, parse_exit_code, parse_memory_kb, parse_optional,
    parse_optional_number, parse_requested_memory, parse_slurm_timestamp, split_delimited,
};

/// Field separator passed to `sacct --delimiter`.
///
/// Job names are free text and may contain `|` or `,`, so a character
/// nobody types is used instead.
pub const SACCT_DELIMITER: &str = "☃";

/// sacct output fields, in order. JobName must stay last: the line is split
/// into at most this many fields so a name containing the delimiter lands
/// whole in the final field.
const SACCT_FIELDS: [&str; 22] = [
    "JobID",
    "State",
    "Elapsed",
    "Timelimit",
    "AllocCPUS",
    "NNodes",
    "ReqMem",
    "AllocTRES",
    "TotalCPU",
    "MaxRSS",
    "MaxVMSize",
    "MaxDiskRead",
    "MaxDiskWrite",
    "ExitCode",
    "Submit",
    "Start",
    "End",
    "NodeList",
    "Partition",
    "User",
    "Account",
    "JobName",
];

pub(crate) fn command_args(identifier: &str) -> Vec<String> {
    vec![
        "-j".to_string(),
        identifier.to_string(),
        "--noheader".to_string(),
        "--parsable2".to_string(),
        format!("--delimiter={}", SACCT_DELIMITER),
        "--format".to_string(),
        SACCT_FIELDS.join(","),
    ]
}

/// Count GPUs in an AllocTRES string (`cpu=4,gres/gpu=2,mem=16G,node=1`).
///
/// Newer Slurm lists both `gres/gpu=2` and typed `gres/gpu:a100=2`; the
/// untyped total wins when present. A TRES list without GPUs means zero.
fn parse_tres_gpus(tres: &str) -> Option<u32> {
    let mut total = None;
    let mut typed = 0u32;
    for item in tres.split(',') {
        let Some((key, value)) = item.split_once('=') else {
            continue;
        };
        if key == "gres/gpu" {
            total = value.parse().ok();
        } else if key.starts_with("gres/gpu:") {
            typed += value.parse::<u32>().unwrap_or(0);
        }
    }
    Some(total.unwrap_or(typed))
}

/// Parse a single line of sacct output.
pub fn parse_sacct_line(line: &str) -> Result<AccountingRecord, String> {
    let fields = split_delimited(
        line.trim(),
        SACCT_DELIMITER,
        SACCT_FIELDS.len(),
        SACCT_FIELDS.len(),
    )?;

    let step_id = non_empty_string(fields[0]).ok_or("missing JobID")?;
    let state = non_empty_string(fields[1]).ok_or("missing State")?;

    Ok(AccountingRecord {
        step_id: StepId::new(step_id),
        state: SlurmJobState::parse(&state),
        elapsed_secs: parse_optional(fields[2], "Elapsed", parse_duration_secs)?,
        time_limit_secs: match fields[3].trim() {
            "UNLIMITED" | "Partition_Limit" => None,
            limit => parse_optional(limit, "Timelimit", parse_duration_secs)?,
        },
        cpus: parse_optional_number(fields[4], "AllocCPUS")?,
        nodes: parse_optional_number(fields[5], "NNodes")?,
        req_mem: parse_optional(fields[6], "ReqMem", parse_requested_memory)?
            .map(|(kb, scope)| RequestedMemory { kb, scope }),
        gpus: parse_optional(fields[7], "AllocTRES", parse_tres_gpus)?,
        cpu_time_secs: parse_optional(fields[8], "TotalCPU", parse_duration_secs)?,
        max_rss_kb: parse_optional(fields[9], "MaxRSS", parse_memory_kb)?,
        max_vmem_kb: parse_optional(fields[10], "MaxVMSize", parse_memory_kb)?,
        max_disk_read_kb: parse_optional(fields[11], "MaxDiskRead", parse_memory_kb)?,
        max_disk_write_kb: parse_optional(fields[12], "MaxDiskWrite", parse_memory_kb)?,
        exit_code: parse_optional(fields[13], "ExitCode", parse_exit_code)?,
        submit_time: parse_slurm_timestamp(fields[14]),
        start_time: parse_slurm_timestamp(fields[15]),
        end_time: parse_slurm_timestamp(fields[16]),
        nodelist: non_empty_string(fields[17]),
        partition: non_empty_string(fields[18]),
        user: non_empty_string(fields[19]),
        account: non_empty_string(fields[20]),
        name: non_empty_string(fields[21]),
    })
}

/// Parse full sacct output, one record per well-formed line.
pub fn parse_sacct_output(output: &str) -> ParsedLines<AccountingRecord> {
    ParsedLines::parse(output, "sacct", parse_sacct_line)
}

/// Query accounting records for a job (bare id) or one step (suffixed id).
pub async fn query_accounting<S: SlurmSource>(
    source: &S,
    job_id: &JobId,
) -> Result<Vec<AccountingRecord>, SourceError> {
    let Some(stdout) = source.fetch(SourceKind::Accounting, job_id.as_str()).await? else {
        tracing::debug!("sacct has no record of {}", job_id);
        return Ok(Vec::new());
    };

    Ok(parse_sacct_output(&stdout).into_records())
}
