//! Slurm record types.

use chrono::{DateTime, Utc};
use jobinfo_parsers::{ExitCode, MemoryScope};
use std::fmt;
use thiserror::Error;

/// Slurm job or step state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlurmJobState {
    Pending,
    Running,
    Completing,
    Completed,
    Failed,
    Cancelled,
    Timeout,
    OutOfMemory,
    NodeFail,
    Preempted,
    Suspended,
    Unknown(String),
}

impl SlurmJobState {
    /// Parse a state as printed by sacct or squeue.
    ///
    /// sacct states can have suffixes like "CANCELLED by 12345".
    pub fn parse(s: &str) -> Self {
        let base_state = s.split_whitespace().next().unwrap_or(s);

        match base_state.to_uppercase().as_str() {
            "PENDING" | "PD" => Self::Pending,
            "RUNNING" | "R" => Self::Running,
            "COMPLETING" | "CG" => Self::Completing,
            "COMPLETED" | "CD" => Self::Completed,
            "FAILED" | "F" => Self::Failed,
            "CANCELLED" | "CA" => Self::Cancelled,
            "TIMEOUT" | "TO" => Self::Timeout,
            "OUT_OF_MEMORY" | "OOM" => Self::OutOfMemory,
            "NODE_FAIL" | "NF" => Self::NodeFail,
            "PREEMPTED" | "PR" => Self::Preempted,
            "SUSPENDED" | "S" => Self::Suspended,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The job holds resources and is doing work.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running | Self::Completing | Self::Suspended)
    }

    /// The job has left the scheduler for good.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::Failed
                | Self::Cancelled
                | Self::Timeout
                | Self::OutOfMemory
                | Self::NodeFail
                | Self::Preempted
        )
    }
}

impl fmt::Display for SlurmJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completing => "COMPLETING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Timeout => "TIMEOUT",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::NodeFail => "NODE_FAIL",
            Self::Preempted => "PREEMPTED",
            Self::Suspended => "SUSPENDED",
            Self::Unknown(other) => other.as_str(),
        };
        f.write_str(name)
    }
}

/// Id of a single accounting or live-stats row (`123`, `123.batch`, `123_4.0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(String);

impl StepId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical job part: everything before the first `.`.
    pub fn prefix(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(p, _)| p)
    }

    /// Step name after the first `.`, if any.
    pub fn step(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, s)| s)
    }

    pub fn is_allocation(&self) -> bool {
        self.step().is_none()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Requested memory as sacct reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedMemory {
    pub kb: u64,
    pub scope: MemoryScope,
}

impl RequestedMemory {
    /// Total memory for the whole allocation.
    ///
    /// Unknown when the scope needs a CPU or node count that is unknown.
    pub fn total_kb(&self, cpus: Option<u32>, nodes: Option<u32>) -> Option<u64> {
        match self.scope {
            MemoryScope::Total => Some(self.kb),
            MemoryScope::PerCpu => cpus.map(|c| self.kb * u64::from(c)),
            MemoryScope::PerNode => nodes.map(|n| self.kb * u64::from(n)),
        }
    }
}

/// One row of sacct output: a job allocation or one of its steps.
#[derive(Debug, Clone)]
pub struct AccountingRecord {
    pub step_id: StepId,
    pub state: SlurmJobState,
    pub elapsed_secs: Option<u64>,
    pub time_limit_secs: Option<u64>,
    pub cpus: Option<u32>,
    pub nodes: Option<u32>,
    pub req_mem: Option<RequestedMemory>,
    pub gpus: Option<u32>,
    /// User plus system CPU time
    pub cpu_time_secs: Option<u64>,
    pub max_rss_kb: Option<u64>,
    pub max_vmem_kb: Option<u64>,
    pub max_disk_read_kb: Option<u64>,
    pub max_disk_write_kb: Option<u64>,
    pub exit_code: Option<ExitCode>,
    pub submit_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub nodelist: Option<String>,
    pub partition: Option<String>,
    pub user: Option<String>,
    pub account: Option<String>,
    pub name: Option<String>,
}

/// One row of sstat output for a running step.
#[derive(Debug, Clone)]
pub struct LiveStatRecord {
    pub step_id: StepId,
    pub cpu_time_secs: Option<u64>,
    pub max_rss_kb: Option<u64>,
    pub max_vmem_kb: Option<u64>,
    pub max_disk_read_kb: Option<u64>,
    pub max_disk_write_kb: Option<u64>,
}

/// Scheduler queue state of a pending or running job.
#[derive(Debug, Clone)]
pub struct QueueRecord {
    pub job_id: String,
    pub state: SlurmJobState,
    /// Why the job is pending ("Priority", "Resources", ...)
    pub reason: Option<String>,
    /// Actual start, or the scheduler's estimate while pending
    pub start_time: Option<DateTime<Utc>>,
    pub priority: Option<u64>,
    pub nodelist: Option<String>,
}

/// Hardware and state description of one compute node.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub name: String,
    pub cpus: Option<u32>,
    pub cpus_allocated: Option<u32>,
    pub real_memory_kb: Option<u64>,
    pub allocated_memory_kb: Option<u64>,
    pub gpus: Option<u32>,
    pub gpu_type: Option<String>,
    pub state: Option<String>,
    pub features: Vec<String>,
    pub partitions: Vec<String>,
}

/// A line of command output that could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source_name} line {line}: {reason}")]
pub struct ParseError {
    pub source_name: &'static str,
    /// 1-based line number within the command output
    pub line: usize,
    pub reason: String,
}

/// Records decoded from one command output, plus the lines that failed.
#[derive(Debug, Clone)]
pub struct ParsedLines<T> {
    pub records: Vec<T>,
    pub errors: Vec<ParseError>,
}

impl<T> ParsedLines<T> {
    /// Decode every non-blank line, keeping failures separate so one bad
    /// line never hides its siblings.
    pub fn parse(
        output: &str,
        source_name: &'static str,
        parse_line: impl Fn(&str) -> Result<T, String>,
    ) -> Self {
        let mut records = Vec::new();
        let mut errors = Vec::new();

        for (index, line) in output.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok(record) => records.push(record),
                Err(reason) => errors.push(ParseError {
                    source_name,
                    line: index + 1,
                    reason,
                }),
            }
        }

        Self { records, errors }
    }

    /// Log the failed lines and keep the records.
    pub fn into_records(self) -> Vec<T> {
        for error in &self.errors {
            tracing::warn!("Skipping malformed output: {}", error);
        }
        self.records
    }
}
