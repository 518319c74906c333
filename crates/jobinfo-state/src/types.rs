//! Unified job view types.

use crate::phase::Phase;
use chrono::{DateTime, Utc};
use jobinfo_parsers::ExitCode;
use jobinfo_slurm::{JobId, LiveStatRecord, NodeRecord, SlurmJobState, StepId};

/// Report options, passed explicitly to the aggregator and the renderer.
#[derive(Debug, Clone, Default)]
pub struct ReportConfig {
    /// Emit efficiency, step, node and GPU detail
    pub long_output: bool,
    /// Low-level trace output
    pub debug: bool,
    /// Prometheus base URL; GPU utilization is skipped without it
    pub metrics_url: Option<String>,
}

/// Job timing information.
#[derive(Debug, Clone, Default)]
pub struct JobTiming {
    pub submitted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub elapsed_secs: Option<u64>,
    pub time_limit_secs: Option<u64>,
}

/// Resources the scheduler allocated.
#[derive(Debug, Clone, Default)]
pub struct JobAllocation {
    pub cpus: Option<u32>,
    pub nodes: Option<u32>,
    pub gpus: Option<u32>,
    /// Total requested memory for the whole allocation
    pub memory_kb: Option<u64>,
    /// Compressed hostlist as Slurm prints it
    pub nodelist: Option<String>,
}

/// Resources the job consumed, reconciled across steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobUsage {
    /// Sum over steps
    pub cpu_time_secs: Option<u64>,
    /// Peak over steps
    pub max_rss_kb: Option<u64>,
    /// Peak over steps
    pub max_vmem_kb: Option<u64>,
    /// Peak over steps
    pub max_disk_read_kb: Option<u64>,
    /// Peak over steps
    pub max_disk_write_kb: Option<u64>,
}

/// Scheduling metadata from the queue.
#[derive(Debug, Clone)]
pub struct QueueInfo {
    pub reason: Option<String>,
    pub priority: Option<u64>,
    pub start_time: Option<DateTime<Utc>>,
}

/// One accounting row, kept for long output.
#[derive(Debug, Clone)]
pub struct StepSummary {
    pub step_id: StepId,
    pub state: SlurmJobState,
    pub elapsed_secs: Option<u64>,
    pub cpu_time_secs: Option<u64>,
    pub max_rss_kb: Option<u64>,
    pub exit_code: Option<ExitCode>,
}

/// Mean utilization of one GPU over the job's samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuUtilization {
    pub index: u32,
    pub mean_percent: f64,
}

/// Everything known about one requested job.
#[derive(Debug, Clone)]
pub struct JobView {
    pub job_id: JobId,
    pub phase: Phase,
    /// None when no source knows the job
    pub state: Option<SlurmJobState>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub account: Option<String>,
    pub partition: Option<String>,
    pub exit_code: Option<ExitCode>,
    pub timing: JobTiming,
    pub allocation: JobAllocation,
    pub usage: JobUsage,
    pub queue: Option<QueueInfo>,
    pub steps: Vec<StepSummary>,
    /// Live samples of running steps, when sstat had any
    pub live_steps: Vec<LiveStatRecord>,
    pub nodes: Vec<NodeRecord>,
    pub gpu_utilization: Vec<GpuUtilization>,
}

/// `used / requested * 100`, or None when either side is unknown or
/// nothing was requested.
pub fn efficiency(used: Option<u64>, requested: Option<u64>) -> Option<f64> {
    match (used, requested) {
        (Some(used), Some(requested)) if requested > 0 => {
            Some(used as f64 / requested as f64 * 100.0)
        }
        _ => None,
    }
}

impl JobView {
    pub fn is_found(&self) -> bool {
        self.phase != Phase::NotFound
    }

    pub fn is_running(&self) -> bool {
        self.state.as_ref().is_some_and(SlurmJobState::is_running)
    }

    /// Core-seconds the allocation made available.
    pub fn cpu_seconds_reserved(&self) -> Option<u64> {
        let elapsed = self.timing.elapsed_secs?;
        let cpus = self.allocation.cpus?;
        Some(elapsed * u64::from(cpus))
    }

    pub fn cpu_efficiency(&self) -> Option<f64> {
        efficiency(self.usage.cpu_time_secs, self.cpu_seconds_reserved())
    }

    pub fn memory_efficiency(&self) -> Option<f64> {
        efficiency(self.usage.max_rss_kb, self.allocation.memory_kb)
    }

    pub fn walltime_efficiency(&self) -> Option<f64> {
        efficiency(self.timing.elapsed_secs, self.timing.time_limit_secs)
    }
}
