//! Resource usage reconciliation across job steps.
//!
//! CPU time is consumed by every step, so it adds up. Memory and disk
//! figures are high-water marks, so the job's value is the largest step's.

use crate::types::JobUsage;
use jobinfo_slurm::{AccountingRecord, LiveStatRecord};

fn sum(values: impl Iterator<Item = Option<u64>>) -> Option<u64> {
    values.flatten().reduce(|a, b| a + b)
}

fn peak(values: impl Iterator<Item = Option<u64>>) -> Option<u64> {
    values.flatten().max()
}

/// Usage from sacct rows.
pub(crate) fn accounting_usage(rows: &[&AccountingRecord]) -> JobUsage {
    JobUsage {
        // Every row counts, the allocation row included, although sacct
        // already rolls finished steps into it
        cpu_time_secs: sum(rows.iter().map(|r| r.cpu_time_secs)),
        max_rss_kb: peak(rows.iter().map(|r| r.max_rss_kb)),
        max_vmem_kb: peak(rows.iter().map(|r| r.max_vmem_kb)),
        max_disk_read_kb: peak(rows.iter().map(|r| r.max_disk_read_kb)),
        max_disk_write_kb: peak(rows.iter().map(|r| r.max_disk_write_kb)),
    }
}

/// Usage from sstat rows.
pub(crate) fn live_usage(rows: &[LiveStatRecord]) -> JobUsage {
    JobUsage {
        cpu_time_secs: sum(rows.iter().map(|r| r.cpu_time_secs)),
        max_rss_kb: peak(rows.iter().map(|r| r.max_rss_kb)),
        max_vmem_kb: peak(rows.iter().map(|r| r.max_vmem_kb)),
        max_disk_read_kb: peak(rows.iter().map(|r| r.max_disk_read_kb)),
        max_disk_write_kb: peak(rows.iter().map(|r| r.max_disk_write_kb)),
    }
}

/// Field-wise merge: `preferred` wins where known.
pub(crate) fn prefer(preferred: JobUsage, fallback: JobUsage) -> JobUsage {
    JobUsage {
        cpu_time_secs: preferred.cpu_time_secs.or(fallback.cpu_time_secs),
        max_rss_kb: preferred.max_rss_kb.or(fallback.max_rss_kb),
        max_vmem_kb: preferred.max_vmem_kb.or(fallback.max_vmem_kb),
        max_disk_read_kb: preferred.max_disk_read_kb.or(fallback.max_disk_read_kb),
        max_disk_write_kb: preferred.max_disk_write_kb.or(fallback.max_disk_write_kb),
    }
}
