//! Unified job state for jobinfo.
//!
//! Reconciles records from every Slurm source into one [`JobView`].

pub mod merge;
pub mod phase;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use merge::{QueryPlan, aggregate};
pub use phase::Phase;
pub use types::{
    GpuUtilization, JobAllocation, JobTiming, JobUsage, JobView, QueueInfo, ReportConfig,
    StepSummary, efficiency,
};
