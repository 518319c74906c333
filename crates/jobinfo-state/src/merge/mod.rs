//! Merge sacct, sstat, squeue, scontrol and GPU data into one job view.

mod aggregate;
mod plan;
mod usage;

pub use aggregate::aggregate;
pub use plan::QueryPlan;
