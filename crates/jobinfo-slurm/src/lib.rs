//! Slurm integration for jobinfo.
//!
//! Decode sacct, sstat, squeue and scontrol output into typed records,
//! fetched through a [`SlurmSource`].

pub mod job_id;
pub mod sacct;
pub mod scontrol;
pub mod source;
pub mod squeue;
pub mod sstat;
pub mod types;

pub use job_id::{JobId, JobIdError};
pub use sacct::query_accounting;
pub use scontrol::query_node;
pub use source::{CommandSource, FixtureSource, SlurmSource, SourceError, SourceKind};
pub use squeue::query_queue;
pub use sstat::query_live_stats;
pub use types::{
    AccountingRecord, LiveStatRecord, NodeRecord, ParseError, ParsedLines, QueueRecord,
    RequestedMemory, SlurmJobState, StepId,
};
