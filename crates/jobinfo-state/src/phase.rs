//! Which source speaks for a job.
//!
//! Each source only knows a job during part of its life: the queue while
//! it is pending or running, sstat while steps run, sacct from submission
//! on. The phase picks the authoritative source from what was found.

use jobinfo_slurm::{
    AccountingRecord, JobId, LiveStatRecord, QueueRecord, SlurmJobState, StepId,
};

/// Authoritative source for a job's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// sacct knows the job; its state, exit code and elapsed time win.
    Accounted,
    /// Only sstat knows the job: it is running.
    Running,
    /// Only the queue knows the job.
    Queued,
    /// No source knows the job.
    NotFound,
}

impl Phase {
    /// Transition rules, in priority order.
    pub fn resolve(has_accounting: bool, has_live: bool, has_queue: bool) -> Self {
        match (has_accounting, has_live, has_queue) {
            (true, _, _) => Self::Accounted,
            (false, true, _) => Self::Running,
            (false, false, true) => Self::Queued,
            (false, false, false) => Self::NotFound,
        }
    }
}

/// Records of one job after grouping, with the authoritative row chosen.
#[derive(Debug)]
pub(crate) struct Resolved<'a> {
    pub phase: Phase,
    /// All accounting rows whose id before the first `.` is the job's, in input order
    pub group: Vec<&'a AccountingRecord>,
    /// Row whose state is reported
    pub authoritative: Option<&'a AccountingRecord>,
    pub state: Option<SlurmJobState>,
}

impl Resolved<'_> {
    pub fn is_running(&self) -> bool {
        self.state.as_ref().is_some_and(SlurmJobState::is_running)
    }
}

/// The row belongs to the requested job: same id up to the first `.`.
///
/// Array tasks and heterogeneous components (`123_4`, `123+1`) are jobs of
/// their own, each with its own allocation.
pub(crate) fn same_job(step_id: &StepId, job_id: &JobId) -> bool {
    step_id.prefix() == job_id.base()
}

pub(crate) fn resolve<'a>(
    job_id: &JobId,
    accounting: &'a [AccountingRecord],
    live: &[LiveStatRecord],
    queue: Option<&QueueRecord>,
) -> Resolved<'a> {
    let group: Vec<&AccountingRecord> = accounting
        .iter()
        .filter(|r| {
            let ours = same_job(&r.step_id, job_id);
            if !ours {
                tracing::debug!("Ignoring accounting row {} for another job", r.step_id);
            }
            ours
        })
        .collect();

    let authoritative = group
        .iter()
        .find(|r| r.step_id.as_str() == job_id.as_str())
        .or_else(|| group.iter().find(|r| r.step_id.is_allocation()))
        .or_else(|| group.first())
        .copied();

    let has_live = live.iter().any(|r| same_job(&r.step_id, job_id));

    let phase = Phase::resolve(authoritative.is_some(), has_live, queue.is_some());

    let state = match phase {
        Phase::Accounted => authoritative.map(|r| r.state.clone()),
        Phase::Running => Some(SlurmJobState::Running),
        Phase::Queued => queue.map(|q| q.state.clone()),
        Phase::NotFound => None,
    };

    tracing::debug!(
        "Job {} resolved to {:?} ({} accounting rows, state {:?})",
        job_id,
        phase,
        group.len(),
        state
    );

    Resolved {
        phase,
        group,
        authoritative,
        state,
    }
}
