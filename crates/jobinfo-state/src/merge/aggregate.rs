//! Fold every source's records for one job into a [`JobView`].

use super::usage::{accounting_usage, live_usage, prefer};
use crate::phase::{Phase, resolve, same_job};
use crate::types::{
    GpuUtilization, JobAllocation, JobTiming, JobUsage, JobView, QueueInfo, ReportConfig,
    StepSummary,
};
use jobinfo_metrics::GpuUsageSeries;
use jobinfo_slurm::{AccountingRecord, JobId, LiveStatRecord, NodeRecord, QueueRecord};

/// Merge accounting, live, queue, node and GPU data for `job_id`.
///
/// Pure: the result depends only on the arguments. Missing data never
/// fails; a job no source knows becomes a [`Phase::NotFound`] view.
pub fn aggregate(
    job_id: &JobId,
    accounting: &[AccountingRecord],
    live: &[LiveStatRecord],
    queue: Option<&QueueRecord>,
    nodes: Vec<NodeRecord>,
    gpu: Option<&GpuUsageSeries>,
    config: &ReportConfig,
) -> JobView {
    let resolved = resolve(job_id, accounting, live, queue);
    if resolved.phase == Phase::NotFound {
        return not_found(job_id);
    }
    let auth = resolved.authoritative;

    let live_steps: Vec<LiveStatRecord> = live
        .iter()
        .filter(|r| same_job(&r.step_id, job_id))
        .cloned()
        .collect();

    let usage = {
        let from_accounting = accounting_usage(&resolved.group);
        let from_live = live_usage(&live_steps);
        if resolved.is_running() {
            prefer(from_live, from_accounting)
        } else {
            prefer(from_accounting, from_live)
        }
    };

    let timing = match auth {
        Some(record) => JobTiming {
            submitted_at: record.submit_time,
            started_at: record
                .start_time
                .or_else(|| queue.and_then(|q| q.start_time)),
            ended_at: record.end_time,
            elapsed_secs: record
                .elapsed_secs
                .or_else(|| resolved.group.iter().filter_map(|r| r.elapsed_secs).max()),
            time_limit_secs: record.time_limit_secs,
        },
        None => JobTiming {
            started_at: queue.and_then(|q| q.start_time),
            ..Default::default()
        },
    };

    let allocation = match auth {
        Some(record) => JobAllocation {
            cpus: record.cpus,
            nodes: record.nodes,
            gpus: record.gpus,
            memory_kb: record
                .req_mem
                .and_then(|mem| mem.total_kb(record.cpus, record.nodes)),
            nodelist: record
                .nodelist
                .clone()
                .or_else(|| queue.and_then(|q| q.nodelist.clone())),
        },
        None => JobAllocation {
            nodelist: queue.and_then(|q| q.nodelist.clone()),
            ..Default::default()
        },
    };

    let steps = resolved
        .group
        .iter()
        .map(|r| StepSummary {
            step_id: r.step_id.clone(),
            state: r.state.clone(),
            elapsed_secs: r.elapsed_secs,
            cpu_time_secs: r.cpu_time_secs,
            max_rss_kb: r.max_rss_kb,
            exit_code: r.exit_code,
        })
        .collect();

    // Finished runs may fall outside the metrics window
    let gpu_utilization = match gpu {
        Some(series) if config.long_output && resolved.is_running() => series
            .mean_by_gpu()
            .into_iter()
            .map(|(index, mean_percent)| GpuUtilization {
                index,
                mean_percent,
            })
            .collect(),
        _ => Vec::new(),
    };

    JobView {
        job_id: job_id.clone(),
        phase: resolved.phase,
        state: resolved.state,
        name: auth.and_then(|r| r.name.clone()),
        user: auth.and_then(|r| r.user.clone()),
        account: auth.and_then(|r| r.account.clone()),
        partition: auth.and_then(|r| r.partition.clone()),
        exit_code: auth.and_then(|r| r.exit_code),
        timing,
        allocation,
        usage,
        queue: queue.map(|q| QueueInfo {
            reason: q.reason.clone(),
            priority: q.priority,
            start_time: q.start_time,
        }),
        steps,
        live_steps,
        nodes,
        gpu_utilization,
    }
}

fn not_found(job_id: &JobId) -> JobView {
    JobView {
        job_id: job_id.clone(),
        phase: Phase::NotFound,
        state: None,
        name: None,
        user: None,
        account: None,
        partition: None,
        exit_code: None,
        timing: JobTiming::default(),
        allocation: JobAllocation::default(),
        usage: JobUsage::default(),
        queue: None,
        steps: Vec::new(),
        live_steps: Vec::new(),
        nodes: Vec::new(),
        gpu_utilization: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{accounting, live, queued};
    use jobinfo_metrics::GpuSample;
    use jobinfo_slurm::SlurmJobState;

    fn id(s: &str) -> JobId {
        JobId::parse(s).unwrap()
    }

    fn long() -> ReportConfig {
        ReportConfig {
            long_output: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_accounting_state_beats_live() {
        let rows = vec![accounting("123", SlurmJobState::Completed)];
        let live_rows = vec![live("123", 5000, 9000)];
        let view = aggregate(&id("123"), &rows, &live_rows, None, vec![], None, &long());

        assert_eq!(view.phase, Phase::Accounted);
        assert_eq!(view.state, Some(SlurmJobState::Completed));
        assert_eq!(view.exit_code.map(|e| e.code), Some(0));
        assert_eq!(view.timing.elapsed_secs, Some(600));
        // Finished: accounting usage wins field by field
        assert_eq!(view.usage.cpu_time_secs, Some(100));
        assert_eq!(view.usage.max_rss_kb, Some(512));
        // Unknown in accounting, filled from live
        assert_eq!(view.usage.max_vmem_kb, Some(18000));
    }

    #[test]
    fn test_steps_sum_cpu_and_peak_memory() {
        let mut batch = accounting("123.batch", SlurmJobState::Completed);
        batch.cpu_time_secs = Some(40);
        batch.max_rss_kb = Some(3000);
        let mut ext = accounting("123.extern", SlurmJobState::Completed);
        ext.cpu_time_secs = Some(2);
        ext.max_rss_kb = Some(1);
        let rows = vec![accounting("123", SlurmJobState::Completed), batch, ext];

        let view = aggregate(&id("123"), &rows, &[], None, vec![], None, &long());
        assert_eq!(view.usage.cpu_time_secs, Some(142));
        assert_eq!(view.usage.max_rss_kb, Some(3000));
        assert_eq!(view.steps.len(), 3);
        assert_eq!(view.steps[1].step_id.as_str(), "123.batch");
    }

    #[test]
    fn test_live_only_is_running() {
        let live_rows = vec![live("456", 60, 100), live("456.batch", 30, 700)];
        let queue = queued("456", SlurmJobState::Running, Some("c[1-2]"));
        let view = aggregate(&id("456"), &[], &live_rows, Some(&queue), vec![], None, &long());

        assert_eq!(view.phase, Phase::Running);
        assert_eq!(view.state, Some(SlurmJobState::Running));
        assert!(view.is_running());
        assert_eq!(view.usage.cpu_time_secs, Some(90));
        assert_eq!(view.usage.max_rss_kb, Some(700));
        assert_eq!(view.allocation.nodelist.as_deref(), Some("c[1-2]"));
        assert_eq!(view.live_steps.len(), 2);
        assert!(view.exit_code.is_none());
    }

    #[test]
    fn test_running_accounting_prefers_live_usage() {
        let mut row = accounting("77", SlurmJobState::Running);
        row.max_rss_kb = None;
        row.cpu_time_secs = Some(0);
        let view = aggregate(&id("77"), &[row], &[live("77", 300, 1024)], None, vec![], None, &long());

        assert_eq!(view.phase, Phase::Accounted);
        assert_eq!(view.usage.cpu_time_secs, Some(300));
        assert_eq!(view.usage.max_rss_kb, Some(1024));
    }

    #[test]
    fn test_queue_only() {
        let queue = queued("789", SlurmJobState::Pending, None);
        let view = aggregate(&id("789"), &[], &[], Some(&queue), vec![], None, &long());

        assert_eq!(view.phase, Phase::Queued);
        assert_eq!(view.state, Some(SlurmJobState::Pending));
        assert_eq!(
            view.queue.as_ref().and_then(|q| q.reason.as_deref()),
            Some("Priority")
        );
    }

    #[test]
    fn test_not_found() {
        let view = aggregate(&id("999"), &[], &[], None, vec![], None, &long());
        assert_eq!(view.phase, Phase::NotFound);
        assert!(!view.is_found());
        assert!(view.state.is_none());
    }

    #[test]
    fn test_other_jobs_are_ignored() {
        let rows = vec![accounting("1234", SlurmJobState::Failed)];
        let live_rows = vec![live("1234", 1, 1)];
        let view = aggregate(&id("123"), &rows, &live_rows, None, vec![], None, &long());
        assert_eq!(view.phase, Phase::NotFound);
    }

    #[test]
    fn test_array_tasks_are_separate_jobs() {
        let rows: Vec<_> = ["123_1", "123_2", "123_3"]
            .into_iter()
            .map(|task| accounting(task, SlurmJobState::Completed))
            .collect();

        let task = aggregate(&id("123_2"), &rows, &[], None, vec![], None, &long());
        assert_eq!(task.steps.len(), 1);
        assert_eq!(task.usage.cpu_time_secs, Some(100));
        assert_eq!(task.cpu_seconds_reserved(), Some(2400));

        let parent = aggregate(&id("123"), &rows, &[], None, vec![], None, &long());
        assert_eq!(parent.phase, Phase::NotFound);
    }

    #[test]
    fn test_requested_step_is_authoritative() {
        let mut batch = accounting("123.batch", SlurmJobState::Failed);
        batch.exit_code = Some(jobinfo_parsers::ExitCode { code: 1, signal: 0 });
        let rows = vec![accounting("123", SlurmJobState::Completed), batch];
        let view = aggregate(&id("123.batch"), &rows, &[], None, vec![], None, &long());
        assert_eq!(view.state, Some(SlurmJobState::Failed));
        assert_eq!(view.exit_code.map(|e| e.code), Some(1));
    }

    #[test]
    fn test_gpu_only_for_running_jobs() {
        let mut series = GpuUsageSeries::default();
        series.push(0, GpuSample { timestamp: 0.0, percent: 50.0 });
        series.push(0, GpuSample { timestamp: 1.0, percent: 100.0 });

        let finished = vec![accounting("5", SlurmJobState::Completed)];
        let view = aggregate(&id("5"), &finished, &[], None, vec![], Some(&series), &long());
        assert!(view.gpu_utilization.is_empty());

        let running = vec![accounting("5", SlurmJobState::Running)];
        let view = aggregate(&id("5"), &running, &[], None, vec![], Some(&series), &long());
        assert_eq!(
            view.gpu_utilization,
            vec![GpuUtilization {
                index: 0,
                mean_percent: 75.0
            }]
        );

        let short = ReportConfig::default();
        let view = aggregate(&id("5"), &running, &[], None, vec![], Some(&series), &short);
        assert!(view.gpu_utilization.is_empty());
    }

    #[test]
    fn test_requested_memory_scope() {
        let mut row = accounting("8", SlurmJobState::Completed);
        row.req_mem = Some(jobinfo_slurm::RequestedMemory {
            kb: 1000,
            scope: jobinfo_parsers::MemoryScope::PerCpu,
        });
        let view = aggregate(&id("8"), &[row], &[], None, vec![], None, &long());
        assert_eq!(view.allocation.memory_kb, Some(4000));
    }
}
