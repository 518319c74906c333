//! Follow-up queries derived from the records already fetched.

use crate::phase::resolve;
use crate::types::ReportConfig;
use chrono::{DateTime, Utc};
use jobinfo_parsers::expand_hostlist;
use jobinfo_slurm::{AccountingRecord, JobId, LiveStatRecord, QueueRecord};

/// Node and metrics queries to run before aggregating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPlan {
    /// Distinct node names, in first-seen order
    pub nodes: Vec<String>,
    /// Query GPU utilization from this time on
    pub gpu_since: Option<DateTime<Utc>>,
}

impl QueryPlan {
    pub fn new(
        job_id: &JobId,
        accounting: &[AccountingRecord],
        live: &[LiveStatRecord],
        queue: Option<&QueueRecord>,
        config: &ReportConfig,
    ) -> Self {
        if !config.long_output {
            return Self::default();
        }

        let resolved = resolve(job_id, accounting, live, queue);

        // Authoritative row first, then steps, then the queue entry
        let nodelists = resolved
            .authoritative
            .into_iter()
            .chain(resolved.group.iter().copied())
            .filter_map(|r| r.nodelist.as_deref())
            .chain(queue.and_then(|q| q.nodelist.as_deref()));

        let mut nodes: Vec<String> = Vec::new();
        for nodelist in nodelists {
            for node in expand_hostlist(nodelist) {
                if !nodes.contains(&node) {
                    nodes.push(node);
                }
            }
        }

        // Only a definitely running job with GPUs gets a metrics query: the
        // series window may not cover a finished run.
        let has_gpus = resolved
            .authoritative
            .and_then(|r| r.gpus)
            .is_some_and(|gpus| gpus > 0);
        let gpu_since = match resolved.authoritative {
            Some(record)
                if config.metrics_url.is_some() && has_gpus && resolved.is_running() =>
            {
                record.start_time
            }
            _ => None,
        };

        tracing::debug!(
            "Plan for {}: {} node(s), GPU query: {}",
            job_id,
            nodes.len(),
            gpu_since.is_some()
        );

        Self { nodes, gpu_since }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{accounting, queued};
    use jobinfo_slurm::SlurmJobState;

    fn long() -> ReportConfig {
        ReportConfig {
            long_output: true,
            debug: false,
            metrics_url: Some("http://prometheus:9090".to_string()),
        }
    }

    #[test]
    fn test_nodes_expanded_once_in_order() {
        let mut alloc = accounting("10", SlurmJobState::Completed);
        alloc.nodelist = Some("n[01-03]".to_string());
        let mut batch = accounting("10.batch", SlurmJobState::Completed);
        batch.nodelist = Some("n01".to_string());
        let mut step = accounting("10.0", SlurmJobState::Completed);
        step.nodelist = Some("n[02-03],n05".to_string());

        let id = JobId::parse("10").unwrap();
        let plan = QueryPlan::new(&id, &[batch, alloc, step], &[], None, &long());
        assert_eq!(plan.nodes, vec!["n01", "n02", "n03", "n05"]);
    }

    #[test]
    fn test_short_output_plans_nothing() {
        let id = JobId::parse("10").unwrap();
        let rows = vec![accounting("10", SlurmJobState::Running)];
        let plan = QueryPlan::new(&id, &rows, &[], None, &ReportConfig::default());
        assert_eq!(plan, QueryPlan::default());
    }

    #[test]
    fn test_queue_nodelist_used_without_accounting() {
        let id = JobId::parse("11").unwrap();
        let queue = queued("11", SlurmJobState::Running, Some("gpu[1-2]"));
        let plan = QueryPlan::new(&id, &[], &[], Some(&queue), &long());
        assert_eq!(plan.nodes, vec!["gpu1", "gpu2"]);
        assert!(plan.gpu_since.is_none());
    }

    #[test]
    fn test_gpu_query_only_for_running_gpu_jobs() {
        let id = JobId::parse("12").unwrap();

        let mut running = accounting("12", SlurmJobState::Running);
        running.gpus = Some(2);
        let plan = QueryPlan::new(&id, &[running.clone()], &[], None, &long());
        assert_eq!(plan.gpu_since, running.start_time);

        let mut finished = running.clone();
        finished.state = SlurmJobState::Completed;
        assert!(QueryPlan::new(&id, &[finished], &[], None, &long()).gpu_since.is_none());

        let mut no_gpus = running.clone();
        no_gpus.gpus = Some(0);
        assert!(QueryPlan::new(&id, &[no_gpus], &[], None, &long()).gpu_since.is_none());

        let no_url = ReportConfig {
            metrics_url: None,
            ..long()
        };
        assert!(QueryPlan::new(&id, &[running], &[], None, &no_url).gpu_since.is_none());
    }
}
