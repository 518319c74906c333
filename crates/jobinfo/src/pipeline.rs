//! One jobinfo run: query every source in turn, merge, render.

use crate::error::JobinfoError;
use jobinfo_metrics::GpuMetrics;
use jobinfo_report::render;
use jobinfo_slurm::{
    JobId, SlurmSource, query_accounting, query_live_stats, query_node, query_queue,
};
use jobinfo_state::{JobView, QueryPlan, ReportConfig, aggregate};

/// Produce the report for `job_id`.
pub async fn run<S: SlurmSource, M: GpuMetrics>(
    source: &S,
    metrics: Option<&M>,
    job_id: &str,
    config: &ReportConfig,
) -> Result<String, JobinfoError> {
    let job_id = JobId::parse(job_id)?;
    let view = collect(source, metrics, &job_id, config).await?;
    Ok(render(&view, config))
}

async fn collect<S: SlurmSource, M: GpuMetrics>(
    source: &S,
    metrics: Option<&M>,
    job_id: &JobId,
    config: &ReportConfig,
) -> Result<JobView, JobinfoError> {
    let accounting = query_accounting(source, job_id).await?;
    tracing::debug!("{} accounting record(s) for {}", accounting.len(), job_id);

    // Every row finished: nothing left for sstat to sample
    let finished = !accounting.is_empty() && accounting.iter().all(|r| r.state.is_terminal());
    let live = if finished {
        tracing::debug!("Job {} has finished, skipping live stats", job_id);
        Vec::new()
    } else {
        query_live_stats(source, job_id).await?
    };
    tracing::debug!("{} live record(s) for {}", live.len(), job_id);

    let queue = query_queue(source, job_id).await?;
    tracing::debug!("Queue record for {}: {:?}", job_id, queue);

    let plan = QueryPlan::new(job_id, &accounting, &live, queue.as_ref(), config);

    let mut nodes = Vec::new();
    for name in &plan.nodes {
        nodes.extend(query_node(source, name).await?);
    }

    let gpu = match (plan.gpu_since, metrics) {
        (Some(since), Some(metrics)) => {
            match metrics.gpu_usage(job_id.base(), since).await {
                Ok(series) => series,
                Err(e) => {
                    tracing::warn!("GPU utilization unavailable for {}: {}", job_id, e);
                    None
                }
            }
        }
        _ => None,
    };

    Ok(aggregate(
        job_id,
        &accounting,
        &live,
        queue.as_ref(),
        nodes,
        gpu.as_ref(),
        config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use jobinfo_metrics::FixtureMetrics;
    use jobinfo_slurm::{FixtureSource, SourceError, SourceKind};
    use std::cell::RefCell;
    use std::fs;

    const SACCT: &str = "\
123☃COMPLETED☃00:10:00☃01:00:00☃4☃1☃4G☃cpu=4,mem=4G,node=1☃00:12:00☃☃☃☃☃0:0☃2024-01-15T10:00:00☃2024-01-15T10:05:00☃2024-01-15T10:15:00☃node[01-02]☃short☃alice☃lab☃align
123.batch☃COMPLETED☃00:10:00☃☃4☃1☃☃cpu=4,mem=4G,node=1☃00:08:00☃3G☃4G☃12M☃2M☃0:0☃2024-01-15T10:05:00☃2024-01-15T10:05:00☃2024-01-15T10:15:00☃node01☃☃☃lab☃batch
123.extern☃COMPLETED☃00:10:00☃☃4☃2☃☃cpu=4,mem=4G,node=2☃00:00:01☃1M☃5M☃0☃0☃0:0☃2024-01-15T10:05:00☃2024-01-15T10:05:00☃2024-01-15T10:15:00☃node[01-02]☃☃☃lab☃extern
777☃RUNNING☃00:30:00☃02:00:00☃8☃1☃32G☃cpu=8,gres/gpu=2,mem=32G,node=1☃00:00:00☃☃☃☃☃0:0☃2024-01-16T09:00:00☃2024-01-16T09:10:00☃Unknown☃gpu01☃gpu☃bob☃lab☃train
";

    const SSTAT: &str = "\
123|00:59:00|9G|9G|0|0
456|00:01:00|100M|200M|0|0
456.batch|00:02:00|300M|400M|1M|1M
777.batch|01:00:00|20G|22G|0|0
";

    const SQUEUE: &str = "\
456|RUNNING|None|2024-01-16T08:00:00|1000|c[1-2]
789|PENDING|Priority|2024-01-17T08:00:00|500|
";

    const SCONTROL: &str = "\
NodeName=node01 CPUAlloc=4 CPUTot=32 RealMemory=128000 AllocMem=4096 State=MIXED Gres=(null)
NodeName=node02 CPUAlloc=0 CPUTot=32 RealMemory=128000 AllocMem=0 State=IDLE Gres=(null)
NodeName=gpu01 CPUAlloc=8 CPUTot=64 RealMemory=512000 AllocMem=32768 State=MIXED Gres=gpu:a100:4
";

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sacct.txt"), SACCT).unwrap();
        fs::write(dir.path().join("sstat.txt"), SSTAT).unwrap();
        fs::write(dir.path().join("squeue.txt"), SQUEUE).unwrap();
        fs::write(dir.path().join("scontrol.txt"), SCONTROL).unwrap();
        fs::write(dir.path().join("gpu.json"), r#"[[0,"50"],[1,"100"]]"#).unwrap();
        dir
    }

    fn utf8(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    /// Records every query on its way to the recorded output.
    struct CountingSource {
        inner: FixtureSource,
        calls: RefCell<Vec<(SourceKind, String)>>,
    }

    impl CountingSource {
        fn new(dir: &tempfile::TempDir) -> Self {
            Self {
                inner: FixtureSource::new(utf8(dir)),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls_to(&self, kind: SourceKind) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .filter(|(k, _)| *k == kind)
                .map(|(_, id)| id.clone())
                .collect()
        }
    }

    impl SlurmSource for CountingSource {
        async fn fetch(
            &self,
            kind: SourceKind,
            identifier: &str,
        ) -> Result<Option<String>, SourceError> {
            self.calls
                .borrow_mut()
                .push((kind, identifier.to_string()));
            self.inner.fetch(kind, identifier).await
        }
    }

    fn short() -> ReportConfig {
        ReportConfig::default()
    }

    fn long() -> ReportConfig {
        ReportConfig {
            long_output: true,
            debug: false,
            metrics_url: Some("http://prometheus:9090".to_string()),
        }
    }

    async fn report(dir: &tempfile::TempDir, job_id: &str, config: &ReportConfig) -> String {
        let source = FixtureSource::new(utf8(dir));
        let metrics = FixtureMetrics::new(utf8(dir));
        run(&source, Some(&metrics), job_id, config).await.unwrap()
    }

    #[tokio::test]
    async fn test_completed_job() {
        let dir = fixture_dir();
        let out = report(&dir, "123", &short()).await;

        assert!(out.starts_with("Job ID               : 123\n"));
        assert!(out.contains("State                : COMPLETED\n"));
        assert!(out.contains("Used walltime        : 00:10:00\n"));
        // 12 + 8 minutes and one second over the allocation and its steps
        assert!(out.contains("Used CPU time        : 00:20:01\n"));
        assert!(out.contains("Max memory used      : 3.0 GB\n"));
        assert!(!out.contains("Currently running"));
    }

    #[tokio::test]
    async fn test_finished_job_skips_live_stats() {
        let dir = fixture_dir();
        let source = CountingSource::new(&dir);
        run(&source, None::<&FixtureMetrics>, "123", &short())
            .await
            .unwrap();

        assert!(source.calls_to(SourceKind::LiveStats).is_empty());
        assert_eq!(source.calls_to(SourceKind::Accounting), vec!["123"]);
        assert_eq!(source.calls_to(SourceKind::Queue), vec!["123"]);
        // Short output needs no node detail
        assert!(source.calls_to(SourceKind::Node).is_empty());
    }

    #[tokio::test]
    async fn test_live_only_job_is_running() {
        let dir = fixture_dir();
        let out = report(&dir, "456", &short()).await;

        assert!(out.contains("State                : RUNNING\n"));
        assert!(out.contains("Used CPU time        : 00:03:00\n"));
        assert!(out.contains("Max memory used      : 300 MB\n"));
        assert!(out.contains("Node list            : c[1-2]\n"));
        assert!(out.contains("Currently running    : 2 step(s)\n"));
    }

    #[tokio::test]
    async fn test_queued_job() {
        let dir = fixture_dir();
        let out = report(&dir, "789", &short()).await;

        assert!(out.contains("State                : PENDING\n"));
        assert!(out.contains("Pending reason       : Priority\n"));
        assert!(out.contains("Priority             : 500\n"));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let dir = fixture_dir();
        let out = report(&dir, "999", &long()).await;
        assert_eq!(out, "No job found with id 999\n");
    }

    #[tokio::test]
    async fn test_nodes_queried_once_each() {
        let dir = fixture_dir();
        let source = CountingSource::new(&dir);
        let out = run(&source, None::<&FixtureMetrics>, "123", &long())
            .await
            .unwrap();

        assert_eq!(source.calls_to(SourceKind::Node), vec!["node01", "node02"]);
        assert!(out.contains("Node node01          : MIXED, 4/32 CPUs allocated"));
        assert!(out.contains("Node node02          : IDLE, 0/32 CPUs allocated"));
        assert!(out.contains("Steps                : 3\n"));
    }

    #[tokio::test]
    async fn test_running_gpu_job() {
        let dir = fixture_dir();
        let out = report(&dir, "777", &long()).await;

        // Accounting still says 0 CPU seconds; the live sample wins while running
        assert!(out.contains("State                : RUNNING\n"));
        assert!(out.contains("Used CPU time        : 01:00:00\n"));
        assert!(out.contains("Max memory used      : 20.0 GB\n"));
        assert!(out.contains("GPU 0 utilization    : 75.0%\n"));
        assert!(out.contains("Node gpu01           : MIXED, 8/64 CPUs allocated"));
    }

    #[tokio::test]
    async fn test_gpu_skipped_without_metrics_url() {
        let dir = fixture_dir();
        let config = ReportConfig {
            metrics_url: None,
            ..long()
        };
        let out = report(&dir, "777", &config).await;
        assert!(!out.contains("utilization"));
    }

    #[tokio::test]
    async fn test_report_is_idempotent() {
        let dir = fixture_dir();
        let first = report(&dir, "123", &long()).await;
        let second = report(&dir, "123", &long()).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalid_job_id() {
        let dir = fixture_dir();
        let source = FixtureSource::new(utf8(&dir));
        let err = run(&source, None::<&FixtureMetrics>, "abc", &short())
            .await
            .unwrap_err();
        assert!(matches!(err, JobinfoError::InvalidJobId(_)));
    }

    #[tokio::test]
    async fn test_unreadable_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the recording should be cannot be read as text
        fs::create_dir(dir.path().join("sacct.txt")).unwrap();
        let source = FixtureSource::new(utf8(&dir));
        let err = run(&source, None::<&FixtureMetrics>, "123", &short())
            .await
            .unwrap_err();
        assert!(matches!(err, JobinfoError::SourceUnavailable(_)));
    }
}
