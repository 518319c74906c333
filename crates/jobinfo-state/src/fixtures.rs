//! Record builders shared by the aggregation tests.

use jobinfo_parsers::{ExitCode, MemoryScope, parse_slurm_timestamp};
use jobinfo_slurm::{
    AccountingRecord, LiveStatRecord, QueueRecord, RequestedMemory, SlurmJobState, StepId,
};

pub fn accounting(id: &str, state: SlurmJobState) -> AccountingRecord {
    AccountingRecord {
        step_id: StepId::new(id),
        state,
        elapsed_secs: Some(600),
        time_limit_secs: Some(3600),
        cpus: Some(4),
        nodes: Some(1),
        req_mem: Some(RequestedMemory {
            kb: 4096,
            scope: MemoryScope::Total,
        }),
        gpus: Some(0),
        cpu_time_secs: Some(100),
        max_rss_kb: Some(512),
        max_vmem_kb: None,
        max_disk_read_kb: None,
        max_disk_write_kb: None,
        exit_code: Some(ExitCode { code: 0, signal: 0 }),
        submit_time: parse_slurm_timestamp("2024-01-15T10:00:00"),
        start_time: parse_slurm_timestamp("2024-01-15T10:05:00"),
        end_time: parse_slurm_timestamp("2024-01-15T10:15:00"),
        nodelist: Some("node01".to_string()),
        partition: Some("short".to_string()),
        user: Some("alice".to_string()),
        account: Some("lab".to_string()),
        name: Some("align".to_string()),
    }
}

pub fn live(id: &str, cpu: u64, rss: u64) -> LiveStatRecord {
    LiveStatRecord {
        step_id: StepId::new(id),
        cpu_time_secs: Some(cpu),
        max_rss_kb: Some(rss),
        max_vmem_kb: Some(rss * 2),
        max_disk_read_kb: Some(0),
        max_disk_write_kb: Some(0),
    }
}

pub fn queued(id: &str, state: SlurmJobState, nodelist: Option<&str>) -> QueueRecord {
    QueueRecord {
        job_id: id.to_string(),
        state,
        reason: Some("Priority".to_string()),
        start_time: parse_slurm_timestamp("2024-01-16T08:00:00"),
        priority: Some(1000),
        nodelist: nodelist.map(str::to_string),
    }
}
