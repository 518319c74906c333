//! Plain-text job report.
//!
//! One `Label : value` field per line, so reports can be compared line by
//! line against recorded output.

use jobinfo_parsers::{format_duration_slurm, format_memory_kb, format_timestamp};
use jobinfo_slurm::{NodeRecord, SlurmJobState};
use jobinfo_state::{JobView, ReportConfig, efficiency};

const LABEL_WIDTH: usize = 21;
const UNKNOWN: &str = "N/A";

fn field(lines: &mut Vec<String>, label: &str, value: impl AsRef<str>) {
    lines.push(format!(
        "{:<width$}: {}",
        label,
        value.as_ref(),
        width = LABEL_WIDTH
    ));
}

fn or_unknown<T>(value: Option<T>, format: impl Fn(T) -> String) -> String {
    value.map(format).unwrap_or_else(|| UNKNOWN.to_string())
}

fn duration(secs: Option<u64>) -> String {
    or_unknown(secs, format_duration_slurm)
}

fn memory(kb: Option<u64>) -> String {
    or_unknown(kb, format_memory_kb)
}

fn text(value: Option<&str>) -> String {
    or_unknown(value, str::to_string)
}

fn percent(value: Option<f64>) -> String {
    or_unknown(value, |p| format!("{:.1}%", p))
}

/// `used / requested (pct)` with the percentage only when it is defined.
fn ratio(used: String, requested: String, pct: Option<f64>) -> String {
    format!("{} / {} ({})", used, requested, percent(pct))
}

/// Render a job report.
pub fn render(view: &JobView, config: &ReportConfig) -> String {
    let mut report = build_lines(view, config).join("\n");
    report.push('\n');
    report
}

fn build_lines(view: &JobView, config: &ReportConfig) -> Vec<String> {
    let mut lines = Vec::new();

    if !view.is_found() {
        lines.push(format!("No job found with id {}", view.job_id));
        return lines;
    }

    // Identity
    field(&mut lines, "Job ID", view.job_id.as_str());
    field(&mut lines, "Name", text(view.name.as_deref()));
    field(&mut lines, "User", text(view.user.as_deref()));
    field(&mut lines, "Account", text(view.account.as_deref()));
    field(&mut lines, "Partition", text(view.partition.as_deref()));
    field(
        &mut lines,
        "State",
        or_unknown(view.state.as_ref(), SlurmJobState::to_string),
    );
    field(
        &mut lines,
        "Exit code",
        or_unknown(view.exit_code, |e| e.to_string()),
    );

    // Allocation
    let alloc = &view.allocation;
    field(&mut lines, "Cores", or_unknown(alloc.cpus, |c| c.to_string()));
    field(&mut lines, "Nodes", or_unknown(alloc.nodes, |n| n.to_string()));
    field(&mut lines, "Node list", text(alloc.nodelist.as_deref()));
    field(&mut lines, "GPUs", or_unknown(alloc.gpus, |g| g.to_string()));
    field(&mut lines, "Requested memory", memory(alloc.memory_kb));

    // Timing
    let timing = &view.timing;
    field(
        &mut lines,
        "Submit",
        or_unknown(timing.submitted_at.as_ref(), format_timestamp),
    );
    field(
        &mut lines,
        "Start",
        or_unknown(timing.started_at.as_ref(), format_timestamp),
    );
    field(
        &mut lines,
        "End",
        or_unknown(timing.ended_at.as_ref(), format_timestamp),
    );
    field(&mut lines, "Reserved walltime", duration(timing.time_limit_secs));
    field(&mut lines, "Used walltime", duration(timing.elapsed_secs));

    // Usage
    field(&mut lines, "Used CPU time", duration(view.usage.cpu_time_secs));
    field(&mut lines, "Max memory used", memory(view.usage.max_rss_kb));

    // Queue
    let pending = view.state == Some(SlurmJobState::Pending);
    if let Some(queue) = view.queue.as_ref().filter(|_| pending) {
        field(&mut lines, "Pending reason", text(queue.reason.as_deref()));
        field(
            &mut lines,
            "Priority",
            or_unknown(queue.priority, |p| p.to_string()),
        );
        field(
            &mut lines,
            "Expected start",
            or_unknown(queue.start_time.as_ref(), format_timestamp),
        );
    }

    // Live steps
    if !view.live_steps.is_empty() {
        field(
            &mut lines,
            "Currently running",
            format!("{} step(s)", view.live_steps.len()),
        );
        for step in &view.live_steps {
            field(
                &mut lines,
                &format!("  {}", step.step_id),
                format!(
                    "CPU {}, memory {}, virtual {}, read {}, written {}",
                    duration(step.cpu_time_secs),
                    memory(step.max_rss_kb),
                    memory(step.max_vmem_kb),
                    memory(step.max_disk_read_kb),
                    memory(step.max_disk_write_kb),
                ),
            );
        }
    }

    if config.long_output {
        build_long_lines(&mut lines, view);
    }

    lines
}

fn build_long_lines(lines: &mut Vec<String>, view: &JobView) {
    // Efficiency
    field(
        lines,
        "CPU efficiency",
        ratio(
            duration(view.usage.cpu_time_secs),
            duration(view.cpu_seconds_reserved()),
            view.cpu_efficiency(),
        ),
    );
    field(
        lines,
        "Memory efficiency",
        ratio(
            memory(view.usage.max_rss_kb),
            memory(view.allocation.memory_kb),
            view.memory_efficiency(),
        ),
    );
    field(
        lines,
        "Walltime efficiency",
        ratio(
            duration(view.timing.elapsed_secs),
            duration(view.timing.time_limit_secs),
            view.walltime_efficiency(),
        ),
    );
    field(lines, "Max virtual memory", memory(view.usage.max_vmem_kb));
    field(lines, "Max disk read", memory(view.usage.max_disk_read_kb));
    field(lines, "Max disk write", memory(view.usage.max_disk_write_kb));

    // Steps
    if !view.steps.is_empty() {
        field(lines, "Steps", view.steps.len().to_string());
        for step in &view.steps {
            field(
                lines,
                &format!("  {}", step.step_id),
                format!(
                    "{}, elapsed {}, CPU {}, memory {}, exit {}",
                    step.state,
                    duration(step.elapsed_secs),
                    duration(step.cpu_time_secs),
                    memory(step.max_rss_kb),
                    or_unknown(step.exit_code, |e| e.to_string()),
                ),
            );
        }
    }

    // Nodes
    for node in &view.nodes {
        field(lines, &format!("Node {}", node.name), node_detail(node));
    }

    // GPUs
    for gpu in &view.gpu_utilization {
        field(
            lines,
            &format!("GPU {} utilization", gpu.index),
            format!("{:.1}%", gpu.mean_percent),
        );
    }
}

fn node_detail(node: &NodeRecord) -> String {
    let cpus = or_unknown(node.cpus, |c| c.to_string());
    let cpus_alloc = or_unknown(node.cpus_allocated, |c| c.to_string());
    let mut detail = format!(
        "{}, {}/{} CPUs allocated, {} of {} memory allocated ({})",
        text(node.state.as_deref()),
        cpus_alloc,
        cpus,
        memory(node.allocated_memory_kb),
        memory(node.real_memory_kb),
        percent(efficiency(node.allocated_memory_kb, node.real_memory_kb)),
    );

    match (node.gpus, node.gpu_type.as_deref()) {
        (Some(gpus), Some(kind)) if gpus > 0 => {
            detail.push_str(&format!(", {} GPUs ({})", gpus, kind))
        }
        (Some(gpus), _) if gpus > 0 => detail.push_str(&format!(", {} GPUs", gpus)),
        _ => {}
    }

    if !node.features.is_empty() {
        detail.push_str(&format!(", features {}", node.features.join(",")));
    }

    detail
}
