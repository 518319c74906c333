//! CLI argument parsing for jobinfo.

use camino::Utf8PathBuf;
use clap::Parser;
use jobinfo_state::ReportConfig;

#[derive(Parser, Debug)]
#[command(name = "jobinfo")]
#[command(about = "Collect information about a Slurm job")]
pub struct Args {
    /// Job ID, optionally with an array index or step (123, 123_4, 123.batch)
    pub job_id: String,

    /// Show efficiency, step, node and GPU detail
    #[arg(short, long)]
    pub long: bool,

    /// Log the commands run and the records they returned
    #[arg(short, long)]
    pub debug: bool,

    /// Prometheus server holding GPU utilization series
    #[arg(long, env = "JOBINFO_PROMETHEUS_URL")]
    pub prometheus_url: Option<String>,

    /// Read recorded command output from this directory instead of running Slurm
    #[arg(long, hide = true)]
    pub replay_dir: Option<Utf8PathBuf>,
}

impl Args {
    pub fn config(&self) -> ReportConfig {
        ReportConfig {
            long_output: self.long,
            debug: self.debug,
            metrics_url: self
                .prometheus_url
                .clone()
                .filter(|url| !url.trim().is_empty()),
        }
    }
}
