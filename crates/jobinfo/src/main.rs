//! jobinfo - collect everything Slurm knows about one job.

mod error;
mod logging;
mod pipeline;

use clap::Parser;
use error::JobinfoError;
use jobinfo_cli::Args;
use jobinfo_metrics::{FixtureMetrics, PrometheusClient};
use jobinfo_slurm::{CommandSource, FixtureSource};
use miette::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.config();
    logging::init(config.debug);
    tracing::debug!("Report config: {:?}", config);

    let report = match &args.replay_dir {
        Some(dir) => {
            tracing::debug!("Replaying recorded output from {}", dir);
            let source = FixtureSource::new(dir.clone());
            let metrics = FixtureMetrics::new(dir.clone());
            pipeline::run(&source, Some(&metrics), &args.job_id, &config).await?
        }
        None => {
            let metrics = config
                .metrics_url
                .as_deref()
                .map(PrometheusClient::new)
                .transpose()
                .map_err(JobinfoError::MetricsClient)?;
            pipeline::run(&CommandSource, metrics.as_ref(), &args.job_id, &config).await?
        }
    };

    print!("{}", report);
    Ok(())
}
