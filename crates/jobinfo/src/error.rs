use jobinfo_metrics::MetricsError;
use jobinfo_slurm::{JobIdError, SourceError};
use miette::Diagnostic;
use thiserror::Error;

/// Failures that end a run without a report.
///
/// A job that no source knows is not an error; it renders as a report.
#[derive(Debug, Error, Diagnostic)]
pub enum JobinfoError {
    #[error(transparent)]
    #[diagnostic(
        code(jobinfo::invalid_job_id),
        help("Pass a Slurm job id such as 123, 123_4 or 123.batch")
    )]
    InvalidJobId(#[from] JobIdError),

    #[error(transparent)]
    #[diagnostic(
        code(jobinfo::source_unavailable),
        help("Check that the Slurm client commands are installed and on PATH")
    )]
    SourceUnavailable(#[from] SourceError),

    #[error("Could not set up the metrics client")]
    #[diagnostic(
        code(jobinfo::metrics_client),
        help("Check --prometheus-url or JOBINFO_PROMETHEUS_URL")
    )]
    MetricsClient(#[source] MetricsError),
}
