//! GPU utilization from a Prometheus server scraping the NVIDIA exporter.

use crate::types::{GpuSample, GpuUsageSeries};
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Metric carrying per-GPU utilization, labelled with the Slurm job id.
const GPU_METRIC: &str = "nvidia_gpu_duty_cycle";

/// Labels that carry the GPU index, in order of preference.
const GPU_INDEX_LABELS: [&str; 3] = ["minor_number", "gpu", "index"];

/// Prometheus rejects ranges with more points than this.
const MAX_POINTS: i64 = 10_000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Metrics request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Metrics server answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Metrics query failed: {0}")]
    Query(String),
    #[error("Could not decode metrics response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Could not read recorded metrics {path}: {error}")]
    Fixture { path: Utf8PathBuf, error: String },
}

/// Source of GPU utilization series for a job.
#[allow(async_fn_in_trait)]
pub trait GpuMetrics {
    /// Samples for `job_id` since `since`; `None` when the service has none.
    async fn gpu_usage(
        &self,
        job_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<GpuUsageSeries>, MetricsError>;
}

#[derive(Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct QueryData {
    result: Vec<MatrixSeries>,
}

#[derive(Deserialize)]
struct MatrixSeries {
    #[serde(default)]
    metric: HashMap<String, String>,
    values: Vec<(f64, String)>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    Matrix(QueryResponse),
    /// Bare `[[ts, "pct"], ...]` for a single GPU
    Samples(Vec<(f64, String)>),
}

fn push_samples(series: &mut GpuUsageSeries, gpu: u32, values: &[(f64, String)]) {
    for (timestamp, value) in values {
        match value.parse::<f64>() {
            Ok(percent) if percent.is_finite() => series.push(
                gpu,
                GpuSample {
                    timestamp: *timestamp,
                    percent,
                },
            ),
            _ => tracing::debug!("Ignoring GPU sample {:?} at {}", value, timestamp),
        }
    }
}

/// Decode a Prometheus range query response into per-GPU samples.
pub fn parse_gpu_usage(body: &[u8]) -> Result<GpuUsageSeries, MetricsError> {
    let mut series = GpuUsageSeries::default();

    match serde_json::from_slice::<ResponseBody>(body)? {
        ResponseBody::Samples(values) => push_samples(&mut series, 0, &values),
        ResponseBody::Matrix(response) => {
            if response.status != "success" {
                return Err(MetricsError::Query(
                    response.error.unwrap_or(response.status),
                ));
            }
            let result = response.data.map(|d| d.result).unwrap_or_default();
            for (position, matrix) in result.iter().enumerate() {
                let gpu = GPU_INDEX_LABELS
                    .iter()
                    .find_map(|label| matrix.metric.get(*label))
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(position as u32);
                push_samples(&mut series, gpu, &matrix.values);
            }
        }
    }

    Ok(series)
}

fn none_if_empty(series: GpuUsageSeries) -> Option<GpuUsageSeries> {
    if series.is_empty() { None } else { Some(series) }
}

/// Queries a Prometheus server over HTTP.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    base_url: String,
    client: reqwest::Client,
}

impl PrometheusClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, MetricsError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn range_params(job_id: &str, since: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let end = Utc::now();
        let span = (end - since).num_seconds().max(1);
        let step = (span / MAX_POINTS).max(15);
        vec![
            ("query", format!("{}{{slurm_job=\"{}\"}}", GPU_METRIC, job_id)),
            ("start", since.timestamp().to_string()),
            ("end", end.timestamp().to_string()),
            ("step", step.to_string()),
        ]
    }
}

impl GpuMetrics for PrometheusClient {
    async fn gpu_usage(
        &self,
        job_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<GpuUsageSeries>, MetricsError> {
        let url = format!("{}/api/v1/query_range", self.base_url);
        tracing::debug!("Querying {} for job {}", url, job_id);

        let response = self
            .client
            .get(&url)
            .query(&Self::range_params(job_id, since))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(MetricsError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        parse_gpu_usage(&body).map(none_if_empty)
    }
}

/// Serves a recorded response (`gpu.json`) from a directory.
#[derive(Debug, Clone)]
pub struct FixtureMetrics {
    dir: Utf8PathBuf,
}

impl FixtureMetrics {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl GpuMetrics for FixtureMetrics {
    async fn gpu_usage(
        &self,
        _job_id: &str,
        _since: DateTime<Utc>,
    ) -> Result<Option<GpuUsageSeries>, MetricsError> {
        let path = self.dir.join("gpu.json");
        match tokio::fs::read(&path).await {
            Ok(body) => parse_gpu_usage(&body).map(none_if_empty),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MetricsError::Fixture {
                path,
                error: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_samples() {
        let series = parse_gpu_usage(br#"[[0,"50"], [1,"100"]]"#).unwrap();
        assert_eq!(series.mean_by_gpu(), vec![(0, 75.0)]);
    }

    #[test]
    fn test_parse_matrix() {
        let body = br#"{
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [
                    {"metric": {"minor_number": "1", "slurm_job": "42"},
                     "values": [[1700000000, "20"], [1700000015, "40"]]},
                    {"metric": {"minor_number": "0", "slurm_job": "42"},
                     "values": [[1700000000, "90"], [1700000015, "NaN"]]}
                ]
            }
        }"#;
        let series = parse_gpu_usage(body).unwrap();
        assert_eq!(series.mean_by_gpu(), vec![(0, 90.0), (1, 30.0)]);
    }

    #[test]
    fn test_parse_error_status() {
        let body = br#"{"status": "error", "errorType": "bad_data", "error": "parse error"}"#;
        assert!(matches!(
            parse_gpu_usage(body),
            Err(MetricsError::Query(msg)) if msg == "parse error"
        ));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_gpu_usage(b"not json"),
            Err(MetricsError::Decode(_))
        ));
    }

    #[test]
    fn test_range_params_step() {
        let since = Utc::now() - chrono::Duration::hours(1);
        let params = PrometheusClient::range_params("42", since);
        assert_eq!(params[0].1, "nvidia_gpu_duty_cycle{slurm_job=\"42\"}");
        assert_eq!(params[3].1, "15");
    }

    #[tokio::test]
    async fn test_fixture_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let utf8 = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let metrics = FixtureMetrics::new(utf8);
        assert!(metrics.gpu_usage("1", Utc::now()).await.unwrap().is_none());

        std::fs::write(dir.path().join("gpu.json"), r#"[[0,"50"], [1,"100"]]"#).unwrap();
        let series = metrics.gpu_usage("1", Utc::now()).await.unwrap().unwrap();
        assert_eq!(series.mean_by_gpu(), vec![(0, 75.0)]);
    }
}
