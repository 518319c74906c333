//! GPU utilization time series for jobinfo.

pub mod prometheus;
pub mod types;

pub use prometheus::{FixtureMetrics, GpuMetrics, MetricsError, PrometheusClient, parse_gpu_usage};
pub use types::{GpuSample, GpuUsageSeries};
