//! GPU utilization series types.

use std::collections::BTreeMap;

/// One utilization sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuSample {
    /// Unix timestamp in seconds
    pub timestamp: f64,
    /// Utilization in percent (0-100)
    pub percent: f64,
}

/// Utilization samples for a job, keyed by GPU index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuUsageSeries {
    pub gpus: BTreeMap<u32, Vec<GpuSample>>,
}

impl GpuUsageSeries {
    pub fn push(&mut self, gpu: u32, sample: GpuSample) {
        self.gpus.entry(gpu).or_default().push(sample);
    }

    pub fn is_empty(&self) -> bool {
        self.gpus.values().all(Vec::is_empty)
    }

    /// Arithmetic mean utilization per GPU index, skipping GPUs with no samples.
    pub fn mean_by_gpu(&self) -> Vec<(u32, f64)> {
        self.gpus
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(gpu, samples)| {
                let sum: f64 = samples.iter().map(|s| s.percent).sum();
                (*gpu, sum / samples.len() as f64)
            })
            .collect()
    }
}
