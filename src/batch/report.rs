use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub input: String,
    pub output: String,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub failure_kind: Option<String>,
    pub latency_ms: u64,
    pub bits_used: usize,
    pub capacity_bits: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AggregatedStats {
    pub total_jobs: usize,
    pub successful_jobs: usize,
    pub failed_jobs: usize,
    pub failure_rate: f64,

    // Latency statistics (milliseconds)
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    pub latency_avg_ms: f64,
    pub latency_p50_ms: u64,
    pub latency_p95_ms: u64,

    // Payload bits written across successful jobs
    pub bits_embedded: usize,

    // Failure kinds breakdown
    pub failure_kinds: HashMap<String, usize>,
}

#[derive(Debug)]
pub struct BatchReport {
    started_at: String,
    start_time: Instant,
    jobs: Vec<JobRecord>,
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            started_at: chrono::Local::now().to_rfc3339(),
            start_time: Instant::now(),
            jobs: Vec::new(),
        }
    }

    pub fn record_success(
        &mut self,
        input: &Path,
        output: &Path,
        latency: Duration,
        bits_used: usize,
        capacity_bits: usize,
    ) {
        self.jobs.push(JobRecord {
            input: input.display().to_string(),
            output: output.display().to_string(),
            success: true,
            failure_reason: None,
            failure_kind: None,
            latency_ms: latency.as_millis() as u64,
            bits_used,
            capacity_bits,
        });
    }

    pub fn record_failure(
        &mut self,
        input: &Path,
        output: &Path,
        latency: Duration,
        kind: &str,
        reason: String,
    ) {
        self.jobs.push(JobRecord {
            input: input.display().to_string(),
            output: output.display().to_string(),
            success: false,
            failure_reason: Some(reason),
            failure_kind: Some(kind.to_string()),
            latency_ms: latency.as_millis() as u64,
            bits_used: 0,
            capacity_bits: 0,
        });
    }

    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn aggregate(&self) -> AggregatedStats {
        let mut stats = AggregatedStats::default();

        if self.jobs.is_empty() {
            return stats;
        }

        stats.total_jobs = self.jobs.len();
        stats.successful_jobs = self.jobs.iter().filter(|j| j.success).count();
        stats.failed_jobs = stats.total_jobs - stats.successful_jobs;
        stats.failure_rate = (stats.failed_jobs as f64 / stats.total_jobs as f64) * 100.0;

        let mut latencies: Vec<u64> = self
            .jobs
            .iter()
            .filter(|j| j.success)
            .map(|j| j.latency_ms)
            .collect();

        latencies.sort_unstable();
        if let (Some(&min), Some(&max)) = (latencies.first(), latencies.last()) {
            stats.latency_min_ms = min;
            stats.latency_max_ms = max;
            stats.latency_avg_ms =
                latencies.iter().sum::<u64>() as f64 / latencies.len() as f64;

            stats.latency_p50_ms = percentile(&latencies, 50.0);
            stats.latency_p95_ms = percentile(&latencies, 95.0);
        }

        stats.bits_embedded = self
            .jobs
            .iter()
            .filter(|j| j.success)
            .map(|j| j.bits_used)
            .sum();

        for job in self.jobs.iter().filter(|j| !j.success) {
            if let Some(kind) = &job.failure_kind {
                *stats.failure_kinds.entry(kind.clone()).or_insert(0) += 1;
            }
        }

        stats
    }

    pub fn export_to_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let stats = self.aggregate();

        let output = serde_json::json!({
            "started_at": self.started_at,
            "duration_ms": self.start_time.elapsed().as_millis() as u64,
            "aggregated_stats": stats,
            "jobs": self.jobs,
        });

        let json_string = serde_json::to_string_pretty(&output)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;

        Ok(())
    }
}

/// Nearest-rank percentile: the smallest sample such that at least `percentile`%
/// of the samples are less than or equal to it. `sorted_data` must be ascending.
fn percentile(sorted_data: &[u64], percentile: f64) -> u64 {
    if sorted_data.is_empty() {
        return 0;
    }

    let rank = (percentile / 100.0 * sorted_data.len() as f64).ceil() as usize;
    sorted_data[rank.clamp(1, sorted_data.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_percentile() {
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        assert_eq!(percentile(&data, 50.0), 5);
        assert_eq!(percentile(&data, 95.0), 10);
        assert_eq!(percentile(&data, 0.0), 1);
        assert_eq!(percentile(&data, 100.0), 10);
        assert_eq!(percentile(&[7], 95.0), 7);
        assert_eq!(percentile(&[], 50.0), 0);
    }

    #[test]
    fn test_report_aggregation() {
        let mut report = BatchReport::new();
        let out = PathBuf::from("out");

        report.record_success(Path::new("a.png"), &out, Duration::from_millis(40), 112, 300);
        report.record_success(Path::new("b.png"), &out, Duration::from_millis(60), 112, 900);
        report.record_failure(
            Path::new("c.png"),
            &out,
            Duration::from_millis(5),
            "insufficient_capacity",
            "insufficient capacity: need 112 bits but only 48 are available".to_string(),
        );

        let stats = report.aggregate();

        assert_eq!(stats.total_jobs, 3);
        assert_eq!(stats.successful_jobs, 2);
        assert_eq!(stats.failed_jobs, 1);
        assert_eq!(stats.latency_min_ms, 40);
        assert_eq!(stats.latency_max_ms, 60);
        assert_eq!(stats.bits_embedded, 224);
        assert_eq!(stats.failure_kinds.get("insufficient_capacity"), Some(&1));
    }

    #[test]
    fn test_export_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut report = BatchReport::new();
        report.record_success(Path::new("a.png"), Path::new("stego_a.png"), Duration::ZERO, 96, 300);
        report.export_to_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["aggregated_stats"]["total_jobs"], 1);
        assert_eq!(value["jobs"][0]["output"], "stego_a.png");
    }
}
