use std::time::Duration;

use loadsweep_common::{LoadStats, Sample};

/// Cap on distinct failure descriptions carried in a summary.
const ERROR_SAMPLE_LIMIT: usize = 5;

/// Latency percentile with linear interpolation between closest ranks.
///
/// `p` is a percentage in `[0, 100]`. Returns 0.0 for an empty slice.
/// Sorts ascending and computes the fractional rank `k = (n - 1) * p / 100`;
/// an integral rank indexes directly, otherwise the two straddling values are
/// blended by their distance to `k`. The upper rank is clamped to the last
/// element, so `p = 100` returns the maximum.
pub fn percentile(samples: &[f64], p: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let k = (sorted.len() - 1) as f64 * p / 100.0;
    let f = k.floor() as usize;
    let c = (f + 1).min(sorted.len() - 1);
    if f == c {
        return sorted[k as usize];
    }
    sorted[f] * (c as f64 - k) + sorted[c] * (k - f as f64)
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Interpolating median: even-length input blends the two middle values.
pub fn median(samples: &[f64]) -> f64 {
    percentile(samples, 50.0)
}

/// Compute the full summary for one slice of the run.
///
/// `actual_duration` is the wall-clock time that produced the slice (first
/// spawn through end of drain); the achieved rate is requests over that span.
pub fn summarize(samples: &[Sample], actual_duration: Duration) -> LoadStats {
    let latencies: Vec<f64> = samples.iter().map(|s| s.latency_ms).collect();
    let requests_sent = samples.len() as u64;
    let succeeded = samples.iter().filter(|s| s.is_success()).count() as u64;
    let actual_duration_s = actual_duration.as_secs_f64();
    let achieved_rps = if actual_duration_s > 0.0 {
        requests_sent as f64 / actual_duration_s
    } else {
        0.0
    };

    let mut error_sample: Vec<String> = Vec::new();
    for error in samples.iter().filter_map(Sample::failure) {
        if error_sample.len() == ERROR_SAMPLE_LIMIT {
            break;
        }
        if !error_sample.iter().any(|seen| seen == error) {
            error_sample.push(error.to_string());
        }
    }

    LoadStats {
        requests_sent,
        succeeded,
        failed: requests_sent - succeeded,
        actual_duration_s,
        achieved_rps,
        latency_avg_ms: mean(&latencies),
        latency_median_ms: median(&latencies),
        latency_p95_ms: percentile(&latencies, 95.0),
        latency_p99_ms: percentile(&latencies, 99.0),
        error_sample,
    }
}
