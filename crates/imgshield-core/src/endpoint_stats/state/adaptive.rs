//! Adaptive timeout computation.

use std::collections::VecDeque;
use std::time::Duration;

use super::TimeoutSettings;

/// Sample mean and population standard deviation, or None when empty.
pub(super) fn mean_and_stddev(samples: &VecDeque<u64>) -> Option<(f64, f64)> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|&s| {
            let d = s as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    Some((mean, variance.sqrt()))
}

/// `clamp(mean + 2 * stddev, min, max)` rounded to the nearest ms, or the
/// default while fewer than `min_samples` samples exist.
///
/// Mean + 2 sigma covers roughly 95% of latencies for a near-normal endpoint.
pub(super) fn adaptive_timeout(samples: &VecDeque<u64>, settings: &TimeoutSettings) -> Duration {
    if samples.len() < settings.min_samples.max(1) {
        return settings.default;
    }
    let Some((mean, stddev)) = mean_and_stddev(samples) else {
        return settings.default;
    };
    let raw_ms = (mean + 2.0 * stddev).round().max(0.0) as u64;
    let min_ms = settings.min.as_millis() as u64;
    let max_ms = settings.max.as_millis() as u64;
    Duration::from_millis(raw_ms.clamp(min_ms, max_ms.max(min_ms)))
}
