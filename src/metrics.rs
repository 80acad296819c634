use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::RequestOutcome;

/// Aggregate statistics of one concurrent request burst
///
/// Derived from a finite set of [`RequestOutcome`]s and recomputed fresh for
/// every run. The reduction is order-independent, so outcomes may be
/// collected in completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputStats {
    /// Successful requests per second of wall time
    pub throughput_rps: f64,
    /// Mean elapsed time of successful requests
    pub avg_response_time: Duration,
    pub min_response_time: Duration,
    pub max_response_time: Duration,
    /// Successful requests as a percentage of the requested count
    pub success_rate: f64,
    pub total_requests: usize,
    pub successful_requests: usize,
    /// Wall time of the whole burst, first submission to last completion
    pub wall_time: Duration,
}

impl ThroughputStats {
    /// Reduce request outcomes into aggregate statistics.
    ///
    /// `total_requests` is the requested count N and is the success-rate
    /// denominator even if fewer outcomes are supplied. Response times are
    /// computed over successful outcomes only; with no successes they are
    /// all zero.
    pub fn from_outcomes(
        outcomes: &[RequestOutcome],
        total_requests: usize,
        wall_time: Duration,
    ) -> Self {
        let successful: Vec<Duration> = outcomes
            .iter()
            .filter(|o| o.success)
            .map(|o| o.elapsed)
            .collect();
        let successful_requests = successful.len();

        let (avg_response_time, min_response_time, max_response_time) = if successful.is_empty() {
            (Duration::ZERO, Duration::ZERO, Duration::ZERO)
        } else {
            let total: Duration = successful.iter().sum();
            let avg = mean_duration(total, successful_requests);
            let min = successful.iter().min().copied().unwrap_or_default();
            let max = successful.iter().max().copied().unwrap_or_default();
            (avg, min, max)
        };

        let wall_secs = wall_time.as_secs_f64();
        let throughput_rps = if wall_secs > 0.0 {
            successful_requests as f64 / wall_secs
        } else {
            0.0
        };

        let success_rate = if total_requests > 0 {
            successful_requests as f64 / total_requests as f64 * 100.0
        } else {
            0.0
        };

        Self {
            throughput_rps,
            avg_response_time,
            min_response_time,
            max_response_time,
            success_rate,
            total_requests,
            successful_requests,
            wall_time,
        }
    }

    pub fn failed_requests(&self) -> usize {
        self.total_requests.saturating_sub(self.successful_requests)
    }
}

impl Default for ThroughputStats {
    fn default() -> Self {
        Self::from_outcomes(&[], 0, Duration::ZERO)
    }
}

fn mean_duration(total: Duration, count: usize) -> Duration {
    // Exact nanosecond division; fall back to f64 for counts beyond u32.
    match u32::try_from(count) {
        Ok(n) => total / n,
        Err(_) => Duration::from_secs_f64(total.as_secs_f64() / count as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(ms: u64) -> RequestOutcome {
        RequestOutcome::from_status(200, Duration::from_millis(ms))
    }

    fn refused(ms: u64) -> RequestOutcome {
        RequestOutcome::failed(Duration::from_millis(ms), "connection failed: refused")
    }

    #[test]
    fn test_empty_run_is_all_zero() {
        let stats = ThroughputStats::from_outcomes(&[], 0, Duration::ZERO);

        assert_eq!(stats.throughput_rps, 0.0);
        assert_eq!(stats.avg_response_time, Duration::ZERO);
        assert_eq!(stats.min_response_time, Duration::ZERO);
        assert_eq!(stats.max_response_time, Duration::ZERO);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.successful_requests, 0);
        assert_eq!(stats, ThroughputStats::default());
    }

    #[test]
    fn test_all_successful() {
        let outcomes = vec![ok(10), ok(20), ok(30), ok(40)];
        let stats = ThroughputStats::from_outcomes(&outcomes, 4, Duration::from_secs(2));

        assert_eq!(stats.avg_response_time, Duration::from_millis(25));
        assert_eq!(stats.min_response_time, Duration::from_millis(10));
        assert_eq!(stats.max_response_time, Duration::from_millis(40));
        assert_eq!(stats.success_rate, 100.0);
        assert_eq!(stats.throughput_rps, 2.0);
        assert_eq!(stats.failed_requests(), 0);
    }

    #[test]
    fn test_failures_are_excluded_from_latency() {
        let mut outcomes: Vec<RequestOutcome> = (0..93).map(|_| ok(5)).collect();
        outcomes.extend((0..7).map(|_| refused(900)));

        let stats = ThroughputStats::from_outcomes(&outcomes, 100, Duration::from_secs(1));

        assert_eq!(stats.success_rate, 93.0);
        assert_eq!(stats.successful_requests, 93);
        assert_eq!(stats.failed_requests(), 7);
        assert_eq!(stats.max_response_time, Duration::from_millis(5));
        assert_eq!(stats.avg_response_time, Duration::from_millis(5));
    }

    #[test]
    fn test_non_200_counts_as_failure() {
        let outcomes = vec![
            ok(10),
            RequestOutcome::from_status(500, Duration::from_millis(1)),
        ];
        let stats = ThroughputStats::from_outcomes(&outcomes, 2, Duration::from_secs(1));

        assert_eq!(stats.success_rate, 50.0);
        assert_eq!(stats.min_response_time, Duration::from_millis(10));
    }

    #[test]
    fn test_no_successes_yields_zero_latency() {
        let outcomes = vec![refused(100), refused(200)];
        let stats = ThroughputStats::from_outcomes(&outcomes, 2, Duration::from_millis(300));

        assert_eq!(stats.throughput_rps, 0.0);
        assert_eq!(stats.avg_response_time, Duration::ZERO);
        assert_eq!(stats.min_response_time, Duration::ZERO);
        assert_eq!(stats.max_response_time, Duration::ZERO);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_requested_count_is_the_denominator() {
        let outcomes = vec![ok(10), ok(10)];
        let stats = ThroughputStats::from_outcomes(&outcomes, 4, Duration::from_secs(1));
        assert_eq!(stats.success_rate, 50.0);
        assert_eq!(stats.total_requests, 4);
    }

    #[test]
    fn test_throughput_uses_wall_time_not_summed_latency() {
        // Ten overlapping 1s requests finishing within 1s of wall time.
        let outcomes: Vec<RequestOutcome> = (0..10).map(|_| ok(1000)).collect();
        let stats = ThroughputStats::from_outcomes(&outcomes, 10, Duration::from_secs(1));
        assert_eq!(stats.throughput_rps, 10.0);
    }
}
