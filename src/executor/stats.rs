use schemars::JsonSchema;
use serde::Serialize;

/// Running aggregates over every task the executor has completed since
/// construction or the last reset. Durations are kept whole (not windowed)
/// so percentiles cover the full history.
#[derive(Debug, Default)]
pub(crate) struct StatsInner {
    total_executed: u64,
    total_succeeded: u64,
    total_failed: u64,
    total_retries: u64,
    total_duration_ms: u64,
    durations_ms: Vec<u64>,
}

impl StatsInner {
    pub fn record(&mut self, success: bool, retries: u32, duration_ms: u64) {
        self.total_executed += 1;
        if success {
            self.total_succeeded += 1;
        } else {
            self.total_failed += 1;
        }
        self.total_retries += u64::from(retries);
        self.total_duration_ms += duration_ms;
        self.durations_ms.push(duration_ms);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let mut sorted = self.durations_ms.clone();
        sorted.sort_unstable();

        let success_rate = if self.total_executed == 0 {
            0.0
        } else {
            self.total_succeeded as f64 / self.total_executed as f64 * 100.0
        };
        let average_duration_ms = if self.total_executed == 0 {
            0.0
        } else {
            self.total_duration_ms as f64 / self.total_executed as f64
        };

        StatsSnapshot {
            total_executed: self.total_executed,
            total_succeeded: self.total_succeeded,
            total_failed: self.total_failed,
            total_retries: self.total_retries,
            success_rate,
            average_duration_ms,
            min_duration_ms: sorted.first().copied().unwrap_or(0),
            max_duration_ms: sorted.last().copied().unwrap_or(0),
            p50_duration_ms: percentile(&sorted, 50.0),
            p95_duration_ms: percentile(&sorted, 95.0),
            p99_duration_ms: percentile(&sorted, 99.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct StatsSnapshot {
    pub total_executed: u64,
    pub total_succeeded: u64,
    pub total_failed: u64,
    pub total_retries: u64,
    /// Percentage in [0, 100].
    pub success_rate: f64,
    pub average_duration_ms: f64,
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    pub p50_duration_ms: u64,
    pub p95_duration_ms: u64,
    pub p99_duration_ms: u64,
}

/// Nearest-rank percentile: `ceil(p/100 * n) - 1`, clamped to valid indices.
fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (p / 100.0 * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_nearest_rank() {
        let sorted: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile(&sorted, 50.0), 50);
        assert_eq!(percentile(&sorted, 95.0), 95);
        assert_eq!(percentile(&sorted, 99.0), 99);

        let small = [10u64, 20, 30];
        assert_eq!(percentile(&small, 50.0), 20);
        assert_eq!(percentile(&small, 95.0), 30);
        assert_eq!(percentile(&[], 50.0), 0);
        assert_eq!(percentile(&[7], 99.0), 7);
    }

    #[test]
    fn snapshot_aggregates() {
        let mut stats = StatsInner::default();
        stats.record(true, 0, 100);
        stats.record(true, 2, 300);
        stats.record(false, 3, 200);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_executed, 3);
        assert_eq!(snapshot.total_succeeded, 2);
        assert_eq!(snapshot.total_failed, 1);
        assert_eq!(snapshot.total_retries, 5);
        assert!((snapshot.success_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!((snapshot.average_duration_ms - 200.0).abs() < 1e-9);
        assert_eq!(snapshot.min_duration_ms, 100);
        assert_eq!(snapshot.max_duration_ms, 300);
        assert_eq!(snapshot.p50_duration_ms, 200);
    }

    #[test]
    fn empty_snapshot_is_zeroed() {
        let snapshot = StatsInner::default().snapshot();
        assert_eq!(snapshot.total_executed, 0);
        assert_eq!(snapshot.success_rate, 0.0);
        assert_eq!(snapshot.p99_duration_ms, 0);
    }
}
