//! Stress tests for bitkv.
//!
//! These helpers drive a database from many threads and report throughput.

use bitkv_core::Database;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Logs a summary of the run.
    pub fn log_summary(&self, name: &str) {
        tracing::info!(
            name,
            total = self.total_ops,
            successful = self.successful_ops,
            failed = self.failed_ops,
            duration = ?self.duration,
            ops_per_second = self.ops_per_second,
            "stress run finished"
        );
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of distinct keys.
    pub key_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 2_000,
            threads: 4,
            key_count: 4,
        }
    }
}

fn key(index: usize) -> Vec<u8> {
    format!("stress_{index}").into_bytes()
}

fn run_threads<F>(config: &StressConfig, op: F) -> StressTestResult
where
    F: Fn(usize, usize) -> bool + Send + Sync + 'static,
{
    let op = Arc::new(op);
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let operations = config.operations;

    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let op = Arc::clone(&op);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                for i in 0..operations {
                    let counter = if op(t, i) { &successful } else { &failed };
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Sets disjoint bits from every thread.
///
/// Thread `t` owns offsets `t, t + threads, t + 2 * threads, ...`, so after
/// the run every key holds exactly `operations * threads / key_count` bits
/// when the division is exact.
pub fn stress_concurrent_set_bits(db: Arc<Database>, config: &StressConfig) -> StressTestResult {
    let threads = config.threads;
    let key_count = config.key_count;

    run_threads(config, move |t, i| {
        let offset = (i * threads + t) as u64;
        db.bitmap()
            .set_bit(&key(i % key_count), offset, true)
            .is_ok()
    })
}

/// Mixes writes with count and position reads on the same keys.
pub fn stress_mixed_operations(db: Arc<Database>, config: &StressConfig) -> StressTestResult {
    let threads = config.threads;
    let key_count = config.key_count;

    run_threads(config, move |t, i| {
        let key = key(i % key_count);
        let bitmap = db.bitmap();
        match i % 4 {
            0 | 1 => bitmap.set_bit(&key, (i * threads + t) as u64, true).is_ok(),
            2 => bitmap.bit_count(&key, 0, -1).is_ok(),
            _ => bitmap.bit_pos(&key, false, 0, -1).is_ok(),
        }
    })
}
