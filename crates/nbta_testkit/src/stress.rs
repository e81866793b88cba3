//! Concurrent stress helpers.

use crate::clock::TimestampSource;
use crate::cluster::Cluster;
use nbta_core::{CoreResult, Key};
use std::thread;
use std::time::{Duration, Instant};

/// The key [`run_conflicting_increments`] contends on.
pub const COUNTER_KEY: &str = "counter";

/// Outcome of a contended workload.
#[derive(Debug, Clone)]
pub struct IncrementReport {
    /// Transactions that committed.
    pub committed: usize,
    /// Attempts rejected for concurrency: a conflicting commit or a read
    /// that was already newer than the attempt's own timestamp.
    pub conflicts: usize,
    /// Attempts that failed for any other reason.
    pub failures: usize,
    /// Wall time of the run.
    pub duration: Duration,
}

impl IncrementReport {
    /// Total attempts.
    pub fn attempts(&self) -> usize {
        self.committed + self.conflicts + self.failures
    }
}

/// Runs `threads` workers, each making `attempts` optimistic
/// read-increment-write attempts on [`COUNTER_KEY`] and settling the
/// network after every attempt.
///
/// Every worker has its own [`TimestampSource`] and moves it past every
/// timestamp it reads, so a committed increment always lands above the
/// value it incremented.
///
/// Call [`seed_counter`] first when counting lost updates. Until the key
/// has a stable write, a read observes no timestamp and the commit carries
/// no concurrency token, so racing first increments are blind writes and
/// may overwrite each other.
pub fn run_conflicting_increments(
    cluster: &Cluster,
    threads: usize,
    attempts: usize,
) -> IncrementReport {
    let start = Instant::now();
    let per_thread: Vec<(usize, usize, usize)> = thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|i| {
                let clock = TimestampSource::with_entropy(i as u16 + 1);
                scope.spawn(move || increment_worker(cluster, &clock, attempts))
            })
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().unwrap_or((0, 0, attempts)))
            .collect()
    });

    let (committed, conflicts, failures) = per_thread
        .into_iter()
        .fold((0, 0, 0), |acc, t| (acc.0 + t.0, acc.1 + t.1, acc.2 + t.2));
    IncrementReport {
        committed,
        conflicts,
        failures,
        duration: start.elapsed(),
    }
}

fn increment_worker(
    cluster: &Cluster,
    clock: &TimestampSource,
    attempts: usize,
) -> (usize, usize, usize) {
    let key = Key::from(COUNTER_KEY);
    let (mut committed, mut conflicts, mut failures) = (0, 0, 0);

    for _ in 0..attempts {
        match increment_once(cluster, clock, &key) {
            Ok(true) => committed += 1,
            Ok(false) => conflicts += 1,
            Err(e) if e.is_retryable() => conflicts += 1,
            Err(e) => {
                tracing::warn!(error = %e, "increment failed");
                failures += 1;
            }
        }
        if let Err(e) = cluster.settle() {
            tracing::warn!(error = %e, "settle failed");
        }
    }
    (committed, conflicts, failures)
}

/// Returns `Ok(false)` if the attempt was abandoned because its read was
/// newer than its own timestamp.
fn increment_once(cluster: &Cluster, clock: &TimestampSource, key: &Key) -> CoreResult<bool> {
    let ts = clock.next();
    let mut txn = cluster.begin(ts.as_u64())?;
    let current = decode_counter(txn.get(key)?.as_deref());

    let observed = txn.read_timestamp(key);
    clock.observe(observed);
    if observed >= ts {
        txn.abort()?;
        return Ok(false);
    }

    txn.set(key.clone(), (current + 1).to_string().into_bytes())?;
    txn.commit(true)?;
    Ok(true)
}

/// Timestamp [`seed_counter`] writes at. Worker clocks always start above it.
pub const COUNTER_SEED_TS: u64 = 1;

/// Commits `0` to [`COUNTER_KEY`] and settles it, so every later
/// increment reads a timestamp and commits with a concurrency token.
///
/// # Errors
///
/// Propagates commit and delivery failures.
pub fn seed_counter(cluster: &Cluster) -> CoreResult<()> {
    cluster.commit(COUNTER_SEED_TS, [(COUNTER_KEY, "0")])?;
    cluster.settle()?;
    Ok(())
}

/// Reads the counter's current stable value.
///
/// # Errors
///
/// Propagates read failures.
pub fn read_counter(cluster: &Cluster, ts: u64) -> CoreResult<u64> {
    Ok(decode_counter(cluster.read(ts, COUNTER_KEY)?.as_deref()))
}

fn decode_counter(bytes: Option<&[u8]>) -> u64 {
    bytes
        .and_then(|b| std::str::from_utf8(b).ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}
