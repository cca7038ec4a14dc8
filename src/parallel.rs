//! Static range partitioning over a bounded rayon pool.
//!
//! `[0, total)` is cut into one contiguous range per worker, the last range
//! taking the remainder. Each worker returns its own result buffer; callers
//! merge the buffers after every worker has joined, so no state is shared
//! while work is in flight.

use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkRange {
    pub worker: usize,
    pub lower: usize,
    pub upper: usize,
}

impl WorkRange {
    pub fn len(&self) -> usize {
        self.upper - self.lower
    }

    pub fn is_empty(&self) -> bool {
        self.lower == self.upper
    }
}

/// Split `[0, total)` into at most `workers` non-empty ranges.
///
/// A worker count of zero is treated as one.
pub fn partition(total: usize, workers: usize) -> Vec<WorkRange> {
    let workers = workers.max(1);
    let chunk = total / workers;

    (0..workers)
        .map(|worker| {
            let lower = worker * chunk;
            let upper = if worker == workers - 1 {
                total
            } else {
                lower + chunk
            };
            WorkRange {
                worker,
                lower,
                upper,
            }
        })
        .filter(|range| !range.is_empty())
        .collect()
}

/// Run `task` once per non-empty range on a pool of `workers` threads and
/// block until all of them finish. Results come back in worker order.
pub fn run<R, F>(total: usize, workers: usize, task: F) -> Result<Vec<R>>
where
    R: Send,
    F: Fn(WorkRange) -> R + Sync,
{
    let ranges = partition(total, workers);
    if ranges.is_empty() {
        return Ok(Vec::new());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ranges.len())
        .thread_name(|i| format!("gallerist-worker-{}", i))
        .build()?;

    Ok(pool.install(|| ranges.par_iter().map(|range| task(*range)).collect()))
}

/// Shared completion counter that logs every tenth of the way.
pub struct Progress {
    label: &'static str,
    total: usize,
    done: AtomicUsize,
}

impl Progress {
    pub fn new(label: &'static str, total: usize) -> Self {
        Self {
            label,
            total,
            done: AtomicUsize::new(0),
        }
    }

    pub fn tick(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if self.total == 0 {
            return;
        }
        let step = (self.total / 10).max(1);
        if done % step == 0 || done == self.total {
            info!(
                "{}: {}/{} ({}%)",
                self.label,
                done,
                self.total,
                done * 100 / self.total
            );
        }
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn assert_covers(total: usize, workers: usize) {
        let ranges = partition(total, workers);
        let mut seen = BTreeSet::new();
        for range in &ranges {
            assert!(!range.is_empty(), "empty range for {}/{}", total, workers);
            for i in range.lower..range.upper {
                assert!(seen.insert(i), "index {} assigned twice", i);
            }
        }
        assert_eq!(seen.len(), total);
        assert!(seen.iter().copied().eq(0..total));
        assert!(ranges.len() <= workers.max(1));
    }

    #[test]
    fn test_partition_coverage() {
        for total in 0..40 {
            for workers in 1..12 {
                assert_covers(total, workers);
            }
        }
        assert_covers(1000, 7);
    }

    #[test]
    fn test_last_range_takes_remainder() {
        let ranges = partition(10, 3);
        assert_eq!(
            ranges,
            vec![
                WorkRange { worker: 0, lower: 0, upper: 3 },
                WorkRange { worker: 1, lower: 3, upper: 6 },
                WorkRange { worker: 2, lower: 6, upper: 10 },
            ]
        );
    }

    #[test]
    fn test_fewer_items_than_workers() {
        let ranges = partition(2, 4);
        assert_eq!(ranges, vec![WorkRange { worker: 3, lower: 0, upper: 2 }]);
    }

    #[test]
    fn test_empty_and_zero_workers() {
        assert!(partition(0, 4).is_empty());
        assert_eq!(partition(5, 0), vec![WorkRange { worker: 0, lower: 0, upper: 5 }]);
    }

    #[test]
    fn test_run_collects_per_worker_buffers() {
        let items: Vec<usize> = (0..100).collect();
        let buffers = run(items.len(), 4, |range| {
            items[range.lower..range.upper].iter().sum::<usize>()
        })
        .unwrap();

        assert_eq!(buffers.len(), 4);
        assert_eq!(buffers.iter().sum::<usize>(), 4950);
    }

    #[test]
    fn test_run_without_work() {
        let buffers: Vec<usize> = run(0, 4, |range| range.len()).unwrap();
        assert!(buffers.is_empty());
    }

    #[test]
    fn test_progress_counts() {
        let progress = Progress::new("test", 3);
        progress.tick();
        progress.tick();
        assert_eq!(progress.done(), 2);
    }
}
