//! Parallel passes that fill in per-image work left stale by the sync.
//!
//! Both passes follow the same shape: read the committed state, fan the work
//! out with [`crate::parallel::run`], merge the per-worker buffers once every
//! worker has joined, then flush everything in a single transaction.

pub mod derivatives;
pub mod exif;

use std::collections::BTreeMap;

pub use derivatives::{reconcile_derivatives, DerivativePlan, DerivativeReport};
pub use exif::{reconcile_exif, ExifReport};

/// What one worker produced for its range.
#[derive(Debug)]
pub(crate) struct WorkerBuffer<V> {
    pub results: Vec<(String, V)>,
    pub failed: usize,
}

impl<V> Default for WorkerBuffer<V> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            failed: 0,
        }
    }
}

/// Merge per-worker buffers into one map keyed by image path.
///
/// Ranges are disjoint, so a key never shows up in two buffers.
pub(crate) fn merge<V>(buffers: Vec<WorkerBuffer<V>>) -> (BTreeMap<String, V>, usize) {
    let mut merged = BTreeMap::new();
    let mut failed = 0;
    for buffer in buffers {
        failed += buffer.failed;
        for (path, value) in buffer.results {
            let previous = merged.insert(path, value);
            debug_assert!(previous.is_none(), "overlapping worker ranges");
        }
    }
    (merged, failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sums_failures() {
        let buffers = vec![
            WorkerBuffer {
                results: vec![("b".to_string(), 2), ("a".to_string(), 1)],
                failed: 1,
            },
            WorkerBuffer {
                results: vec![("c".to_string(), 3)],
                failed: 2,
            },
        ];

        let (merged, failed) = merge(buffers);
        assert_eq!(failed, 3);
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
