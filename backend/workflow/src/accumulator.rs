//! Shared batch of analyzed images.

use std::sync::Arc;

use heatlens_core::{Batch, BatchEntry, HeatlensError};
use tokio::sync::Mutex;

/// Result of one append.
#[derive(Debug)]
pub enum BatchState {
    /// The batch still has room; holds the number of pending entries.
    Partial(usize),
    /// This append filled the batch. The accumulator is already empty.
    Full(Batch),
}

/// Collects batch entries until `capacity` is reached, then hands the whole
/// batch to exactly one caller.
///
/// Cloning shares the same underlying batch.
#[derive(Clone)]
pub struct BatchAccumulator {
    entries: Arc<Mutex<Vec<BatchEntry>>>,
    capacity: usize,
}

impl BatchAccumulator {
    pub fn new(capacity: usize) -> Result<Self, HeatlensError> {
        if capacity == 0 {
            return Err(HeatlensError::Config("batch size must be >= 1".to_string()));
        }
        Ok(Self {
            entries: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append, check and (if full) take the batch under one lock.
    pub async fn append(&self, entry: BatchEntry) -> BatchState {
        let mut entries = self.entries.lock().await;
        entries.push(entry);
        if entries.len() >= self.capacity {
            let full = std::mem::replace(&mut *entries, Vec::with_capacity(self.capacity));
            BatchState::Full(Batch::new(full))
        } else {
            BatchState::Partial(entries.len())
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy of the pending entries, for status reporting.
    pub async fn snapshot(&self) -> Vec<BatchEntry> {
        self.entries.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatlens_core::PerImageReport;
    use std::collections::HashSet;

    fn entry(i: usize) -> BatchEntry {
        BatchEntry::new(
            PerImageReport::Narrative(format!("report {i}")),
            format!("images/{i}.png"),
        )
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(BatchAccumulator::new(0).is_err());
    }

    #[tokio::test]
    async fn flushes_exactly_at_capacity_in_order() {
        let acc = BatchAccumulator::new(3).unwrap();
        assert!(matches!(acc.append(entry(1)).await, BatchState::Partial(1)));
        assert!(matches!(acc.append(entry(2)).await, BatchState::Partial(2)));
        assert_eq!(acc.snapshot().await.len(), 2);

        let BatchState::Full(batch) = acc.append(entry(3)).await else {
            panic!("third append should fill the batch");
        };
        let paths: Vec<_> = batch.image_paths().iter().map(|p| p.display().to_string()).collect();
        assert_eq!(paths, vec!["images/1.png", "images/2.png", "images/3.png"]);
        assert!(acc.is_empty().await);
    }

    #[tokio::test]
    async fn fewer_than_capacity_never_flushes() {
        let acc = BatchAccumulator::new(4).unwrap();
        for i in 0..3 {
            assert!(matches!(acc.append(entry(i)).await, BatchState::Partial(_)));
        }
        assert_eq!(acc.len().await, 3);
    }

    #[tokio::test]
    async fn capacity_one_flushes_every_append() {
        let acc = BatchAccumulator::new(1).unwrap();
        for i in 0..3 {
            assert!(matches!(acc.append(entry(i)).await, BatchState::Full(ref b) if b.len() == 1));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_produce_disjoint_batches() {
        let acc = BatchAccumulator::new(3).unwrap();
        let mut handles = Vec::new();
        for i in 0..10 {
            let acc = acc.clone();
            handles.push(tokio::spawn(async move { acc.append(entry(i)).await }));
        }

        let mut batches = Vec::new();
        for handle in handles {
            if let BatchState::Full(batch) = handle.await.unwrap() {
                batches.push(batch);
            }
        }

        assert_eq!(batches.len(), 10 / 3);
        let mut seen = HashSet::new();
        for batch in &batches {
            assert_eq!(batch.len(), 3);
            for path in batch.image_paths() {
                assert!(seen.insert(path.to_path_buf()), "{} in two batches", path.display());
            }
        }
        assert_eq!(acc.len().await, 10 % 3);
    }
}
