//! Download queue state.
//!
//! Pure synchronous state machine: no async, no I/O, no tracing. The engine
//! wraps it in a mutex and performs side effects around it.
//!
//! # Duplicate policy
//!
//! An id is rejected if it is already pending, currently processing, or
//! repeated earlier in the same batch.

use std::collections::VecDeque;

use serde::Serialize;

use workdl_core::WorkshopItemId;

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    /// Pending ids, head first.
    pub items: Vec<WorkshopItemId>,
    /// Id popped for processing and not yet finished.
    pub processing: Option<WorkshopItemId>,
}

/// Result of an enqueue call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnqueueResult {
    pub added: Vec<WorkshopItemId>,
    /// Ids rejected as duplicates.
    pub duplicates: Vec<WorkshopItemId>,
}

/// FIFO of pending workshop items.
#[derive(Debug, Default)]
pub struct DownloadQueue {
    pending: VecDeque<WorkshopItemId>,
    processing: Option<WorkshopItemId>,
}

impl DownloadQueue {
    pub const fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            processing: None,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether `id` is pending or processing.
    pub fn contains(&self, id: &WorkshopItemId) -> bool {
        self.processing.as_ref() == Some(id) || self.pending.contains(id)
    }

    /// Append ids in order, skipping duplicates.
    pub fn enqueue(&mut self, ids: impl IntoIterator<Item = WorkshopItemId>) -> EnqueueResult {
        let mut result = EnqueueResult::default();
        for id in ids {
            if self.contains(&id) {
                result.duplicates.push(id);
            } else {
                self.pending.push_back(id.clone());
                result.added.push(id);
            }
        }
        result
    }

    /// Put an id back at the head, e.g. when processing could not begin.
    pub fn requeue_front(&mut self, id: WorkshopItemId) {
        if self.processing.as_ref() == Some(&id) {
            self.processing = None;
        }
        if !self.pending.contains(&id) {
            self.pending.push_front(id);
        }
    }

    /// Remove the first pending match. Returns false when absent.
    pub fn remove(&mut self, id: &WorkshopItemId) -> bool {
        self.pending
            .iter()
            .position(|queued| queued == id)
            .and_then(|index| self.pending.remove(index))
            .is_some()
    }

    /// Drop every pending id and the processing marker. Returns how many
    /// pending ids were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        self.processing = None;
        count
    }

    /// Pop the head and mark it processing.
    pub fn pop_next(&mut self) -> Option<WorkshopItemId> {
        let id = self.pending.pop_front()?;
        self.processing = Some(id.clone());
        Some(id)
    }

    /// Clear the processing marker if it is `id`.
    pub fn finish(&mut self, id: &WorkshopItemId) {
        if self.processing.as_ref() == Some(id) {
            self.processing = None;
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            items: self.pending.iter().cloned().collect(),
            processing: self.processing.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<WorkshopItemId> {
        values
            .iter()
            .map(|v| WorkshopItemId::parse(v).unwrap())
            .collect()
    }

    #[test]
    fn test_enqueue_preserves_order() {
        let mut queue = DownloadQueue::new();
        let result = queue.enqueue(ids(&["3", "1", "2"]));
        assert_eq!(result.added, ids(&["3", "1", "2"]));
        assert_eq!(queue.snapshot().items, ids(&["3", "1", "2"]));
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut queue = DownloadQueue::new();
        queue.enqueue(ids(&["1"]));
        let result = queue.enqueue(ids(&["1", "2", "2", "3"]));
        assert_eq!(result.added, ids(&["2", "3"]));
        assert_eq!(result.duplicates, ids(&["1", "2"]));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_processing_id_counts_as_duplicate() {
        let mut queue = DownloadQueue::new();
        queue.enqueue(ids(&["1"]));
        assert_eq!(queue.pop_next(), Some(ids(&["1"])[0].clone()));
        let result = queue.enqueue(ids(&["1"]));
        assert!(result.added.is_empty());

        queue.finish(&ids(&["1"])[0]);
        assert_eq!(queue.enqueue(ids(&["1"])).added.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut queue = DownloadQueue::new();
        queue.enqueue(ids(&["7"]));
        assert!(!queue.remove(&ids(&["42"])[0]));
        assert_eq!(queue.snapshot().items, ids(&["7"]));
        assert!(queue.remove(&ids(&["7"])[0]));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_drops_processing_marker() {
        let mut queue = DownloadQueue::new();
        queue.enqueue(ids(&["1", "2", "3"]));
        queue.pop_next();
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.snapshot(), QueueSnapshot::default());
    }

    #[test]
    fn test_requeue_front() {
        let mut queue = DownloadQueue::new();
        queue.enqueue(ids(&["1", "2"]));
        let head = queue.pop_next().unwrap();
        queue.requeue_front(head);
        assert_eq!(queue.snapshot().items, ids(&["1", "2"]));
        assert!(queue.snapshot().processing.is_none());
    }
}
