//! Work queue for pending tasks
//!
//! An unbounded FIFO: submission never blocks the driver, while workers
//! block in [`TaskReceiver::take`] until something arrives. Shutdown is
//! signaled in-band by one [`QueueItem::Stop`] sentinel per worker; FIFO
//! order guarantees all real work drains before the sentinels are seen.

use crate::pool::Task;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One queue entry: a task to run, or the stop sentinel
pub(crate) enum QueueItem {
    /// A unit of work
    Run(Task),

    /// The dequeuing worker should terminate its loop
    Stop,
}

/// Statistics for the task queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Tasks enqueued
    pub enqueued: AtomicU64,

    /// Tasks dequeued by workers
    pub dequeued: AtomicU64,
}

impl QueueStats {
    /// Tasks submitted so far
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Tasks handed to a worker so far
    pub fn dequeued_count(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }
}

/// Unbounded FIFO queue of pending work
pub(crate) struct TaskQueue {
    sender: Sender<QueueItem>,
    receiver: Receiver<QueueItem>,
    stats: Arc<QueueStats>,
}

impl TaskQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Append a task to the tail; never blocks
    ///
    /// Fails only if every receiver handle is gone, which the pool
    /// prevents by keeping the queue alive until after all joins.
    pub fn submit(&self, task: Task) -> Result<(), ()> {
        self.sender.send(QueueItem::Run(task)).map_err(|_| ())?;
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Append one stop sentinel
    pub fn submit_stop(&self) -> Result<(), ()> {
        self.sender.send(QueueItem::Stop).map_err(|_| ())
    }

    /// Get a receiver handle (clone one per worker)
    pub fn receiver(&self) -> TaskReceiver {
        TaskReceiver {
            receiver: self.receiver.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Current queue length, sentinels included
    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}

/// Handle for dequeuing work
#[derive(Clone)]
pub(crate) struct TaskReceiver {
    receiver: Receiver<QueueItem>,
    stats: Arc<QueueStats>,
}

impl TaskReceiver {
    /// Block until the next item is available and remove it
    ///
    /// A disconnected channel is treated as a stop signal so a worker can
    /// never hang on a queue that no longer exists.
    pub fn take(&self) -> QueueItem {
        match self.receiver.recv() {
            Ok(item) => {
                if matches!(item, QueueItem::Run(_)) {
                    self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                }
                item
            }
            Err(_) => QueueItem::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::TaskContext;

    fn noop_task() -> Task {
        Box::new(|_ctx: &TaskContext| Ok(()))
    }

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::new();
        let order = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = std::sync::Arc::clone(&order);
            queue
                .submit(Box::new(move |_ctx| {
                    order.lock().push(i);
                    Ok(())
                }))
                .unwrap();
        }

        let receiver = queue.receiver();
        let ctx = TaskContext::for_tests();
        for _ in 0..3 {
            match receiver.take() {
                QueueItem::Run(task) => task(&ctx).unwrap(),
                QueueItem::Stop => panic!("unexpected sentinel"),
            }
        }

        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_stop_sentinel_after_tasks() {
        let queue = TaskQueue::new();
        queue.submit(noop_task()).unwrap();
        queue.submit_stop().unwrap();

        let receiver = queue.receiver();
        assert!(matches!(receiver.take(), QueueItem::Run(_)));
        assert!(matches!(receiver.take(), QueueItem::Stop));
    }

    #[test]
    fn test_disconnected_queue_reads_as_stop() {
        let queue = TaskQueue::new();
        let receiver = queue.receiver();
        drop(queue);
        assert!(matches!(receiver.take(), QueueItem::Stop));
    }

    #[test]
    fn test_queue_stats() {
        let queue = TaskQueue::new();
        queue.submit(noop_task()).unwrap();
        queue.submit(noop_task()).unwrap();
        assert_eq!(queue.stats.enqueued_count(), 2);
        assert_eq!(queue.len(), 2);

        let receiver = queue.receiver();
        receiver.take();
        assert_eq!(queue.stats.dequeued_count(), 1);
        assert_eq!(queue.len(), 1);
    }
}
