//! Work queue and completion tracking
//!
//! The queue is unbounded so producers (job kickoff and bisection
//! resubmission from inside workers) never block on enqueue.
//!
//! Completion is tracked separately from the queue by `PendingWork`: every
//! item is counted before it becomes visible to a worker and uncounted only
//! after it has been fully processed, so a zero count means no work is queued,
//! running, or about to be resubmitted.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Ordered runner flags shared by a batch and everything bisected from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSet(Arc<[String]>);

impl FlagSet {
    pub fn new(flags: Vec<String>) -> Self {
        Self(flags.into())
    }
}

impl Default for FlagSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<String>> for FlagSet {
    fn from(flags: Vec<String>) -> Self {
        Self::new(flags)
    }
}

impl Deref for FlagSet {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

/// One runner invocation's worth of cases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Case identifiers passed after `-s` (never empty)
    sources: Vec<String>,

    /// Flags passed before `-s`
    flags: FlagSet,
}

impl WorkItem {
    /// Create a work item. Returns `None` if there are no sources.
    pub fn new(sources: Vec<String>, flags: FlagSet) -> Option<Self> {
        if sources.is_empty() {
            None
        } else {
            Some(Self { sources, flags })
        }
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    /// Number of cases in this item
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Does this item hold a single case?
    pub fn is_singleton(&self) -> bool {
        self.sources.len() == 1
    }

    /// One item per case, all sharing this item's flags
    pub fn split(&self) -> Vec<WorkItem> {
        self.sources
            .iter()
            .map(|source| WorkItem {
                sources: vec![source.clone()],
                flags: self.flags.clone(),
            })
            .collect()
    }
}

/// Count of items submitted but not yet completed.
///
/// `add` must happen before the matching item is enqueued, `complete` after
/// the item (including any resubmission it causes) is done.
#[derive(Debug, Default)]
pub struct PendingWork {
    count: AtomicUsize,
    lock: Mutex<()>,
    drained: Condvar,
}

impl PendingWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for `n` items about to be enqueued
    pub fn add(&self, n: usize) {
        self.count.fetch_add(n, Ordering::SeqCst);
    }

    /// Mark one item as finished
    pub fn complete(&self) {
        let previous = self.count.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "pending work underflow");
        if previous == 1 {
            let _guard = self.lock.lock();
            self.drained.notify_all();
        }
    }

    /// Current pending count
    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Is all submitted work finished?
    pub fn is_drained(&self) -> bool {
        self.get() == 0
    }

    /// Block until the count reaches zero or `timeout` elapses.
    ///
    /// Returns true if drained.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.lock.lock();
        if self.is_drained() {
            return true;
        }
        self.drained.wait_for(&mut guard, timeout);
        self.is_drained()
    }

    /// Block until the count reaches zero
    pub fn wait(&self) {
        let mut guard = self.lock.lock();
        while !self.is_drained() {
            self.drained.wait(&mut guard);
        }
    }
}

/// RAII guard that completes one pending item when dropped.
///
/// Held by a worker for the lifetime of one item so the count is released
/// even if processing panics.
pub struct PendingGuard<'a> {
    pending: &'a PendingWork,
}

impl<'a> PendingGuard<'a> {
    pub fn new(pending: &'a PendingWork) -> Self {
        Self { pending }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.complete();
    }
}

/// Unbounded MPMC work queue
pub struct WorkQueue {
    sender: Sender<WorkItem>,
    receiver: Receiver<WorkItem>,
    pending: Arc<PendingWork>,
}

impl WorkQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();

        Self {
            sender,
            receiver,
            pending: Arc::new(PendingWork::new()),
        }
    }

    /// Get a sender for this queue (clone for each worker)
    pub fn sender(&self) -> WorkQueueSender {
        WorkQueueSender {
            sender: self.sender.clone(),
            pending: Arc::clone(&self.pending),
        }
    }

    /// Get a receiver for this queue (clone for each worker)
    pub fn receiver(&self) -> WorkQueueReceiver {
        WorkQueueReceiver {
            receiver: self.receiver.clone(),
            pending: Arc::clone(&self.pending),
        }
    }

    /// Completion tracker shared by all producers
    pub fn pending(&self) -> Arc<PendingWork> {
        Arc::clone(&self.pending)
    }

    /// Items queued but not yet taken by a worker
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Is all work complete (nothing queued, running, or in flight)?
    pub fn is_complete(&self) -> bool {
        self.pending.is_drained()
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for submitting items
#[derive(Clone)]
pub struct WorkQueueSender {
    sender: Sender<WorkItem>,
    pending: Arc<PendingWork>,
}

impl WorkQueueSender {
    /// Count then enqueue a group of items.
    ///
    /// Returns the first unsent item if every receiver is gone.
    ///
    /// The whole group is counted before the first item is visible, so a
    /// worker finishing an early item can never observe a transient zero.
    pub fn submit_all(&self, items: Vec<WorkItem>) -> Result<(), WorkItem> {
        self.pending.add(items.len());
        let mut items = items.into_iter();
        while let Some(item) = items.next() {
            if let Err(item) = self.push(item) {
                for _ in items {
                    self.pending.complete();
                }
                return Err(item);
            }
        }
        Ok(())
    }

    fn push(&self, item: WorkItem) -> Result<(), WorkItem> {
        self.sender.send(item).map_err(|e| {
            // Never received, so never completed by a worker.
            self.pending.complete();
            e.into_inner()
        })
    }
}

/// Handle for taking items
#[derive(Clone)]
pub struct WorkQueueReceiver {
    receiver: Receiver<WorkItem>,
    pending: Arc<PendingWork>,
}

/// Result of a timed receive
#[derive(Debug)]
pub enum Recv {
    Item(WorkItem),
    Timeout,
    Disconnected,
}

impl WorkQueueReceiver {
    /// Receive with timeout
    pub fn recv_timeout(&self, timeout: Duration) -> Recv {
        match self.receiver.recv_timeout(timeout) {
            Ok(item) => Recv::Item(item),
            Err(RecvTimeoutError::Timeout) => Recv::Timeout,
            Err(RecvTimeoutError::Disconnected) => Recv::Disconnected,
        }
    }

    /// Try to receive an item without blocking
    pub fn try_recv(&self) -> Option<WorkItem> {
        self.receiver.try_recv().ok()
    }

    /// Completion tracker for items taken from this receiver
    pub fn pending(&self) -> &PendingWork {
        &self.pending
    }
}
