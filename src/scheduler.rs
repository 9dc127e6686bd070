//! Delay scheduler: holds envelopes until their eligibility time.
//!
//! Each group key is served by one tokio task that owns a min-heap of pending
//! envelopes and a single timer armed for the earliest one. `schedule` only
//! pushes onto an unbounded channel, so it never blocks and the number of
//! pending envelopes is bounded by memory alone.
//!
//! There is no cancellation. Once every [`DelayScheduler`] handle is dropped a
//! group task keeps running until its heap is empty, then exits.

use crate::envelope::Envelope;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Handle for scheduling delayed releases. Clones share the same groups.
#[derive(Clone)]
pub struct DelayScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    groups: Mutex<HashMap<String, mpsc::UnboundedSender<Pending>>>,
    release_tx: mpsc::UnboundedSender<Envelope>,
    pending: Arc<AtomicUsize>,
}

struct Pending {
    due: Instant,
    seq: u64,
    envelope: Envelope,
}

// Reversed so `BinaryHeap` pops the earliest due item first, FIFO on ties.
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Pending {}

/// Read-only view of the pending count that does not keep groups alive.
#[derive(Debug, Clone)]
pub struct PendingCount(Arc<AtomicUsize>);

impl PendingCount {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl DelayScheduler {
    /// Build a scheduler that releases every envelope into `release_tx`.
    pub fn new(release_tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                groups: Mutex::new(HashMap::new()),
                release_tx,
                pending: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Release `envelope` unchanged once `delay` has elapsed from now.
    ///
    /// Must be called from within a tokio runtime: the first call for a group
    /// spawns that group's task.
    pub fn schedule(&self, envelope: Envelope, delay: Duration, group: &str) {
        let due = Instant::now() + delay;
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        let mut groups = self
            .inner
            .groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let tx = groups
            .entry(group.to_string())
            .or_insert_with(|| self.spawn_group(group));
        let item = Pending {
            due,
            seq: 0,
            envelope,
        };
        if let Err(mpsc::error::SendError(returned)) = tx.send(item) {
            // A group task only exits once every handle is gone; if it died
            // anyway, replace it rather than lose the envelope.
            tracing::warn!(group, "delay group task stopped unexpectedly; restarting");
            let fresh = self.spawn_group(group);
            if fresh.send(returned).is_err() {
                self.inner.pending.fetch_sub(1, Ordering::SeqCst);
                tracing::warn!(group, "delay group unavailable; dropping envelope");
            }
            *tx = fresh;
        }
    }

    /// Envelopes scheduled but not yet released, across all groups.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// A pending-count handle that stays valid after this scheduler drops.
    pub fn pending_count(&self) -> PendingCount {
        PendingCount(Arc::clone(&self.inner.pending))
    }

    /// Number of group keys seen so far.
    pub fn group_count(&self) -> usize {
        self.inner
            .groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn spawn_group(&self, group: &str) -> mpsc::UnboundedSender<Pending> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_group(
            group.to_string(),
            rx,
            self.inner.release_tx.clone(),
            Arc::clone(&self.inner.pending),
        ));
        tracing::debug!(group, "delay group started");
        tx
    }
}

async fn run_group(
    group: String,
    mut rx: mpsc::UnboundedReceiver<Pending>,
    release_tx: mpsc::UnboundedSender<Envelope>,
    pending: Arc<AtomicUsize>,
) {
    let mut heap = BinaryHeap::<Pending>::new();
    let mut next_seq: u64 = 0;
    let mut accepting = true;

    loop {
        if !accepting && heap.is_empty() {
            break;
        }
        let next_due = heap.peek().map(|item| item.due);

        tokio::select! {
            received = rx.recv(), if accepting => match received {
                Some(mut item) => {
                    item.seq = next_seq;
                    next_seq = next_seq.wrapping_add(1);
                    heap.push(item);
                }
                None => accepting = false,
            },
            _ = sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                let now = Instant::now();
                while heap.peek().is_some_and(|item| item.due <= now) {
                    let Some(item) = heap.pop() else {
                        break;
                    };
                    pending.fetch_sub(1, Ordering::SeqCst);
                    if release_tx.send(item.envelope).is_err() {
                        tracing::warn!(group = %group, "release channel closed; dropping envelope");
                    }
                }
            }
        }
    }
    tracing::debug!(group = %group, "delay group drained");
}
