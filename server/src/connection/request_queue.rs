use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

use log::{debug, warn};

use pslink_shared::RequestEnvelope;

/// Counters describing a request queue over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestQueueStats {
    /// Envelopes handed to `push`, accepted or not
    pub pushed: u64,
    /// Envelopes written to the channel
    pub sent: u64,
    /// Envelopes dropped: refused after a failure, lost in flight, or left
    /// pending at teardown
    pub discarded: u64,
    /// Largest number of envelopes pending at once
    pub high_water: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueStatus {
    Open,
    Stopped,
    Failed,
}

struct QueueState {
    pending: VecDeque<RequestEnvelope>,
    status: QueueStatus,
    stats: RequestQueueStats,
}

/// FIFO of requests waiting to be sent to one page server.
///
/// Any number of producers push; exactly one consumer pops. Envelopes leave
/// in the order their `push` calls took the queue lock.
pub struct RequestQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                status: QueueStatus::Open,
                stats: RequestQueueStats::default(),
            }),
            available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an envelope. Never blocks on I/O.
    ///
    /// Returns `false` when the queue no longer accepts requests because its
    /// sender stopped or failed; the envelope is then discarded.
    pub fn push(&self, envelope: RequestEnvelope) -> bool {
        let mut state = self.lock();
        state.stats.pushed += 1;

        if state.status != QueueStatus::Open {
            state.stats.discarded += 1;
            debug!(
                "Discarding {:?} request, queue is {:?}",
                envelope.kind(),
                state.status
            );
            return false;
        }

        state.pending.push_back(envelope);
        let pending = state.pending.len();
        if pending > state.stats.high_water {
            state.stats.high_water = pending;
        }
        drop(state);

        self.available.notify_one();
        true
    }

    /// Blocks until an envelope is available and returns the oldest one.
    ///
    /// Returns `None` as soon as the queue is stopped or failed, even if
    /// envelopes are still pending.
    pub(crate) fn wait_pop(&self) -> Option<RequestEnvelope> {
        let mut state = self.lock();
        loop {
            if state.status != QueueStatus::Open {
                return None;
            }
            if let Some(envelope) = state.pending.pop_front() {
                return Some(envelope);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn mark_sent(&self) {
        self.lock().stats.sent += 1;
    }

    /// Wakes the consumer and makes it return. Pending envelopes are kept
    /// until [`RequestQueue::discard_pending`].
    pub(crate) fn stop(&self) {
        let mut state = self.lock();
        if state.status == QueueStatus::Open {
            state.status = QueueStatus::Stopped;
        }
        drop(state);
        self.available.notify_all();
    }

    /// Marks the queue failed after `lost` could not be sent. Pending envelopes
    /// are dropped and later pushes are refused. Returns how many envelopes
    /// were lost, `lost` included.
    pub(crate) fn fail(&self, lost: RequestEnvelope) -> usize {
        let mut state = self.lock();
        state.status = QueueStatus::Failed;
        let dropped = state.pending.len() + 1;
        state.pending.clear();
        state.stats.discarded += dropped as u64;
        drop(state);
        drop(lost);

        self.available.notify_all();
        dropped
    }

    /// Marks the queue failed after its consumer went away without a transport
    /// error, counting the envelope it was holding if `in_flight`. Pending
    /// envelopes are dropped and later pushes are refused. Returns how many
    /// envelopes were lost.
    pub(crate) fn abandon(&self, in_flight: bool) -> usize {
        let mut state = self.lock();
        state.status = QueueStatus::Failed;
        let dropped = state.pending.len() + usize::from(in_flight);
        state.pending.clear();
        state.stats.discarded += dropped as u64;
        drop(state);

        self.available.notify_all();
        dropped
    }

    /// Drops everything still pending. Returns the number dropped.
    pub(crate) fn discard_pending(&self) -> usize {
        let mut state = self.lock();
        let dropped = state.pending.len();
        if dropped > 0 {
            state.pending.clear();
            state.stats.discarded += dropped as u64;
            warn!("Discarded {} unsent page server requests", dropped);
        }
        dropped
    }

    pub fn is_failed(&self) -> bool {
        self.lock().status == QueueStatus::Failed
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RequestQueueStats {
        self.lock().stats
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}
