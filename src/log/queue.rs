//! Concurrent intake of pending writes with bounded admission.
//!
//! Producers push from arbitrary threads; the single sync thread drains.
//! Admission is gated by counting permits sized to `max_queue_size`: a
//! permit is consumed when a request is enqueued and returned only after
//! the request's batch is durably written (or its failure has been observed
//! by the caller), so admission reflects true outstanding unflushed work,
//! not merely queue depth.
//!
//! All state lives under one mutex with two condvars: `work` wakes the sync
//! thread, `capacity` wakes producers blocked on admission. Closing the
//! queue wakes both sides; blocked producers observe `LogError::Closed`.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use super::batch::Batch;
use super::errors::{LogError, LogResult};
use super::request::WriteRequest;

#[derive(Debug)]
struct QueueState {
    pending: VecDeque<Arc<WriteRequest>>,
    permits: usize,
    closed: bool,
}

/// Multi-producer intake queue with backpressure.
#[derive(Debug)]
pub struct IntakeQueue {
    state: Mutex<QueueState>,
    work: Condvar,
    capacity: Condvar,
}

impl IntakeQueue {
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                permits: max_queue_size,
                closed: false,
            }),
            work: Condvar::new(),
            capacity: Condvar::new(),
        }
    }

    /// Enqueues a request, blocking while no admission permit is available.
    ///
    /// Returns `LogError::Closed` if the queue is closed before the request
    /// was admitted, including while blocked waiting for capacity.
    pub fn submit(&self, request: Arc<WriteRequest>) -> LogResult<()> {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.closed {
                return Err(LogError::Closed);
            }
            if state.permits > 0 {
                break;
            }
            state = self.capacity.wait(state).unwrap();
        }
        state.permits -= 1;
        state.pending.push_back(request);
        drop(state);
        self.work.notify_one();
        Ok(())
    }

    /// Moves all immediately available requests into `batch`, stopping once
    /// the batch has accumulated `byte_cap` frame bytes. Never blocks. The
    /// request that crosses the cap is still taken; the cap bounds when the
    /// batch is full, not the exact byte count.
    pub fn drain_available(&self, batch: &mut Batch, byte_cap: usize) {
        let mut state = self.state.lock().unwrap();
        while batch.frame_bytes() < byte_cap {
            match state.pending.pop_front() {
                Some(request) => batch.push(request),
                None => break,
            }
        }
    }

    /// Blocks until at least one request is pending or the queue is closed.
    /// Returns whether work is available.
    pub fn wait_for_work(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        while state.pending.is_empty() && !state.closed {
            state = self.work.wait(state).unwrap();
        }
        !state.pending.is_empty()
    }

    /// Waits for more arrivals while collecting a batch.
    ///
    /// With an empty batch the wait is unbounded (a batch is never flushed
    /// empty, and an isolated request must not start the flush clock early);
    /// otherwise the wait is bounded by the remaining time before
    /// `deadline`. Returns whether collection should continue: `false` only
    /// when the queue is closed, nothing is pending, and the batch is empty.
    pub fn wait_for_more(&self, batch_empty: bool, deadline: Instant) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.pending.is_empty() && !state.closed {
            if batch_empty {
                state = self.work.wait(state).unwrap();
            } else {
                let now = Instant::now();
                if deadline > now {
                    let (guard, _) = self.work.wait_timeout(state, deadline - now).unwrap();
                    state = guard;
                }
            }
        }
        !state.closed || !state.pending.is_empty() || !batch_empty
    }

    /// Returns `count` admission permits and wakes blocked producers.
    pub fn release_permits(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut state = self.state.lock().unwrap();
        state.permits += count;
        drop(state);
        self.capacity.notify_all();
    }

    /// Stops admission and wakes every blocked producer and the sync
    /// thread. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        drop(state);
        self.work.notify_all();
        self.capacity.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// Closed with nothing left to drain.
    pub fn is_drained(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.closed && state.pending.is_empty()
    }

    /// Removes and returns everything still pending. Used during shutdown
    /// to fail requests the sync thread will never reach.
    pub fn take_remaining(&self) -> Vec<Arc<WriteRequest>> {
        let mut state = self.state.lock().unwrap();
        state.pending.drain(..).collect()
    }

    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    #[cfg(test)]
    pub fn available_permits(&self) -> usize {
        self.state.lock().unwrap().permits
    }
}
