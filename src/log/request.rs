//! Pending write requests and their completion signal.
//!
//! A `WriteRequest` is created by the producer, handed read-only to the
//! sync thread through the intake queue, and destroyed once its completion
//! has been resolved and observed. The completion transitions exactly once:
//! pending -> succeeded, or pending -> failed(error). Nothing is resolved
//! as succeeded before the batch containing the request has been forced to
//! stable storage.

use std::cmp::Ordering;
use std::sync::{Condvar, Mutex};
use std::time::Instant;

use super::errors::{LogError, LogResult};
use super::format::frame_size;
use super::sequence::SequencedId;

/// One-shot, multi-waiter completion signal.
#[derive(Debug, Default)]
pub struct Completion {
    state: Mutex<Option<LogResult<()>>>,
    resolved: Condvar,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves as succeeded. No-op if already resolved.
    pub fn resolve_ok(&self) {
        self.resolve(Ok(()));
    }

    /// Resolves as failed. No-op if already resolved.
    pub fn resolve_err(&self, error: LogError) {
        self.resolve(Err(error));
    }

    fn resolve(&self, outcome: LogResult<()>) {
        let mut state = self.state.lock().unwrap();
        if state.is_none() {
            *state = Some(outcome);
            self.resolved.notify_all();
        }
    }

    /// Blocks until resolution, then returns the stored outcome. Any number
    /// of waiters may block; all observe the same outcome.
    pub fn wait(&self) -> LogResult<()> {
        let mut state = self.state.lock().unwrap();
        while state.is_none() {
            state = self.resolved.wait(state).unwrap();
        }
        state.as_ref().unwrap().clone()
    }

    /// Outcome if already resolved, without blocking.
    pub fn poll(&self) -> Option<LogResult<()>> {
        self.state.lock().unwrap().clone()
    }
}

/// A pending write: payload plus the identity that orders it.
#[derive(Debug)]
pub struct WriteRequest {
    payload: Vec<u8>,
    id: SequencedId,
    completion: Completion,
    created_at: Instant,
}

impl WriteRequest {
    pub fn new(payload: Vec<u8>, id: SequencedId) -> Self {
        Self {
            payload,
            id,
            completion: Completion::new(),
            created_at: Instant::now(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn producer_id(&self) -> u64 {
        self.id.producer_id
    }

    pub fn sequence(&self) -> u64 {
        self.id.sequence
    }

    pub fn completion(&self) -> &Completion {
        &self.completion
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// On-disk size of this request's frame.
    pub fn frame_size(&self) -> usize {
        frame_size(self.payload.len())
    }

    /// Batch ordering key: `(producer_id, sequence)` ascending. Sorting a
    /// batch by this key is the sole mechanism that keeps a producer's
    /// records in submission order in the file.
    pub fn order_key(&self) -> (u64, u64) {
        (self.id.producer_id, self.id.sequence)
    }

    fn cmp_order(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

impl PartialEq for WriteRequest {
    fn eq(&self, other: &Self) -> bool {
        self.order_key() == other.order_key()
    }
}

impl Eq for WriteRequest {}

impl PartialOrd for WriteRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp_order(other))
    }
}

impl Ord for WriteRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_order(other)
    }
}
