//! Per-producer sequence assignment.
//!
//! Each submitting thread is a producer. On its first push through a given
//! writer the thread is assigned a dense producer id; every subsequent push
//! increments that producer's sequence counter. The table is owned by the
//! writer instance, so two writers in one process never share counters.
//!
//! Counters live only in memory: file-order for a producer is enforced by
//! sorting each batch before it is written, not by the numeric values
//! surviving a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

/// Producer identity plus the sequence number assigned to one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencedId {
    pub producer_id: u64,
    pub sequence: u64,
}

#[derive(Debug)]
struct ProducerSlot {
    producer_id: u64,
    next_sequence: AtomicU64,
}

/// Thread-keyed sequence table.
#[derive(Debug, Default)]
pub struct SequenceTable {
    next_producer_id: AtomicU64,
    slots: Mutex<HashMap<ThreadId, Arc<ProducerSlot>>>,
}

impl SequenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the next sequence number for the calling thread's producer,
    /// creating the producer slot on first use. Non-blocking apart from the
    /// slot-map lock; the sequence increment itself is a single atomic add.
    pub fn next_for_current_thread(&self) -> SequencedId {
        let slot = self.slot_for(thread::current().id());
        SequencedId {
            producer_id: slot.producer_id,
            sequence: slot.next_sequence.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Number of distinct producers seen so far.
    pub fn producer_count(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    fn slot_for(&self, thread_id: ThreadId) -> Arc<ProducerSlot> {
        let mut slots = self.slots.lock().unwrap();
        slots
            .entry(thread_id)
            .or_insert_with(|| {
                Arc::new(ProducerSlot {
                    producer_id: self.next_producer_id.fetch_add(1, Ordering::Relaxed),
                    next_sequence: AtomicU64::new(0),
                })
            })
            .clone()
    }
}
