//! Batch accumulation for one flush cycle.
//!
//! A batch collects requests in arrival order, tracks their accumulated
//! on-disk size, is sorted by `(producer_id, sequence)` just before
//! serialization, and is written as one contiguous buffer so the whole
//! group shares a single force. Record boundaries and per-record checksums
//! are preserved in the byte stream.

use std::sync::Arc;

use super::format::encode_record;
use super::request::WriteRequest;

/// Ordered collection of requests for one flush.
#[derive(Debug, Default)]
pub struct Batch {
    requests: Vec<Arc<WriteRequest>>,
    frame_bytes: usize,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: Arc<WriteRequest>) {
        self.frame_bytes += request.frame_size();
        self.requests.push(request);
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Accumulated on-disk size of all collected frames.
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    pub fn requests(&self) -> &[Arc<WriteRequest>] {
        &self.requests
    }

    /// Sorts by `(producer_id, sequence)`. Requests are dequeued in
    /// arbitrary interleaved order; this sort is what guarantees that a
    /// producer's records land in the file in submission order.
    pub fn sort_for_commit(&mut self) {
        self.requests.sort_by_key(|request| request.order_key());
    }

    /// Serializes every request into `buf` in current batch order.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.clear();
        buf.reserve(self.frame_bytes);
        for request in &self.requests {
            encode_record(buf, request.producer_id(), request.payload());
        }
    }

    /// Resolves every request's completion as succeeded.
    pub fn complete_all_ok(&self) {
        for request in &self.requests {
            request.completion().resolve_ok();
        }
    }

    /// Resolves every request's completion as failed with `error`.
    pub fn complete_all_err(&self, error: &super::errors::LogError) {
        for request in &self.requests {
            request.completion().resolve_err(error.clone());
        }
    }

    pub fn clear(&mut self) {
        self.requests.clear();
        self.frame_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::super::errors::LogError;
    use super::super::format::{FrameHeader, RECORD_HEADER_SIZE};
    use super::super::sequence::SequencedId;
    use super::*;

    fn request(producer_id: u64, sequence: u64, payload: &[u8]) -> Arc<WriteRequest> {
        Arc::new(WriteRequest::new(
            payload.to_vec(),
            SequencedId {
                producer_id,
                sequence,
            },
        ))
    }

    #[test]
    fn tracks_frame_bytes() {
        let mut batch = Batch::new();
        assert_eq!(batch.frame_bytes(), 0);
        batch.push(request(0, 0, b"abcd"));
        assert_eq!(batch.frame_bytes(), RECORD_HEADER_SIZE + 4);
        batch.push(request(0, 1, b""));
        assert_eq!(batch.frame_bytes(), 2 * RECORD_HEADER_SIZE + 4);
    }

    #[test]
    fn sort_orders_by_producer_then_sequence() {
        let mut batch = Batch::new();
        batch.push(request(1, 1, b"b1"));
        batch.push(request(0, 1, b"a1"));
        batch.push(request(1, 0, b"b0"));
        batch.push(request(0, 0, b"a0"));
        batch.sort_for_commit();

        let keys: Vec<_> = batch.requests().iter().map(|r| r.order_key()).collect();
        assert_eq!(keys, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn encode_concatenates_frames_in_order() {
        let mut batch = Batch::new();
        batch.push(request(3, 0, b"first"));
        batch.push(request(3, 1, b"second"));

        let mut buf = Vec::new();
        batch.encode_into(&mut buf);
        assert_eq!(buf.len(), batch.frame_bytes());

        let first = FrameHeader::decode(buf[0..RECORD_HEADER_SIZE].try_into().unwrap());
        assert_eq!(first.payload_len(), 5);
        let second_start = RECORD_HEADER_SIZE + 5;
        let second = FrameHeader::decode(
            buf[second_start..second_start + RECORD_HEADER_SIZE]
                .try_into()
                .unwrap(),
        );
        assert_eq!(second.payload_len(), 6);
        assert_eq!(&buf[second_start + RECORD_HEADER_SIZE..], b"second");
    }

    #[test]
    fn encode_clears_previous_buffer_contents() {
        let mut batch = Batch::new();
        batch.push(request(0, 0, b"xyz"));
        let mut buf = vec![0xFF; 64];
        batch.encode_into(&mut buf);
        assert_eq!(buf.len(), batch.frame_bytes());
    }

    #[test]
    fn completion_fanout() {
        let mut batch = Batch::new();
        batch.push(request(0, 0, b"a"));
        batch.push(request(0, 1, b"b"));
        batch.complete_all_ok();
        for req in batch.requests() {
            assert!(req.completion().poll().unwrap().is_ok());
        }

        let mut failed = Batch::new();
        failed.push(request(1, 0, b"c"));
        failed.complete_all_err(&LogError::Closed);
        assert!(failed.requests()[0].completion().poll().unwrap().is_err());
    }

    #[test]
    fn clear_resets_bytes() {
        let mut batch = Batch::new();
        batch.push(request(0, 0, b"abcd"));
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.frame_bytes(), 0);
    }
}
