//! CRC32 checksums for record frames.
//!
//! The stored checksum covers the producer id and the payload, not the
//! length prefix. A length field corrupted on disk is caught by the frame
//! bounds checks instead.
//!
//! Uses CRC32 (IEEE polynomial).

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided bytes.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Computes the checksum stored in a record frame: producer id (as its
/// little-endian bytes) followed by the payload, without intermediate
/// allocation.
pub fn record_checksum(producer_id: u64, payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&producer_id.to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}

/// Verifies bytes against an expected checksum.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
