//! On-disk format: file header and record frames.
//!
//! A log file is a 32-byte header followed by record frames:
//!
//! ```text
//! header:  [magic u64][version u32][flags u32][created_at_millis i64][reserved u64]
//! record:  [frame_length u32][checksum u32][producer_id u64][payload bytes]
//! ```
//!
//! All integers are little-endian. `frame_length` counts the producer id
//! plus the payload (8 + payload length); the checksum covers the producer
//! id and payload only. Every record is individually checksummed and
//! parseable, so any valid prefix of the stream is a consistent log.

use chrono::Utc;

use super::checksum::record_checksum;
use super::errors::{LogError, LogResult};

/// Identifies the file format ("DURLOG" + format byte).
pub const LOG_MAGIC: u64 = 0x0044_5552_4C4F_4701;

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Fixed size of the file header in bytes.
pub const FILE_HEADER_SIZE: usize = 32;

/// Fixed size of a record frame header in bytes:
/// length (4) + checksum (4) + producer id (8).
pub const RECORD_HEADER_SIZE: usize = 16;

/// Smallest legal `frame_length`: a producer id with an empty payload.
pub const MIN_FRAME_LENGTH: u32 = 8;

/// Hard upper bound on `frame_length` used when scanning. Anything larger
/// is treated as a corrupt length prefix rather than a record.
pub const MAX_FRAME_LENGTH: u32 = 64 * 1024 * 1024;

/// Decoded file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u32,
    pub flags: u32,
    pub created_at_millis: i64,
}

impl FileHeader {
    /// Header for a newly created log file, stamped with the current
    /// wall-clock time.
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION,
            flags: 0,
            created_at_millis: Utc::now().timestamp_millis(),
        }
    }

    /// Encodes the header to its fixed 32-byte form.
    pub fn encode(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        buf[0..8].copy_from_slice(&LOG_MAGIC.to_le_bytes());
        buf[8..12].copy_from_slice(&self.version.to_le_bytes());
        buf[12..16].copy_from_slice(&self.flags.to_le_bytes());
        buf[16..24].copy_from_slice(&self.created_at_millis.to_le_bytes());
        buf[24..32].copy_from_slice(&0u64.to_le_bytes());
        buf
    }

    /// Decodes and validates a header.
    ///
    /// Fails on short input, a mismatched magic constant, or an unsupported
    /// version. The reserved field is ignored.
    pub fn decode(data: &[u8]) -> LogResult<Self> {
        if data.len() < FILE_HEADER_SIZE {
            return Err(LogError::corruption(
                0,
                format!(
                    "file too small for header: {} bytes, need {}",
                    data.len(),
                    FILE_HEADER_SIZE
                ),
            ));
        }
        let magic = u64::from_le_bytes(data[0..8].try_into().unwrap());
        if magic != LOG_MAGIC {
            return Err(LogError::corruption(
                0,
                format!("bad magic: {magic:#018x}"),
            ));
        }
        let version = u32::from_le_bytes(data[8..12].try_into().unwrap());
        if version != FORMAT_VERSION {
            return Err(LogError::corruption(
                8,
                format!("unsupported format version: {version}"),
            ));
        }
        let flags = u32::from_le_bytes(data[12..16].try_into().unwrap());
        let created_at_millis = i64::from_le_bytes(data[16..24].try_into().unwrap());
        Ok(Self {
            version,
            flags,
            created_at_millis,
        })
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoded record frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_length: u32,
    pub checksum: u32,
    pub producer_id: u64,
}

impl FrameHeader {
    /// Decodes the fixed 16-byte frame header. Performs no validation;
    /// callers apply [`FrameHeader::length_in_bounds`] and fit checks.
    pub fn decode(data: &[u8; RECORD_HEADER_SIZE]) -> Self {
        Self {
            frame_length: u32::from_le_bytes(data[0..4].try_into().unwrap()),
            checksum: u32::from_le_bytes(data[4..8].try_into().unwrap()),
            producer_id: u64::from_le_bytes(data[8..16].try_into().unwrap()),
        }
    }

    /// Whether the stated frame length is within the sane scan bounds.
    pub fn length_in_bounds(&self) -> bool {
        self.frame_length >= MIN_FRAME_LENGTH && self.frame_length <= MAX_FRAME_LENGTH
    }

    /// Payload length implied by the frame length.
    pub fn payload_len(&self) -> usize {
        (self.frame_length - MIN_FRAME_LENGTH) as usize
    }
}

/// Total on-disk size of a record carrying `payload_len` payload bytes.
pub fn frame_size(payload_len: usize) -> usize {
    RECORD_HEADER_SIZE + payload_len
}

/// Appends one encoded record frame to `buf`.
pub fn encode_record(buf: &mut Vec<u8>, producer_id: u64, payload: &[u8]) {
    let frame_length = MIN_FRAME_LENGTH + payload.len() as u32;
    let checksum = record_checksum(producer_id, payload);
    buf.reserve(frame_size(payload.len()));
    buf.extend_from_slice(&frame_length.to_le_bytes());
    buf.extend_from_slice(&checksum.to_le_bytes());
    buf.extend_from_slice(&producer_id.to_le_bytes());
    buf.extend_from_slice(payload);
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::super::checksum::record_checksum;
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = FileHeader::new();
        let encoded = header.encode();
        let decoded = FileHeader::decode(&encoded).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn header_layout_is_byte_exact() {
        let header = FileHeader {
            version: 1,
            flags: 0,
            created_at_millis: 0x0102_0304_0506_0708,
        };
        let encoded = header.encode();
        assert_eq!(encoded.len(), FILE_HEADER_SIZE);
        assert_eq!(&encoded[0..8], &LOG_MAGIC.to_le_bytes());
        assert_eq!(&encoded[8..12], &1u32.to_le_bytes());
        assert_eq!(&encoded[12..16], &0u32.to_le_bytes());
        assert_eq!(&encoded[16..24], &0x0102_0304_0506_0708i64.to_le_bytes());
        assert_eq!(&encoded[24..32], &[0u8; 8]);
    }

    #[test]
    fn header_rejects_bad_magic() {
        let mut encoded = FileHeader::new().encode();
        encoded[0] ^= 0xFF;
        let err = FileHeader::decode(&encoded).unwrap_err();
        assert_eq!(err.code(), "LOG_CORRUPTION");
    }

    #[test]
    fn header_rejects_unsupported_version() {
        let mut encoded = FileHeader::new().encode();
        encoded[8..12].copy_from_slice(&99u32.to_le_bytes());
        let err = FileHeader::decode(&encoded).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn header_rejects_short_input() {
        assert!(FileHeader::decode(&[0u8; 16]).is_err());
    }

    #[test]
    fn record_layout_is_byte_exact() {
        let payload = b"abc";
        let mut buf = Vec::new();
        encode_record(&mut buf, 42, payload);

        assert_eq!(buf.len(), frame_size(payload.len()));
        assert_eq!(&buf[0..4], &11u32.to_le_bytes()); // 8 + 3
        assert_eq!(&buf[4..8], &record_checksum(42, payload).to_le_bytes());
        assert_eq!(&buf[8..16], &42u64.to_le_bytes());
        assert_eq!(&buf[16..], payload);
    }

    #[test]
    fn frame_header_decodes_encoded_record() {
        let mut buf = Vec::new();
        encode_record(&mut buf, 7, b"payload");

        let header = FrameHeader::decode(buf[0..RECORD_HEADER_SIZE].try_into().unwrap());
        assert_eq!(header.producer_id, 7);
        assert_eq!(header.payload_len(), 7);
        assert!(header.length_in_bounds());
        assert_eq!(header.checksum, record_checksum(7, b"payload"));
    }

    #[test]
    fn empty_payload_frame_is_minimal_and_in_bounds() {
        let mut buf = Vec::new();
        encode_record(&mut buf, 1, &[]);
        assert_eq!(buf.len(), RECORD_HEADER_SIZE);

        let header = FrameHeader::decode(buf[0..RECORD_HEADER_SIZE].try_into().unwrap());
        assert_eq!(header.frame_length, MIN_FRAME_LENGTH);
        assert!(header.length_in_bounds());
        assert_eq!(header.payload_len(), 0);
    }

    #[test]
    fn oversized_length_is_out_of_bounds() {
        let header = FrameHeader {
            frame_length: MAX_FRAME_LENGTH + 1,
            checksum: 0,
            producer_id: 0,
        };
        assert!(!header.length_in_bounds());

        let header = FrameHeader {
            frame_length: MIN_FRAME_LENGTH - 1,
            checksum: 0,
            producer_id: 0,
        };
        assert!(!header.length_in_bounds());
    }

    proptest! {
        #[test]
        fn encoded_records_verify_and_detect_flips(
            producer_id in any::<u64>(),
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            flip in 0usize..128,
        ) {
            let mut buf = Vec::new();
            encode_record(&mut buf, producer_id, &payload);

            let header = FrameHeader::decode(buf[0..RECORD_HEADER_SIZE].try_into().unwrap());
            prop_assert_eq!(header.producer_id, producer_id);
            prop_assert_eq!(header.payload_len(), payload.len());
            prop_assert_eq!(&buf[RECORD_HEADER_SIZE..], &payload[..]);
            prop_assert_eq!(header.checksum, record_checksum(producer_id, &payload));

            // Flipping any bit of the checksummed region must be detected.
            if !payload.is_empty() {
                let idx = RECORD_HEADER_SIZE + flip % payload.len();
                buf[idx] ^= 0x01;
                let damaged = FrameHeader::decode(buf[0..RECORD_HEADER_SIZE].try_into().unwrap());
                prop_assert_ne!(
                    record_checksum(damaged.producer_id, &buf[RECORD_HEADER_SIZE..]),
                    damaged.checksum
                );
            }
        }
    }
}
