//! Write-log records and their on-disk framing.
//!
//! Frame layout:
//!
//! ```text
//! magic "NBTL" (4) | version (2) | type (1) | len (4) | CBOR payload (len) | crc32 (4)
//! ```
//!
//! The CRC covers every byte before it. Integers are little-endian.

use crate::error::{CoreError, CoreResult};
use crate::types::{Key, ReplicaAddr, Timestamp};
use crate::write::Write;
use nbta_storage::crc32;
use serde::{Deserialize, Serialize};

/// Magic bytes opening every frame.
pub(crate) const LOG_MAGIC: [u8; 4] = *b"NBTL";

/// Current frame format version.
pub(crate) const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
const HEADER_SIZE: usize = 11;

const CRC_SIZE: usize = 4;

/// One mutation of a replica's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum LogRecord {
    /// A write entered the pending set.
    PendingAdded(Write),
    /// A pending write became stable.
    Promoted {
        /// Key of the promoted write.
        key: Key,
        /// Timestamp of the promoted write.
        ts: Timestamp,
    },
    /// A new acknowledger was counted.
    Acked {
        /// Key the acknowledgment is credited to.
        to_key: Key,
        /// Timestamp acknowledged.
        ts: Timestamp,
        /// Sibling key on whose behalf the acknowledgment was sent.
        from_key: Key,
        /// Replica that sent the acknowledgment.
        from_replica: ReplicaAddr,
    },
}

impl LogRecord {
    fn type_byte(&self) -> u8 {
        match self {
            LogRecord::PendingAdded(_) => 1,
            LogRecord::Promoted { .. } => 2,
            LogRecord::Acked { .. } => 3,
        }
    }

    /// Encodes the record into a complete frame.
    pub(crate) fn encode_frame(&self) -> CoreResult<Vec<u8>> {
        let mut payload = Vec::new();
        ciborium::into_writer(self, &mut payload).map_err(|e| CoreError::codec(e.to_string()))?;
        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::invalid_argument("log record payload too large"))?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&LOG_MAGIC);
        frame.extend_from_slice(&LOG_VERSION.to_le_bytes());
        frame.push(self.type_byte());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);
        let crc = crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }
}

/// Result of scanning a log image.
#[derive(Debug, Default)]
pub(crate) struct LogScan {
    /// Records in log order, with the offset each frame starts at.
    pub(crate) records: Vec<(u64, LogRecord)>,
    /// Length of the prefix made only of complete, valid frames.
    pub(crate) valid_len: u64,
    /// True if bytes after `valid_len` form an incomplete frame.
    pub(crate) torn: bool,
}

/// Parses every frame in `bytes`.
///
/// An incomplete frame at the end is reported as a torn tail rather than
/// an error; it is what a crash mid-append leaves behind. Bad magic, an
/// unknown version, a CRC mismatch or an undecodable payload is corruption.
pub(crate) fn scan(bytes: &[u8]) -> CoreResult<LogScan> {
    let mut scan = LogScan::default();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let offset = pos as u64;
        let rest = &bytes[pos..];
        if rest.len() < HEADER_SIZE {
            scan.torn = true;
            break;
        }
        if rest[..4] != LOG_MAGIC {
            return Err(CoreError::log_corruption(offset, "bad magic"));
        }
        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version != LOG_VERSION {
            return Err(CoreError::log_corruption(
                offset,
                format!("unsupported version {version}"),
            ));
        }
        let type_byte = rest[6];
        let len = u32::from_le_bytes([rest[7], rest[8], rest[9], rest[10]]) as usize;
        let frame_len = HEADER_SIZE + len + CRC_SIZE;
        if rest.len() < frame_len {
            scan.torn = true;
            break;
        }

        let body = &rest[..HEADER_SIZE + len];
        let stored = u32::from_le_bytes([
            rest[HEADER_SIZE + len],
            rest[HEADER_SIZE + len + 1],
            rest[HEADER_SIZE + len + 2],
            rest[HEADER_SIZE + len + 3],
        ]);
        let actual = crc32(body);
        if stored != actual {
            return Err(CoreError::log_corruption(
                offset,
                format!("checksum mismatch: expected {stored:08x}, got {actual:08x}"),
            ));
        }

        let record: LogRecord = ciborium::from_reader(&body[HEADER_SIZE..])
            .map_err(|e| CoreError::log_corruption(offset, e.to_string()))?;
        if record.type_byte() != type_byte {
            return Err(CoreError::log_corruption(
                offset,
                format!("type byte {type_byte} does not match payload"),
            ));
        }

        scan.records.push((offset, record));
        pos += frame_len;
        scan.valid_len = pos as u64;
    }

    Ok(scan)
}
