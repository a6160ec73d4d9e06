//! Commit log records.
//!
//! Every committed write transaction becomes one record:
//!
//! ```text
//! magic (4) | version (2) | payload length (4) | payload | crc32 (4)
//! ```
//!
//! The CRC covers everything before it. The payload is an operation count
//! followed by the operations in the order the transaction issued them.

use crate::error::{EngineError, EngineResult};

/// Magic bytes opening every record.
pub const LOG_MAGIC: [u8; 4] = *b"SHLF";

/// Current record format version.
pub const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + length (4)
const HEADER_SIZE: usize = 10;

const CRC_SIZE: usize = 4;

const OP_CREATE_DB: u8 = 1;
const OP_PUT: u8 = 2;

/// One operation inside a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOp {
    /// A sub-database name was registered at `index`.
    CreateDb {
        /// Handle index assigned to the name.
        index: u32,
        /// Sub-database name.
        name: String,
    },
    /// A value was stored.
    Put {
        /// Target sub-database index.
        db: u32,
        /// Key bytes.
        key: Vec<u8>,
        /// Value bytes.
        value: Vec<u8>,
    },
}

/// All operations of one committed write transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitRecord {
    /// Operations in issue order.
    pub ops: Vec<LogOp>,
}

impl CommitRecord {
    /// Encodes the record with its envelope.
    pub fn encode(&self) -> EngineResult<Vec<u8>> {
        let mut payload = Vec::new();
        put_len(&mut payload, self.ops.len())?;

        for op in &self.ops {
            match op {
                LogOp::CreateDb { index, name } => {
                    payload.push(OP_CREATE_DB);
                    payload.extend_from_slice(&index.to_le_bytes());
                    put_bytes(&mut payload, name.as_bytes())?;
                }
                LogOp::Put { db, key, value } => {
                    payload.push(OP_PUT);
                    payload.extend_from_slice(&db.to_le_bytes());
                    put_bytes(&mut payload, key)?;
                    put_bytes(&mut payload, value)?;
                }
            }
        }

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&LOG_MAGIC);
        data.extend_from_slice(&LOG_VERSION.to_le_bytes());
        put_len(&mut data, payload.len())?;
        data.extend_from_slice(&payload);

        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());

        Ok(data)
    }

    fn decode_payload(payload: &[u8]) -> EngineResult<Self> {
        let mut reader = Reader::new(payload);
        let count = reader.u32()? as usize;
        let mut ops = Vec::with_capacity(count.min(1024));

        for _ in 0..count {
            let op = match reader.u8()? {
                OP_CREATE_DB => {
                    let index = reader.u32()?;
                    let name = String::from_utf8(reader.bytes()?.to_vec())
                        .map_err(|_| EngineError::corrupted("sub-database name is not UTF-8"))?;
                    LogOp::CreateDb { index, name }
                }
                OP_PUT => LogOp::Put {
                    db: reader.u32()?,
                    key: reader.bytes()?.to_vec(),
                    value: reader.bytes()?.to_vec(),
                },
                other => {
                    return Err(EngineError::corrupted(format!("unknown op tag {other}")));
                }
            };
            ops.push(op);
        }

        if !reader.is_done() {
            return Err(EngineError::corrupted("trailing bytes in commit record"));
        }

        Ok(Self { ops })
    }
}

/// Result of scanning a log image.
#[derive(Debug, Default)]
pub struct Scan {
    /// Records that decoded cleanly, in log order.
    pub records: Vec<CommitRecord>,
    /// Length of the clean prefix. Anything after it is a torn tail.
    pub valid_len: u64,
}

/// Decodes every record in `data`.
///
/// Only an incomplete record at the end (a short header, or a length running
/// past the end of the data) ends the scan early; the caller decides what to
/// do with the bytes past `valid_len`. A complete record with a bad magic,
/// an unknown version, a checksum mismatch or an undecodable payload is
/// corruption and is reported as an error; commits after it are never
/// skipped.
pub fn scan(data: &[u8]) -> EngineResult<Scan> {
    let mut scan = Scan::default();
    let mut offset = 0usize;

    while data.len() - offset >= HEADER_SIZE {
        let header = &data[offset..offset + HEADER_SIZE];
        if header[..4] != LOG_MAGIC {
            return Err(EngineError::corrupted(format!(
                "invalid magic at offset {offset}"
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != LOG_VERSION {
            return Err(EngineError::corrupted(format!(
                "unsupported log version {version} at offset {offset}"
            )));
        }

        let len = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;
        let end = offset + HEADER_SIZE + len;
        if end + CRC_SIZE > data.len() {
            break;
        }

        let stored = u32::from_le_bytes([data[end], data[end + 1], data[end + 2], data[end + 3]]);
        let computed = compute_crc32(&data[offset..end]);
        if computed != stored {
            return Err(EngineError::corrupted(format!(
                "checksum mismatch at offset {offset}: stored {stored:#010x}, computed {computed:#010x}"
            )));
        }

        let record = CommitRecord::decode_payload(&data[offset + HEADER_SIZE..end])?;
        scan.records.push(record);
        offset = end + CRC_SIZE;
    }

    scan.valid_len = offset as u64;
    Ok(scan)
}

fn put_len(buf: &mut Vec<u8>, len: usize) -> EngineResult<()> {
    let len = u32::try_from(len)
        .map_err(|_| EngineError::invalid_config("commit record too large"))?;
    buf.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> EngineResult<()> {
    put_len(buf, bytes.len())?;
    buf.extend_from_slice(bytes);
    Ok(())
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> EngineResult<&'a [u8]> {
        if self.data.len() - self.pos < n {
            return Err(EngineError::corrupted("unexpected end of commit record"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> EngineResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> EngineResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn bytes(&mut self) -> EngineResult<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn is_done(&self) -> bool {
        self.pos == self.data.len()
    }
}

/// CRC32 (IEEE polynomial).
pub fn compute_crc32(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        crc = (crc >> 8) ^ TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}
