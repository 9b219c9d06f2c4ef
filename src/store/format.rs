//! Session file format
//!
//! A session file is a single append-only stream. Data blocks are written
//! while the session is live; the catalog is serialized once at close and
//! the header is patched to point at it. A zero catalog offset therefore
//! marks a session that was never closed.
//!
//! Layout:
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ HEADER (64 bytes)                       │
//! │   magic: [u8; 4] = "STNT"               │
//! │   version: u16                          │
//! │   block_count: u32                      │
//! │   start_time: i64                       │
//! │   end_time: i64                         │
//! │   catalog_offset: u64 (0 while open)    │
//! │   catalog_len: u64                      │
//! │   reserved: [u8; 18]                    │
//! │   checksum: u32                         │
//! ├─────────────────────────────────────────┤
//! │ DATA BLOCKS (variable)                  │
//! │   For each burst:                       │
//! │     channel_id: u32                     │
//! │     start_time: i64                     │
//! │     sample_count: u32                   │
//! │     payload_len: u32                    │
//! │     payload: [u8; payload_len]          │
//! │     payload_checksum: u32               │
//! ├─────────────────────────────────────────┤
//! │ CATALOG (written at close)              │
//! │   bincode CatalogRecord                 │
//! │   catalog_checksum: u32                 │
//! └─────────────────────────────────────────┘
//! ```

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::session::conversion::Conversion;
use crate::session::error::{SessionError, SessionResult};
use crate::session::lap::LapMark;
use crate::session::parameter::{Channel, Parameter};
use crate::session::virtual_param::VirtualParameter;

/// Magic bytes for session file identification
pub const SESSION_MAGIC: [u8; 4] = *b"STNT";

/// Current session format version
pub const FORMAT_VERSION: u16 = 1;

/// Header size in bytes
pub const HEADER_SIZE: usize = 64;

/// Fixed bytes of the inline block header (before the payload)
pub const BLOCK_HEADER_SIZE: usize = 20;

/// Session file header
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHeader {
    /// Format version
    pub version: u16,
    /// Number of data blocks in the file
    pub block_count: u32,
    /// Session start tick
    pub start_time: i64,
    /// Session end tick
    pub end_time: i64,
    /// File offset of the catalog (0 while the session is open)
    pub catalog_offset: u64,
    /// Serialized catalog length, excluding its checksum
    pub catalog_len: u64,
}

impl SessionHeader {
    /// Header of a freshly created, still-open session
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION,
            block_count: 0,
            start_time: 0,
            end_time: 0,
            catalog_offset: 0,
            catalog_len: 0,
        }
    }

    /// A session is closed once the header points at a catalog
    pub fn is_closed(&self) -> bool {
        self.catalog_offset != 0
    }

    /// Serialize header to bytes
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];

        buf[0..4].copy_from_slice(&SESSION_MAGIC);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6..10].copy_from_slice(&self.block_count.to_le_bytes());
        buf[10..18].copy_from_slice(&self.start_time.to_le_bytes());
        buf[18..26].copy_from_slice(&self.end_time.to_le_bytes());
        buf[26..34].copy_from_slice(&self.catalog_offset.to_le_bytes());
        buf[34..42].copy_from_slice(&self.catalog_len.to_le_bytes());
        // bytes 42-59 reserved

        let checksum = crc32fast::hash(&buf[0..60]);
        buf[60..64].copy_from_slice(&checksum.to_le_bytes());

        buf
    }

    /// Parse header from bytes
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> SessionResult<Self> {
        let stored_checksum = u32::from_le_bytes([buf[60], buf[61], buf[62], buf[63]]);
        let computed_checksum = crc32fast::hash(&buf[0..60]);
        if stored_checksum != computed_checksum {
            return Err(SessionError::Corruption(format!(
                "header checksum mismatch: stored={}, computed={}",
                stored_checksum, computed_checksum
            )));
        }

        if buf[0..4] != SESSION_MAGIC {
            return Err(SessionError::Corruption(format!(
                "invalid magic: {:?}",
                &buf[0..4]
            )));
        }

        let version = u16::from_le_bytes([buf[4], buf[5]]);
        if version > FORMAT_VERSION {
            return Err(SessionError::Corruption(format!(
                "unsupported format version: {}",
                version
            )));
        }

        let block_count = u32::from_le_bytes([buf[6], buf[7], buf[8], buf[9]]);
        let start_time = i64::from_le_bytes([
            buf[10], buf[11], buf[12], buf[13], buf[14], buf[15], buf[16], buf[17],
        ]);
        let end_time = i64::from_le_bytes([
            buf[18], buf[19], buf[20], buf[21], buf[22], buf[23], buf[24], buf[25],
        ]);
        let catalog_offset = u64::from_le_bytes([
            buf[26], buf[27], buf[28], buf[29], buf[30], buf[31], buf[32], buf[33],
        ]);
        let catalog_len = u64::from_le_bytes([
            buf[34], buf[35], buf[36], buf[37], buf[38], buf[39], buf[40], buf[41],
        ]);

        Ok(Self {
            version,
            block_count,
            start_time,
            end_time,
            catalog_offset,
            catalog_len,
        })
    }
}

impl Default for SessionHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Location and shape of one data block, kept in the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BlockRecord {
    pub channel_id: u32,
    /// Tick of the first sample in the burst
    pub start_time: i64,
    pub sample_count: u32,
    /// File offset of the inline block header
    pub offset: u64,
    pub payload_len: u32,
}

impl BlockRecord {
    /// Tick of the last sample in the burst
    pub fn end_time(&self, interval: i64) -> i64 {
        self.start_time + (self.sample_count as i64 - 1).max(0) * interval
    }
}

/// Persisted form of a parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub identifier: String,
    pub name: String,
    pub group: String,
    pub sub_groups: Vec<String>,
    pub description: String,
    pub units: String,
    pub conversion: String,
    pub channels: Vec<Channel>,
}

impl ParameterRecord {
    pub fn from_parameter(parameter: &Parameter) -> Self {
        Self {
            identifier: parameter.identifier.clone(),
            name: parameter.name.clone(),
            group: parameter.group.clone(),
            sub_groups: parameter.sub_groups.clone(),
            description: parameter.description.clone(),
            units: parameter.units.clone(),
            conversion: parameter.conversion.clone(),
            channels: parameter.channels().cloned().collect(),
        }
    }

    pub fn into_parameter(self) -> Parameter {
        Parameter::from_parts(
            self.identifier,
            self.name,
            self.group,
            self.sub_groups,
            self.description,
            self.units,
            self.conversion,
            self.channels,
        )
    }
}

/// Everything written at close: schema, laps, details and the block index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub parameters: Vec<ParameterRecord>,
    pub conversions: Vec<Conversion>,
    pub virtuals: Vec<VirtualParameter>,
    pub laps: Vec<LapMark>,
    pub details: Vec<(String, String)>,
    pub blocks: Vec<BlockRecord>,
}

/// Append one data block; returns the number of bytes written
pub fn write_block<W: Write>(
    writer: &mut W,
    channel_id: u32,
    start_time: i64,
    sample_count: u32,
    payload: &[u8],
) -> SessionResult<u64> {
    writer.write_all(&channel_id.to_le_bytes())?;
    writer.write_all(&start_time.to_le_bytes())?;
    writer.write_all(&sample_count.to_le_bytes())?;
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(payload)?;
    writer.write_all(&crc32fast::hash(payload).to_le_bytes())?;
    Ok((BLOCK_HEADER_SIZE + payload.len() + 4) as u64)
}

/// Read and verify one data block payload
pub fn read_block<R: Read + Seek>(reader: &mut R, record: &BlockRecord) -> SessionResult<Vec<u8>> {
    reader.seek(SeekFrom::Start(record.offset))?;

    let mut head = [0u8; BLOCK_HEADER_SIZE];
    reader.read_exact(&mut head)?;
    let channel_id = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);
    let start_time = i64::from_le_bytes([
        head[4], head[5], head[6], head[7], head[8], head[9], head[10], head[11],
    ]);
    let sample_count = u32::from_le_bytes([head[12], head[13], head[14], head[15]]);
    let payload_len = u32::from_le_bytes([head[16], head[17], head[18], head[19]]);

    if channel_id != record.channel_id
        || start_time != record.start_time
        || sample_count != record.sample_count
        || payload_len != record.payload_len
    {
        return Err(SessionError::Corruption(format!(
            "block at offset {} does not match its catalog record",
            record.offset
        )));
    }

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload)?;

    let mut checksum_buf = [0u8; 4];
    reader.read_exact(&mut checksum_buf)?;
    let stored_checksum = u32::from_le_bytes(checksum_buf);
    let computed_checksum = crc32fast::hash(&payload);
    if stored_checksum != computed_checksum {
        return Err(SessionError::Corruption(format!(
            "block at offset {} checksum mismatch",
            record.offset
        )));
    }

    Ok(payload)
}

/// Serialize the catalog; returns its length excluding the checksum
pub fn write_catalog<W: Write>(writer: &mut W, record: &CatalogRecord) -> SessionResult<u64> {
    let encoded = bincode::serialize(record)?;
    writer.write_all(&encoded)?;
    writer.write_all(&crc32fast::hash(&encoded).to_le_bytes())?;
    Ok(encoded.len() as u64)
}

/// Read and verify the catalog a closed header points at
pub fn read_catalog<R: Read + Seek>(
    reader: &mut R,
    header: &SessionHeader,
) -> SessionResult<CatalogRecord> {
    if !header.is_closed() {
        return Err(SessionError::Corruption(
            "session was not closed: no catalog present".to_string(),
        ));
    }

    reader.seek(SeekFrom::Start(header.catalog_offset))?;
    let mut encoded = vec![0u8; header.catalog_len as usize];
    reader.read_exact(&mut encoded)?;

    let mut checksum_buf = [0u8; 4];
    reader.read_exact(&mut checksum_buf)?;
    let stored_checksum = u32::from_le_bytes(checksum_buf);
    let computed_checksum = crc32fast::hash(&encoded);
    if stored_checksum != computed_checksum {
        return Err(SessionError::Corruption(format!(
            "catalog checksum mismatch: stored={}, computed={}",
            stored_checksum, computed_checksum
        )));
    }

    let record: CatalogRecord = bincode::deserialize(&encoded)?;
    Ok(record)
}

/// A fully loaded session file: header, catalog, and raw block payloads
/// (aligned with `catalog.blocks`)
pub struct RawSessionFile {
    pub header: SessionHeader,
    pub catalog: CatalogRecord,
    pub payloads: Vec<Vec<u8>>,
}

/// Read an entire session file into memory
pub fn read_session_file(path: &Path) -> SessionResult<RawSessionFile> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut header_buf = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_buf)?;
    let header = SessionHeader::from_bytes(&header_buf)?;

    let catalog = read_catalog(&mut reader, &header)?;

    if catalog.blocks.len() != header.block_count as usize {
        return Err(SessionError::Corruption(format!(
            "header declares {} blocks but catalog indexes {}",
            header.block_count,
            catalog.blocks.len()
        )));
    }

    let mut payloads = Vec::with_capacity(catalog.blocks.len());
    for record in &catalog.blocks {
        payloads.push(read_block(&mut reader, record)?);
    }

    Ok(RawSessionFile {
        header,
        catalog,
        payloads,
    })
}
