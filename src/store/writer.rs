//! Session writer
//!
//! `FileSessionWriter` owns the full write lifecycle of a session file:
//! stage parameters, commit the catalog, append periodic bursts, record
//! laps, close. Data blocks stream to disk as they are written; the
//! catalog and header are finalized at close, so a crash leaves a file
//! that readers reject as unclosed rather than silently truncated.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::session::builder::{RationalParameterBuilder, TextParameterBuilder};
use crate::session::data::PhysicalRange;
use crate::session::detail::SessionDetails;
use crate::session::error::{SessionError, SessionResult};
use crate::session::lap::{LapMark, LapType};
use crate::session::parameter::{Channel, Parameter, ParameterCatalog};
use crate::session::virtual_param::VirtualParameter;

use super::format::{
    self, BlockRecord, CatalogRecord, ParameterRecord, SessionHeader, HEADER_SIZE,
};

/// Writes one session file
pub struct FileSessionWriter {
    path: PathBuf,
    file: BufWriter<File>,
    catalog: ParameterCatalog,
    details: SessionDetails,
    lap_marks: Vec<LapMark>,
    blocks: Vec<BlockRecord>,
    /// Per channel: first tick a new burst may start at
    cursors: HashMap<u32, i64>,
    /// Current append position
    write_offset: u64,
    data_start: Option<i64>,
    data_end: Option<i64>,
    closed: bool,
}

impl FileSessionWriter {
    /// Create a new session file
    ///
    /// The file starts with an open header (no catalog offset); it only
    /// becomes readable after `close_session`.
    pub fn create(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = BufWriter::new(File::create(&path)?);
        file.write_all(&SessionHeader::new().to_bytes())?;
        file.flush()?;

        tracing::info!("Created session {:?}", path);
        Ok(Self {
            path,
            file,
            catalog: ParameterCatalog::new(),
            details: SessionDetails::new(),
            lap_marks: Vec::new(),
            blocks: Vec::new(),
            cursors: HashMap::new(),
            write_offset: HEADER_SIZE as u64,
            data_start: None,
            data_end: None,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Begin staging a numeric parameter
    pub fn build_rational_parameter(
        &mut self,
        group: impl Into<String>,
        name: impl Into<String>,
        physical_range: PhysicalRange,
    ) -> RationalParameterBuilder<'_> {
        RationalParameterBuilder::new(&mut self.catalog, group, name, physical_range)
    }

    /// Begin staging a text parameter
    pub fn build_text_parameter(
        &mut self,
        group: impl Into<String>,
        name: impl Into<String>,
    ) -> TextParameterBuilder<'_> {
        TextParameterBuilder::new(&mut self.catalog, group, name)
    }

    /// Stage a virtual parameter
    pub fn add_virtual_parameter(&mut self, vp: VirtualParameter) -> SessionResult<()> {
        self.ensure_open()?;
        self.catalog.register_virtual(vp)
    }

    /// Set a session detail, embedded in the file at close
    ///
    /// Details are part of the staged schema; once the catalog is
    /// committed, further changes go through a reader's update log.
    pub fn add_session_details(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> SessionResult<()> {
        self.ensure_open()?;
        if self.catalog.is_committed() {
            return Err(SessionError::State(
                "session details are fixed once the catalog is committed".to_string(),
            ));
        }
        self.details.set(key, value);
        Ok(())
    }

    /// Validate and freeze the catalog; sample writes may begin
    pub fn commit_parameters(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        self.catalog.commit()?;
        tracing::debug!(
            "Committed catalog for {:?}: {} parameters, {} channels, {} virtuals",
            self.path,
            self.catalog.parameter_count(),
            self.catalog.channel_count(),
            self.catalog.virtual_count()
        );
        Ok(())
    }

    pub fn is_committed(&self) -> bool {
        self.catalog.is_committed()
    }

    /// The staged or committed catalog
    pub fn catalog(&self) -> &ParameterCatalog {
        &self.catalog
    }

    /// Parameters in registration order
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.catalog.parameters()
    }

    /// All channels in registration order
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.catalog.channels()
    }

    /// Append a burst of raw little-endian samples to a channel
    ///
    /// `payload` must hold exactly `sample_count` samples of the
    /// channel's data type. Bursts on one channel must not move
    /// backwards: a new burst starts no earlier than the tick after the
    /// previous burst's last sample.
    pub fn write_periodic_data(
        &mut self,
        channel_id: u32,
        start_time: i64,
        sample_count: usize,
        payload: &[u8],
    ) -> SessionResult<()> {
        self.ensure_writable()?;
        let channel = self.lookup_channel(channel_id)?;
        let expected = sample_count * channel.data_type.size();
        if payload.len() != expected {
            return Err(SessionError::Argument(format!(
                "channel {} burst of {} samples needs {} bytes, got {}",
                channel_id,
                sample_count,
                expected,
                payload.len()
            )));
        }
        let interval = channel.interval;
        self.append_block(channel_id, interval, start_time, sample_count, payload)
    }

    /// Encode and append a burst of values to a channel
    pub fn write_periodic_values(
        &mut self,
        channel_id: u32,
        start_time: i64,
        values: &[f64],
    ) -> SessionResult<()> {
        self.ensure_writable()?;
        let channel = self.lookup_channel(channel_id)?;
        let data_type = channel.data_type;
        let interval = channel.interval;

        let mut payload = Vec::with_capacity(values.len() * data_type.size());
        for value in values {
            data_type.encode_into(*value, &mut payload);
        }
        self.append_block(channel_id, interval, start_time, values.len(), &payload)
    }

    fn append_block(
        &mut self,
        channel_id: u32,
        interval: i64,
        start_time: i64,
        sample_count: usize,
        payload: &[u8],
    ) -> SessionResult<()> {
        if sample_count == 0 {
            return Ok(());
        }
        let sample_count = u32::try_from(sample_count)
            .map_err(|_| SessionError::Argument("burst exceeds u32 sample count".to_string()))?;

        if let Some(&cursor) = self.cursors.get(&channel_id) {
            if start_time < cursor {
                return Err(SessionError::Argument(format!(
                    "channel {} burst at tick {} starts before the end of the previous burst ({})",
                    channel_id, start_time, cursor
                )));
            }
        }

        let offset = self.write_offset;
        let written =
            format::write_block(&mut self.file, channel_id, start_time, sample_count, payload)?;
        self.write_offset += written;

        let last_sample = start_time + (sample_count as i64 - 1) * interval;
        self.blocks.push(BlockRecord {
            channel_id,
            start_time,
            sample_count,
            offset,
            payload_len: payload.len() as u32,
        });
        self.cursors
            .insert(channel_id, start_time + sample_count as i64 * interval);
        self.data_start = Some(self.data_start.map_or(start_time, |s| s.min(start_time)));
        self.data_end = Some(self.data_end.map_or(last_sample, |e| e.max(last_sample)));

        tracing::debug!(
            "Wrote burst: channel={} start={} samples={}",
            channel_id,
            start_time,
            sample_count
        );
        Ok(())
    }

    /// Record a lap mark
    ///
    /// Lap numbers must strictly increase and marks must be added in
    /// time order; equal timestamps are allowed and produce an empty
    /// lap window.
    pub fn add_lap(&mut self, number: u32, timestamp: i64, lap_type: LapType) -> SessionResult<()> {
        self.ensure_open()?;
        if let Some(last) = self.lap_marks.last() {
            if number <= last.number {
                return Err(SessionError::Argument(format!(
                    "lap number {} does not exceed the previous mark ({})",
                    number, last.number
                )));
            }
            if timestamp < last.timestamp {
                return Err(SessionError::Argument(format!(
                    "lap {} at tick {} is earlier than the previous mark ({})",
                    number, timestamp, last.timestamp
                )));
            }
        }
        self.lap_marks.push(LapMark::new(number, lap_type, timestamp));
        Ok(())
    }

    /// Finalize the file: write the catalog and patch the header
    ///
    /// Idempotent; also invoked on drop. The session span is the sampled
    /// extent, falling back to the lap marks, then to zero.
    pub fn close_session(&mut self) -> SessionResult<()> {
        if self.closed {
            return Ok(());
        }

        let (start_time, end_time) = match (self.data_start, self.data_end) {
            (Some(start), Some(end)) => (start, end),
            _ => match (self.lap_marks.first(), self.lap_marks.last()) {
                (Some(first), Some(last)) => (first.timestamp, last.timestamp),
                _ => (0, 0),
            },
        };

        let committed = self.catalog.is_committed();
        if !committed && self.catalog.parameter_count() > 0 {
            tracing::warn!(
                "Closing {:?} with {} uncommitted parameters; they are not persisted",
                self.path,
                self.catalog.parameter_count()
            );
        }
        let record = CatalogRecord {
            parameters: if committed {
                self.catalog
                    .parameters()
                    .map(ParameterRecord::from_parameter)
                    .collect()
            } else {
                Vec::new()
            },
            conversions: if committed {
                self.catalog.conversions().cloned().collect()
            } else {
                Vec::new()
            },
            virtuals: if committed {
                self.catalog.virtual_parameters().cloned().collect()
            } else {
                Vec::new()
            },
            laps: self.lap_marks.clone(),
            details: self.details.to_entries(),
            blocks: self.blocks.clone(),
        };

        let catalog_offset = self.write_offset;
        let catalog_len = format::write_catalog(&mut self.file, &record)?;

        let header = SessionHeader {
            version: format::FORMAT_VERSION,
            block_count: self.blocks.len() as u32,
            start_time,
            end_time,
            catalog_offset,
            catalog_len,
        };
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.to_bytes())?;
        self.file.flush()?;
        self.file.get_ref().sync_all()?;

        self.catalog.seal();
        self.closed = true;
        tracing::info!(
            "Closed session {:?}: {} parameters, {} blocks, {} laps",
            self.path,
            record.parameters.len(),
            record.blocks.len(),
            record.laps.len()
        );
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::State("session is closed".to_string()));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> SessionResult<()> {
        self.ensure_open()?;
        if !self.catalog.is_committed() {
            return Err(SessionError::State(
                "samples may not be written before the catalog is committed".to_string(),
            ));
        }
        Ok(())
    }

    fn lookup_channel(&self, channel_id: u32) -> SessionResult<&Channel> {
        self.catalog
            .channel(channel_id)
            .ok_or_else(|| SessionError::Query(format!("unknown channel id {}", channel_id)))
    }
}

impl Drop for FileSessionWriter {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close_session() {
                tracing::error!("Failed to close session {:?} on drop: {}", self.path, e);
            }
        }
    }
}
