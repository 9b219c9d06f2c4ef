//! Session reader
//!
//! `FileSessionReader` opens closed session files, optionally merging
//! associated sessions recorded alongside the primary (same file stem,
//! `<stem>.<tag>.<nnn>.ssv`). Merging is purely read-side: companion
//! channels are renumbered, tagged with their source, and attached to
//! the primary catalog; no file is ever rewritten.
//!
//! Channel data is decoded to physical values up front, so all queries
//! take `&self`. The only reader-side mutation is the session detail
//! update log, which is saved to a `.sse` side file at close.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::session::conversion::Conversion;
use crate::session::data::DataPoint;
use crate::session::detail::{self, DetailUpdate, SessionDetails};
use crate::session::error::{SessionError, SessionResult};
use crate::session::lap::{Lap, LapIndex};
use crate::session::parameter::{Channel, Parameter, ParameterCatalog};
use crate::session::time::{Frequency, TickRange};
use crate::session::virtual_param::VirtualParameter;

use super::format::{self, ParameterRecord, RawSessionFile};
use super::resample::{self, ChannelSeries, ResampleMode};

/// One associated session file to merge
#[derive(Debug, Clone)]
struct CompanionRef {
    tag: String,
    index: u32,
    path: PathBuf,
}

impl CompanionRef {
    /// Source tag recorded on merged channels
    fn source(&self) -> String {
        format!("{}.{:03}", self.tag, self.index)
    }
}

/// Reads one session, optionally merged with associated sessions
#[derive(Debug)]
pub struct FileSessionReader {
    path: PathBuf,
    catalog: ParameterCatalog,
    series: HashMap<u32, ChannelSeries>,
    laps: LapIndex,
    details: SessionDetails,
    /// Full update log, existing entries plus staged ones at save
    detail_log: Vec<DetailUpdate>,
    start_time: i64,
    end_time: i64,
    closed: bool,
}

impl FileSessionReader {
    /// Open a session on its own
    pub fn open(path: impl AsRef<Path>) -> SessionResult<Self> {
        Self::open_inner(path.as_ref(), Vec::new())
    }

    /// Open a session merged with explicitly named associated sessions
    ///
    /// Names follow `<stem>.<tag>.<nnn>.ssv` and resolve relative to the
    /// primary's directory; a missing file is an error.
    pub fn open_with_associated<P: AsRef<Path>>(
        path: impl AsRef<Path>,
        associated: &[P],
    ) -> SessionResult<Self> {
        let path = path.as_ref();
        let companions = resolve_companions(path, associated)?;
        Self::open_inner(path, companions)
    }

    /// Open a session merged with the latest associated session per tag
    ///
    /// Scans the primary's directory; for each tag only the highest
    /// index is merged.
    pub fn open_with_latest_associated(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let companions = discover_latest(path)?;
        Self::open_inner(path, companions)
    }

    fn open_inner(path: &Path, companions: Vec<CompanionRef>) -> SessionResult<Self> {
        let raw = format::read_session_file(path)?;
        let mut series = decode_channels(&raw)?;

        let parameters: Vec<Parameter> = raw
            .catalog
            .parameters
            .iter()
            .cloned()
            .map(ParameterRecord::into_parameter)
            .collect();
        let mut catalog = ParameterCatalog::from_parts(
            parameters,
            raw.catalog.conversions.clone(),
            raw.catalog.virtuals.clone(),
        )?;

        for companion in &companions {
            merge_companion(&mut catalog, &mut series, companion)?;
        }

        // Catalogued channels without data still answer queries (empty)
        let ids: Vec<(u32, i64)> = catalog.channels().map(|c| (c.id, c.interval)).collect();
        for (id, interval) in ids {
            series
                .entry(id)
                .or_insert_with(|| ChannelSeries::new(interval));
        }

        let mut data_extent: Option<(i64, i64)> = None;
        for channel_series in series.values() {
            if let (Some(first), Some(last)) =
                (channel_series.first_time(), channel_series.last_time())
            {
                data_extent = Some(match data_extent {
                    None => (first, last),
                    Some((start, end)) => (start.min(first), end.max(last)),
                });
            }
        }
        let (start_time, end_time) =
            data_extent.unwrap_or((raw.header.start_time, raw.header.end_time));

        let laps = LapIndex::from_marks(&raw.catalog.laps, end_time);

        let mut details = SessionDetails::from_entries(raw.catalog.details.clone());
        let detail_log = detail::load_update_log(&path.with_extension("sse"))?;
        details.apply_log(&detail_log);

        tracing::info!(
            "Opened session {:?}: {} parameters, {} channels, {} laps, {} associated",
            path,
            catalog.parameter_count(),
            catalog.channel_count(),
            laps.len(),
            companions.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            catalog,
            series,
            laps,
            details,
            detail_log,
            start_time,
            end_time,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First sampled tick (or the span recorded at close)
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Last sampled tick (or the span recorded at close)
    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    /// Parameters in catalog order
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.catalog.parameters()
    }

    pub fn parameter_by_identifier(&self, identifier: &str) -> Option<&Parameter> {
        self.catalog.parameter(identifier)
    }

    /// All channels, following catalog order
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.catalog.channels()
    }

    pub fn channel_by_id(&self, id: u32) -> Option<&Channel> {
        self.catalog.channel(id)
    }

    pub fn conversions(&self) -> impl Iterator<Item = &Conversion> {
        self.catalog.conversions()
    }

    pub fn conversion_by_identifier(&self, identifier: &str) -> Option<&Conversion> {
        self.catalog.conversion(identifier)
    }

    pub fn virtual_parameters(&self) -> impl Iterator<Item = &VirtualParameter> {
        self.catalog.virtual_parameters()
    }

    pub fn virtual_parameter_by_identifier(&self, identifier: &str) -> Option<&VirtualParameter> {
        self.catalog.virtual_parameter(identifier)
    }

    /// Laps with derived windows, ordered by start tick
    pub fn laps(&self) -> &[Lap] {
        self.laps.laps()
    }

    /// Session details in insertion order, update log applied
    pub fn session_items(&self) -> impl Iterator<Item = (&String, &String)> {
        self.details.iter()
    }

    pub fn session_detail(&self, key: &str) -> Option<&str> {
        self.details.get(key)
    }

    /// Raw samples of a parameter's primary channel within a window
    ///
    /// Values are physical; text parameters carry decoded labels. For a
    /// virtual parameter this evaluates its expression instead.
    pub fn get_samples(
        &self,
        identifier: &str,
        start_time: i64,
        end_time: i64,
    ) -> SessionResult<Vec<DataPoint>> {
        let range = self.query_window(start_time, end_time)?;
        if let Some(vp) = self.catalog.virtual_parameter(identifier) {
            return self.evaluate_virtual(vp, range);
        }
        let parameter = self.lookup_parameter(identifier)?;
        let channel = primary_channel(parameter)?;
        let points = match self.series.get(&channel.id) {
            Some(series) => series.samples_in(range),
            None => Vec::new(),
        };
        Ok(self.to_data_points(parameter, points))
    }

    /// Raw samples of one specific channel of a parameter
    pub fn get_channel_samples(
        &self,
        identifier: &str,
        channel_id: u32,
        start_time: i64,
        end_time: i64,
    ) -> SessionResult<Vec<DataPoint>> {
        let range = self.query_window(start_time, end_time)?;
        let parameter = self.lookup_parameter(identifier)?;
        if parameter.channel(channel_id).is_none() {
            return Err(SessionError::Query(format!(
                "channel {} does not belong to parameter {}",
                channel_id, identifier
            )));
        }
        let points = match self.series.get(&channel_id) {
            Some(series) => series.samples_in(range),
            None => Vec::new(),
        };
        Ok(self.to_data_points(parameter, points))
    }

    /// Resample a parameter onto a fixed output grid
    ///
    /// The grid is anchored at `start_time` with the target interval;
    /// both window ends are inclusive. With `interpolate`, numeric
    /// parameters interpolate linearly and text parameters take the
    /// nearest sample; without it, values hold from the previous sample.
    /// A merged parameter contributes samples from all its channels.
    pub fn get_data(
        &self,
        identifier: &str,
        start_time: i64,
        end_time: i64,
        frequency: Frequency,
        interpolate: bool,
    ) -> SessionResult<Vec<DataPoint>> {
        let range = self.query_window(start_time, end_time)?;
        if !frequency.is_valid() {
            return Err(SessionError::Query(
                "target frequency must be positive".to_string(),
            ));
        }

        if let Some(vp) = self.catalog.virtual_parameter(identifier) {
            let full = TickRange::new(
                self.start_time.min(range.start),
                self.end_time.max(range.end),
            );
            let evaluated = self.evaluate_virtual(vp, full)?;
            let points: Vec<(i64, f64)> =
                evaluated.into_iter().map(|p| (p.timestamp, p.value)).collect();
            let mode = if interpolate {
                ResampleMode::Linear
            } else {
                ResampleMode::Hold
            };
            let out = resample::resample(&points, range, frequency.interval(), mode);
            return Ok(out
                .into_iter()
                .map(|(t, v)| DataPoint::new(t, v))
                .collect());
        }

        let parameter = self.lookup_parameter(identifier)?;
        let points = self.parameter_points(parameter);
        let conversion = self.catalog.conversion(&parameter.conversion);
        let mode = match (interpolate, conversion.map(|c| c.is_lookup())) {
            (false, _) => ResampleMode::Hold,
            (true, Some(true)) => ResampleMode::Nearest,
            (true, _) => ResampleMode::Linear,
        };
        let out = resample::resample(&points, range, frequency.interval(), mode);
        Ok(self.to_data_points(parameter, out))
    }

    /// Resample one specific channel of a parameter
    pub fn get_channel_data(
        &self,
        identifier: &str,
        channel_id: u32,
        start_time: i64,
        end_time: i64,
        frequency: Frequency,
        interpolate: bool,
    ) -> SessionResult<Vec<DataPoint>> {
        let range = self.query_window(start_time, end_time)?;
        if !frequency.is_valid() {
            return Err(SessionError::Query(
                "target frequency must be positive".to_string(),
            ));
        }
        let parameter = self.lookup_parameter(identifier)?;
        if parameter.channel(channel_id).is_none() {
            return Err(SessionError::Query(format!(
                "channel {} does not belong to parameter {}",
                channel_id, identifier
            )));
        }
        let points = match self.series.get(&channel_id) {
            Some(series) => series.all_samples(),
            None => Vec::new(),
        };
        let conversion = self.catalog.conversion(&parameter.conversion);
        let mode = match (interpolate, conversion.map(|c| c.is_lookup())) {
            (false, _) => ResampleMode::Hold,
            (true, Some(true)) => ResampleMode::Nearest,
            (true, _) => ResampleMode::Linear,
        };
        let out = resample::resample(&points, range, frequency.interval(), mode);
        Ok(self.to_data_points(parameter, out))
    }

    /// Stage one session detail update
    pub fn update_session_detail(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> SessionResult<()> {
        self.ensure_open()?;
        self.details.update(key, value);
        Ok(())
    }

    /// Stage several session detail updates, matched by position
    pub fn update_session_details<K, V>(&mut self, keys: &[K], values: &[V]) -> SessionResult<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.ensure_open()?;
        self.details.update_many(keys, values)
    }

    /// Persist staged detail updates to the `.sse` side file
    ///
    /// Idempotent; also invoked on drop. With nothing staged this writes
    /// nothing.
    pub fn close_session(&mut self) -> SessionResult<()> {
        if self.closed {
            return Ok(());
        }
        if self.details.has_pending() {
            let pending = self.details.take_pending();
            self.detail_log.extend(pending);
            let sse_path = self.path.with_extension("sse");
            detail::save_update_log(&sse_path, &self.detail_log)?;
            tracing::info!(
                "Saved {} detail updates to {:?}",
                self.detail_log.len(),
                sse_path
            );
        }
        self.closed = true;
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

    fn query_window(&self, start_time: i64, end_time: i64) -> SessionResult<TickRange> {
        let range = TickRange::try_new(start_time, end_time).ok_or_else(|| {
            SessionError::Query(format!(
                "inverted query window: start {} after end {}",
                start_time, end_time
            ))
        })?;
        if range.start > self.end_time || range.end < self.start_time {
            return Err(SessionError::Query(format!(
                "window [{}, {}] is outside the session span [{}, {}]",
                range.start, range.end, self.start_time, self.end_time
            )));
        }
        Ok(range)
    }

    fn lookup_parameter(&self, identifier: &str) -> SessionResult<&Parameter> {
        self.catalog
            .parameter(identifier)
            .ok_or_else(|| SessionError::Query(format!("no parameter named {}", identifier)))
    }

    /// Samples of all channels of a parameter, merge-sorted by tick
    /// (catalog order breaks ties)
    fn parameter_points(&self, parameter: &Parameter) -> Vec<(i64, f64)> {
        if parameter.channel_count() == 1 {
            return match parameter
                .primary_channel()
                .and_then(|c| self.series.get(&c.id))
            {
                Some(series) => series.all_samples(),
                None => Vec::new(),
            };
        }
        let mut tagged: Vec<(i64, usize, f64)> = Vec::new();
        for (order, channel) in parameter.channels().enumerate() {
            if let Some(series) = self.series.get(&channel.id) {
                for (tick, value) in series.all_samples() {
                    tagged.push((tick, order, value));
                }
            }
        }
        tagged.sort_by_key(|&(tick, order, _)| (tick, order));
        tagged.into_iter().map(|(tick, _, value)| (tick, value)).collect()
    }

    fn to_data_points(&self, parameter: &Parameter, points: Vec<(i64, f64)>) -> Vec<DataPoint> {
        let conversion = self.catalog.conversion(&parameter.conversion);
        points
            .into_iter()
            .map(|(timestamp, value)| DataPoint {
                timestamp,
                value,
                label: conversion.and_then(|c| c.label_for(value)),
            })
            .collect()
    }

    /// Evaluate a virtual parameter over the laps intersecting `range`
    ///
    /// The grid restarts at each lap start and steps at the coarsest
    /// source interval; with no laps the whole session is one window.
    fn evaluate_virtual(
        &self,
        vp: &VirtualParameter,
        range: TickRange,
    ) -> SessionResult<Vec<DataPoint>> {
        let mut sources: HashMap<String, Vec<(i64, f64)>> = HashMap::new();
        let mut eval_interval = 0i64;
        for identifier in vp.source_identifiers() {
            let parameter = self.catalog.parameter(&identifier).ok_or_else(|| {
                SessionError::Query(format!(
                    "virtual parameter {} references missing parameter {}",
                    vp.identifier, identifier
                ))
            })?;
            let channel = primary_channel(parameter)?;
            eval_interval = eval_interval.max(channel.interval);
            let points = self
                .series
                .get(&channel.id)
                .map(|s| s.all_samples())
                .unwrap_or_default();
            sources.insert(identifier, points);
        }
        if eval_interval <= 0 {
            return Err(SessionError::Query(format!(
                "virtual parameter {} has no usable source channels",
                vp.identifier
            )));
        }

        let windows: Vec<(i64, i64, u32)> = if self.laps.is_empty() {
            vec![(self.start_time, self.end_time + 1, 0)]
        } else {
            self.laps
                .laps()
                .iter()
                .map(|lap| (lap.start_time, lap.end_time, lap.number))
                .collect()
        };

        let mut out = Vec::new();
        for (window_start, window_end, lap_number) in windows {
            let mut tick = window_start;
            while tick < window_end && tick <= range.end {
                if tick >= range.start {
                    let resolve = |id: &str| {
                        sources
                            .get(id)
                            .and_then(|points| resample::hold_at(points, tick))
                            .unwrap_or(f64::NAN)
                    };
                    let value = vp.expr.evaluate(&resolve, lap_number as f64);
                    out.push(DataPoint::new(tick, value));
                }
                tick += eval_interval;
            }
        }
        Ok(out)
    }
}

impl Drop for FileSessionReader {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close_session() {
                tracing::error!("Failed to close session {:?} on drop: {}", self.path, e);
            }
        }
    }
}

fn primary_channel(parameter: &Parameter) -> SessionResult<&Channel> {
    parameter.primary_channel().ok_or_else(|| {
        SessionError::Corruption(format!("parameter {} has no channels", parameter.identifier))
    })
}

/// Decode a file's blocks into physical-value series, keyed by the
/// file's own channel ids
fn decode_channels(raw: &RawSessionFile) -> SessionResult<HashMap<u32, ChannelSeries>> {
    let conversions: HashMap<&str, &Conversion> = raw
        .catalog
        .conversions
        .iter()
        .map(|c| (c.identifier.as_str(), c))
        .collect();

    let mut meta: HashMap<u32, (crate::session::data::DataType, i64, &Conversion)> =
        HashMap::new();
    for record in &raw.catalog.parameters {
        let conversion = conversions.get(record.conversion.as_str()).ok_or_else(|| {
            SessionError::Corruption(format!(
                "parameter {} references missing conversion {}",
                record.identifier, record.conversion
            ))
        })?;
        for channel in &record.channels {
            meta.insert(channel.id, (channel.data_type, channel.interval, conversion));
        }
    }

    let mut series: HashMap<u32, ChannelSeries> = HashMap::new();
    for (record, payload) in raw.catalog.blocks.iter().zip(&raw.payloads) {
        let &(data_type, interval, conversion) =
            meta.get(&record.channel_id).ok_or_else(|| {
                SessionError::Corruption(format!(
                    "block references unknown channel {}",
                    record.channel_id
                ))
            })?;
        let decoded = data_type.decode_all(payload);
        if decoded.len() != record.sample_count as usize {
            return Err(SessionError::Corruption(format!(
                "channel {} block decodes to {} samples, expected {}",
                record.channel_id,
                decoded.len(),
                record.sample_count
            )));
        }
        let physical: Vec<f64> = decoded.into_iter().map(|v| conversion.apply(v)).collect();
        series
            .entry(record.channel_id)
            .or_insert_with(|| ChannelSeries::new(interval))
            .push_burst(record.start_time, physical);
    }
    Ok(series)
}

/// Merge one companion file into the catalog and series map
fn merge_companion(
    catalog: &mut ParameterCatalog,
    series: &mut HashMap<u32, ChannelSeries>,
    companion: &CompanionRef,
) -> SessionResult<()> {
    let raw = format::read_session_file(&companion.path)?;
    let mut companion_series = decode_channels(&raw)?;
    let source = companion.source();

    for record in &raw.catalog.parameters {
        let conversion = raw
            .catalog
            .conversions
            .iter()
            .find(|c| c.identifier == record.conversion)
            .cloned()
            .ok_or_else(|| {
                SessionError::Corruption(format!(
                    "parameter {} references missing conversion {}",
                    record.identifier, record.conversion
                ))
            })?;

        let mut remapped = Vec::with_capacity(record.channels.len());
        for channel in &record.channels {
            let old_id = channel.id;
            let mut channel = channel.clone();
            channel.id = catalog.allocate_channel_id();
            channel.data_source = source.clone();
            let channel_series = companion_series
                .remove(&old_id)
                .unwrap_or_else(|| ChannelSeries::new(channel.interval));
            series.insert(channel.id, channel_series);
            remapped.push(channel);
        }

        if catalog.parameter(&record.identifier).is_some() {
            for channel in remapped {
                catalog.attach_channel(&record.identifier, channel);
            }
        } else {
            let parameter = Parameter::from_parts(
                record.identifier.clone(),
                record.name.clone(),
                record.group.clone(),
                record.sub_groups.clone(),
                record.description.clone(),
                record.units.clone(),
                record.conversion.clone(),
                remapped,
            );
            catalog.adopt_parameter(parameter, conversion);
        }
    }

    tracing::debug!(
        "Merged associated session {:?} as {}",
        companion.path,
        source
    );
    Ok(())
}

/// Parse `<stem>.<tag>.<nnn>.ssv` against a primary file stem
fn parse_companion_name(primary_stem: &str, file_name: &str) -> Option<(String, u32)> {
    let rest = file_name.strip_suffix(".ssv")?;
    let rest = rest.strip_prefix(primary_stem)?;
    let rest = rest.strip_prefix('.')?;
    let (tag, index) = rest.rsplit_once('.')?;
    if tag.is_empty() || index.len() != 3 {
        return None;
    }
    let index: u32 = index.parse().ok()?;
    Some((tag.to_string(), index))
}

fn primary_stem(path: &Path) -> SessionResult<&str> {
    path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
        SessionError::Argument(format!("session path {:?} has no usable file stem", path))
    })
}

fn resolve_companions<P: AsRef<Path>>(
    path: &Path,
    associated: &[P],
) -> SessionResult<Vec<CompanionRef>> {
    let stem = primary_stem(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    associated
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let file_name = name
                .file_name()
                .and_then(|s| s.to_str())
                .ok_or_else(|| {
                    SessionError::Argument(format!("associated path {:?} has no file name", name))
                })?;
            let (tag, index) = parse_companion_name(stem, file_name).ok_or_else(|| {
                SessionError::Argument(format!(
                    "associated file {} does not match <session>.<tag>.<nnn>.ssv",
                    file_name
                ))
            })?;
            let path = if name.is_absolute() {
                name.to_path_buf()
            } else {
                dir.join(name)
            };
            Ok(CompanionRef { tag, index, path })
        })
        .collect()
}

/// Scan the primary's directory for the highest-indexed companion per tag
fn discover_latest(path: &Path) -> SessionResult<Vec<CompanionRef>> {
    let stem = primary_stem(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut latest: HashMap<String, CompanionRef> = HashMap::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some((tag, index)) = parse_companion_name(stem, file_name) else {
            continue;
        };
        let keep = match latest.get(&tag) {
            Some(existing) => index > existing.index,
            None => true,
        };
        if keep {
            latest.insert(
                tag.clone(),
                CompanionRef {
                    tag,
                    index,
                    path: entry.path(),
                },
            );
        }
    }

    let mut companions: Vec<CompanionRef> = latest.into_values().collect();
    companions.sort_by(|a, b| a.tag.cmp(&b.tag));
    Ok(companions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::data::{DataType, PhysicalRange};
    use crate::session::lap::LapType;
    use crate::session::time::TICKS_PER_SECOND;
    use crate::session::virtual_param::{VirtualExpr, VirtualParameter};
    use crate::store::writer::FileSessionWriter;
    use std::fs::File;
    use std::io::Write as _;
    use tempfile::tempdir;

    // A ten-minute session starting at 09:00:00
    const SESSION_START: i64 = 32_400_000_000_000;
    const SESSION_END: i64 = 33_000_000_000_000;
    const SAMPLE_INTERVAL: i64 = 100_000_000; // 10 Hz
    const LAP_LENGTH: i64 = 60 * TICKS_PER_SECOND;

    fn write_bursts(
        writer: &mut FileSessionWriter,
        channel_id: u32,
        count: usize,
        value: impl Fn(usize) -> f64,
    ) {
        let mut written = 0;
        while written < count {
            let burst = 1000.min(count - written);
            let values: Vec<f64> = (written..written + burst).map(&value).collect();
            let start = SESSION_START + written as i64 * SAMPLE_INTERVAL;
            writer
                .write_periodic_values(channel_id, start, &values)
                .unwrap();
            written += burst;
        }
    }

    /// Speed ramp plus a DRS flag, nine laps, two details
    fn write_demo_session(path: &Path) {
        let mut writer = FileSessionWriter::create(path).unwrap();
        writer.add_session_details("Driver", "OP").unwrap();
        writer.add_session_details("Track", "Silverstone").unwrap();

        writer
            .build_rational_parameter("Chassis", "vCar", PhysicalRange::new(0.0, 400.0))
            .units("kph")
            .on_periodic_channel(Frequency::hz(10.0))
            .add_to_session()
            .unwrap();
        writer
            .build_text_parameter("Aero", "DrsOpen")
            .add_lookup(0.0, "NO")
            .add_lookup(1.0, "YES")
            .default_value("NO")
            .on_periodic_channel(Frequency::hz(10.0))
            .add_to_session()
            .unwrap();
        writer.commit_parameters().unwrap();

        // 6001 samples per channel cover the full ten minutes
        write_bursts(&mut writer, 1, 6001, |i| i as f64);
        write_bursts(&mut writer, 2, 6001, |i| ((i / 100) % 2) as f64);

        writer.add_lap(1, SESSION_START, LapType::OutLap).unwrap();
        for lap in 2..=8u32 {
            writer
                .add_lap(lap, SESSION_START + (lap as i64 - 1) * LAP_LENGTH, LapType::Default)
                .unwrap();
        }
        writer
            .add_lap(9, SESSION_START + 8 * LAP_LENGTH, LapType::InLap)
            .unwrap();
        writer.close_session().unwrap();
    }

    /// A companion carrying vCar at the given rate, values offset by `base`
    fn write_companion(path: &Path, hz: f64, base: f64) {
        let mut writer = FileSessionWriter::create(path).unwrap();
        writer
            .build_rational_parameter("Chassis", "vCar", PhysicalRange::new(0.0, 400.0))
            .units("kph")
            .on_periodic_channel(Frequency::hz(hz))
            .add_to_session()
            .unwrap();
        writer.commit_parameters().unwrap();

        let interval = Frequency::hz(hz).interval();
        let count = ((SESSION_END - SESSION_START) / interval) as usize + 1;
        let values: Vec<f64> = (0..count).map(|i| base + i as f64).collect();
        writer
            .write_periodic_values(1, SESSION_START, &values)
            .unwrap();
        writer.close_session().unwrap();
    }

    #[test]
    fn test_reopen_restores_catalog_and_span() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quali.ssn");
        write_demo_session(&path);

        let reader = FileSessionReader::open(&path).unwrap();
        assert_eq!(reader.start_time(), SESSION_START);
        assert_eq!(reader.end_time(), SESSION_END);
        assert_eq!(reader.parameters().count(), 2);

        let vcar = reader.parameter_by_identifier("vCar:Chassis").unwrap();
        assert_eq!(vcar.units, "kph");
        assert_eq!(vcar.group, "Chassis");
        let channel = vcar.primary_channel().unwrap();
        assert_eq!(channel.interval, SAMPLE_INTERVAL);
        assert_eq!(channel.data_source, "primary");

        let drs_conv = reader
            .conversion_by_identifier("DrsOpen:Aero.conv")
            .unwrap();
        assert!(drs_conv.is_lookup());

        let details: Vec<_> = reader.session_items().collect();
        assert_eq!(details[0], (&"Driver".to_string(), &"OP".to_string()));
        assert_eq!(reader.session_detail("Track"), Some("Silverstone"));

        let laps = reader.laps();
        assert_eq!(laps.len(), 9);
        assert_eq!(laps[0].lap_type, LapType::OutLap);
        assert_eq!(laps[0].start_time, SESSION_START);
        assert_eq!(laps[0].end_time, SESSION_START + LAP_LENGTH);
        assert_eq!(laps[8].lap_type, LapType::InLap);
        assert_eq!(laps[8].end_time, SESSION_END);
    }

    #[test]
    fn test_get_samples_full_span_and_window() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quali.ssn");
        write_demo_session(&path);
        let reader = FileSessionReader::open(&path).unwrap();

        let samples = reader
            .get_samples("vCar:Chassis", SESSION_START, SESSION_END)
            .unwrap();
        assert_eq!(samples.len(), 6001);
        assert_eq!(samples[0].timestamp, SESSION_START);
        assert_eq!(samples[0].value, 0.0);
        assert!(samples[0].label.is_none());
        assert_eq!(samples[1].timestamp, SESSION_START + SAMPLE_INTERVAL);
        assert_eq!(samples[6000].timestamp, SESSION_END);
        assert_eq!(samples[6000].value, 6000.0);

        // Both window ends are inclusive
        let window = reader
            .get_samples(
                "vCar:Chassis",
                SESSION_START + TICKS_PER_SECOND,
                SESSION_START + 2 * TICKS_PER_SECOND,
            )
            .unwrap();
        assert_eq!(window.len(), 11);
        assert_eq!(window[0].value, 10.0);
        assert_eq!(window[10].value, 20.0);
    }

    #[test]
    fn test_ten_channel_session_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("endurance.ssn");

        let mut writer = FileSessionWriter::create(&path).unwrap();
        for (group, name) in [
            ("Chassis", "aSteer"),
            ("Chassis", "gLat"),
            ("Chassis", "gLong"),
            ("Power", "rThrottle"),
            ("Hydraulics", "pBrake"),
        ] {
            writer
                .build_rational_parameter(group, name, PhysicalRange::new(-100.0, 100.0))
                .on_periodic_channel(Frequency::hz(10.0))
                .add_to_session()
                .unwrap();
        }
        for (group, name) in [
            ("Aero", "DrsOpen"),
            ("Power", "BPitLimiter"),
            ("Power", "BOvertake"),
        ] {
            writer
                .build_text_parameter(group, name)
                .add_lookup(0.0, "NO")
                .add_lookup(1.0, "YES")
                .default_value("NO")
                .on_periodic_channel(Frequency::hz(10.0))
                .add_to_session()
                .unwrap();
        }
        for (group, name) in [("Power", "NMode"), ("Hydraulics", "NBrakeMap")] {
            writer
                .build_text_parameter(group, name)
                .add_lookup(1.0, "One")
                .add_lookup(2.0, "Two")
                .add_lookup(3.0, "Three")
                .add_lookup(4.0, "Four")
                .default_value("One")
                .physical_range(PhysicalRange::new(1.0, 4.0))
                .on_periodic_channel_as(Frequency::hz(10.0), DataType::Signed8)
                .add_to_session()
                .unwrap();
        }
        writer.commit_parameters().unwrap();

        for channel in 1..=5u32 {
            write_bursts(&mut writer, channel, 6001, |i| (i % 201) as f64 - 100.0);
        }
        for channel in 6..=8u32 {
            write_bursts(&mut writer, channel, 6001, |i| ((i / 50) % 2) as f64);
        }
        for channel in 9..=10u32 {
            write_bursts(&mut writer, channel, 6001, |i| (i % 4 + 1) as f64);
        }
        writer.close_session().unwrap();

        let reader = FileSessionReader::open(&path).unwrap();
        assert_eq!(reader.parameters().count(), 10);
        assert_eq!(reader.channels().count(), 10);
        assert_eq!(reader.conversions().count(), 10);
        assert_eq!(reader.start_time(), SESSION_START);
        assert_eq!(reader.end_time(), SESSION_END);

        let mut ids: Vec<u32> = reader.channels().map(|c| c.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());

        let steer = reader.parameter_by_identifier("aSteer:Chassis").unwrap();
        assert_eq!(
            steer.primary_channel().unwrap().data_type,
            DataType::Float32
        );
        let drs = reader.parameter_by_identifier("DrsOpen:Aero").unwrap();
        assert_eq!(
            drs.primary_channel().unwrap().data_type,
            DataType::Unsigned8
        );
        let mode = reader.parameter_by_identifier("NMode:Power").unwrap();
        assert_eq!(mode.primary_channel().unwrap().data_type, DataType::Signed8);

        // Explicit range override survives; binary lookups derive theirs
        let mode_conv = reader.conversion_by_identifier("NMode:Power.conv").unwrap();
        assert_eq!(mode_conv.physical_range, PhysicalRange::new(1.0, 4.0));
        let drs_conv = reader.conversion_by_identifier("DrsOpen:Aero.conv").unwrap();
        assert_eq!(drs_conv.physical_range, PhysicalRange::new(0.0, 1.0));

        for parameter in reader.parameters() {
            let samples = reader
                .get_samples(&parameter.identifier, SESSION_START, SESSION_END)
                .unwrap();
            assert_eq!(samples.len(), 6001, "{}", parameter.identifier);
        }

        let modes = reader
            .get_samples(
                "NMode:Power",
                SESSION_START,
                SESSION_START + 3 * SAMPLE_INTERVAL,
            )
            .unwrap();
        let labels: Vec<_> = modes
            .iter()
            .map(|p| p.label.as_deref().unwrap())
            .collect();
        assert_eq!(labels, ["One", "Two", "Three", "Four"]);
    }

    #[test]
    fn test_query_window_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quali.ssn");
        write_demo_session(&path);
        let reader = FileSessionReader::open(&path).unwrap();

        let err = reader
            .get_samples("nGear:Gearbox", SESSION_START, SESSION_END)
            .unwrap_err();
        assert!(matches!(err, SessionError::Query(_)));

        let err = reader
            .get_samples("vCar:Chassis", SESSION_END, SESSION_START)
            .unwrap_err();
        assert!(matches!(err, SessionError::Query(_)));

        // Entirely before the session
        let err = reader.get_samples("vCar:Chassis", 0, 1000).unwrap_err();
        assert!(matches!(err, SessionError::Query(_)));

        let err = reader
            .get_data(
                "vCar:Chassis",
                SESSION_START,
                SESSION_END,
                Frequency::from_interval(0),
                true,
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::Query(_)));

        // Overlapping one end is fine
        let samples = reader
            .get_samples("vCar:Chassis", 0, SESSION_START)
            .unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_get_data_native_rate_reproduces_samples() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quali.ssn");
        write_demo_session(&path);
        let reader = FileSessionReader::open(&path).unwrap();

        let data = reader
            .get_data(
                "vCar:Chassis",
                SESSION_START,
                SESSION_END,
                Frequency::hz(10.0),
                true,
            )
            .unwrap();
        assert_eq!(data.len(), 6001);
        assert_eq!(data[0].value, 0.0);
        assert_eq!(data[3000].value, 3000.0);
        assert_eq!(data[6000].value, 6000.0);
    }

    #[test]
    fn test_get_data_resamples_coarser_and_finer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quali.ssn");
        write_demo_session(&path);
        let reader = FileSessionReader::open(&path).unwrap();

        // 1 Hz grid ticks land exactly on every tenth sample
        let coarse = reader
            .get_data(
                "vCar:Chassis",
                SESSION_START,
                SESSION_END,
                Frequency::hz(1.0),
                true,
            )
            .unwrap();
        assert_eq!(coarse.len(), 601);
        assert_eq!(coarse[1].value, 10.0);
        assert_eq!(coarse[600].value, 6000.0);

        // 100 Hz over ten seconds interpolates between samples
        let fine = reader
            .get_data(
                "vCar:Chassis",
                SESSION_START,
                SESSION_START + 10 * TICKS_PER_SECOND,
                Frequency::hz(100.0),
                true,
            )
            .unwrap();
        assert_eq!(fine.len(), 1001);
        assert_eq!(fine[5].timestamp, SESSION_START + 50_000_000);
        assert_eq!(fine[5].value, 0.5);

        // Hold keeps the previous value instead
        let held = reader
            .get_data(
                "vCar:Chassis",
                SESSION_START,
                SESSION_START + 10 * TICKS_PER_SECOND,
                Frequency::hz(100.0),
                false,
            )
            .unwrap();
        assert_eq!(held[5].value, 0.0);
        assert_eq!(held[10].value, 1.0);
    }

    #[test]
    fn test_get_data_millisecond_grid_over_full_span() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quali.ssn");
        write_demo_session(&path);
        let reader = FileSessionReader::open(&path).unwrap();

        let data = reader
            .get_data(
                "vCar:Chassis",
                SESSION_START,
                SESSION_END,
                Frequency::khz(1.0),
                true,
            )
            .unwrap();
        assert_eq!(data.len(), 600_001);
    }

    #[test]
    fn test_text_parameter_takes_nearest_code_and_labels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quali.ssn");
        write_demo_session(&path);
        let reader = FileSessionReader::open(&path).unwrap();

        let samples = reader
            .get_samples(
                "DrsOpen:Aero",
                SESSION_START,
                SESSION_START + 15 * TICKS_PER_SECOND,
            )
            .unwrap();
        assert_eq!(samples[0].value, 0.0);
        assert_eq!(samples[0].label.as_deref(), Some("NO"));
        assert_eq!(samples[120].value, 1.0);
        assert_eq!(samples[120].label.as_deref(), Some("YES"));

        // Finer grid never interpolates a text code
        let data = reader
            .get_data(
                "DrsOpen:Aero",
                SESSION_START,
                SESSION_START + 20 * TICKS_PER_SECOND,
                Frequency::hz(20.0),
                true,
            )
            .unwrap();
        assert_eq!(data.len(), 401);
        for point in &data {
            assert!(point.value == 0.0 || point.value == 1.0);
        }
        // Halfway between code 0 and code 1 the earlier sample wins
        assert_eq!(data[199].timestamp, SESSION_START + 9_950_000_000);
        assert_eq!(data[199].value, 0.0);
        assert_eq!(data[199].label.as_deref(), Some("NO"));
        assert_eq!(data[200].value, 1.0);
        assert_eq!(data[200].label.as_deref(), Some("YES"));
    }

    #[test]
    fn test_merge_latest_associated_sessions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stint.ssn");
        write_demo_session(&path);
        write_companion(&dir.path().join("stint.VTS.001.ssv"), 1.0, 1000.0);
        write_companion(&dir.path().join("stint.VTS.002.ssv"), 2.0, 2000.0);
        write_companion(&dir.path().join("stint.GPS.001.ssv"), 5.0, 500.0);

        let reader = FileSessionReader::open_with_latest_associated(&path).unwrap();
        let vcar = reader.parameter_by_identifier("vCar:Chassis").unwrap();
        assert_eq!(vcar.channel_count(), 3);

        let sources: Vec<_> = vcar.channels().map(|c| c.data_source.clone()).collect();
        assert!(sources.contains(&"primary".to_string()));
        assert!(sources.contains(&"GPS.001".to_string()));
        assert!(sources.contains(&"VTS.002".to_string()));
        assert!(!sources.contains(&"VTS.001".to_string()));

        // Renumbered ids stay unique across the merged catalog
        let mut ids: Vec<u32> = reader.channels().map(|c| c.id).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);

        // Primary is still the fastest channel
        assert_eq!(vcar.primary_channel().unwrap().data_source, "primary");
        // The slowest merged channel sets the whole-parameter rate
        assert_eq!(vcar.max_interval(), Frequency::hz(2.0).interval());
        assert_eq!(vcar.merged_frequency().as_hz(), 2.0);

        let gps_id = vcar
            .channels()
            .find(|c| c.data_source == "GPS.001")
            .unwrap()
            .id;
        let gps = reader
            .get_channel_samples(
                "vCar:Chassis",
                gps_id,
                SESSION_START,
                SESSION_START + 10 * TICKS_PER_SECOND,
            )
            .unwrap();
        assert_eq!(gps.len(), 51);
        assert_eq!(gps[0].value, 500.0);
        assert_eq!(gps[50].value, 550.0);

        // Whole-parameter resample draws on every channel
        let merged = reader
            .get_data(
                "vCar:Chassis",
                SESSION_START,
                SESSION_END,
                vcar.merged_frequency(),
                true,
            )
            .unwrap();
        assert_eq!(merged.len(), 1201);
    }

    #[test]
    fn test_merge_six_companions_yields_seven_channels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stint.ssn");
        write_demo_session(&path);
        for (tag, hz) in [
            ("ECU", 5.0),
            ("GPS", 4.0),
            ("IMU", 8.0),
            ("PIT", 1.0),
            ("TYR", 2.0),
            ("VTS", 5.0),
        ] {
            write_companion(&dir.path().join(format!("stint.{}.001.ssv", tag)), hz, 0.0);
        }

        let reader = FileSessionReader::open_with_latest_associated(&path).unwrap();
        let vcar = reader.parameter_by_identifier("vCar:Chassis").unwrap();
        assert_eq!(vcar.channel_count(), 7);

        let sources: Vec<_> = vcar.channels().map(|c| c.data_source.clone()).collect();
        for tag in [
            "primary", "ECU.001", "GPS.001", "IMU.001", "PIT.001", "TYR.001", "VTS.001",
        ] {
            assert!(sources.contains(&tag.to_string()), "{}", tag);
        }

        // Slowest companion sets the merged rate
        assert_eq!(vcar.merged_frequency().as_hz(), 1.0);
        assert_eq!(vcar.primary_channel().unwrap().data_source, "primary");

        let merged = reader
            .get_data(
                "vCar:Chassis",
                SESSION_START,
                SESSION_END,
                vcar.merged_frequency(),
                true,
            )
            .unwrap();
        assert_eq!(merged.len(), 601);
    }

    #[test]
    fn test_merge_adopts_new_parameters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stint.ssn");
        write_demo_session(&path);

        let companion_path = dir.path().join("stint.HYD.001.ssv");
        let mut writer = FileSessionWriter::create(&companion_path).unwrap();
        writer
            .build_rational_parameter("Hydraulics", "pBrake", PhysicalRange::new(0.0, 250.0))
            .units("bar")
            .on_periodic_channel(Frequency::hz(2.0))
            .add_to_session()
            .unwrap();
        writer.commit_parameters().unwrap();
        writer
            .write_periodic_values(1, SESSION_START, &[10.0, 20.0, 30.0])
            .unwrap();
        writer.close_session().unwrap();

        let reader = FileSessionReader::open_with_latest_associated(&path).unwrap();
        assert_eq!(reader.parameters().count(), 3);

        let brake = reader.parameter_by_identifier("pBrake:Hydraulics").unwrap();
        assert_eq!(brake.units, "bar");
        let channel = brake.primary_channel().unwrap();
        assert_eq!(channel.data_source, "HYD.001");
        assert!(reader
            .conversion_by_identifier("pBrake:Hydraulics.conv")
            .is_some());

        let samples = reader
            .get_samples(
                "pBrake:Hydraulics",
                SESSION_START,
                SESSION_START + 2 * TICKS_PER_SECOND,
            )
            .unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[2].value, 30.0);
    }

    #[test]
    fn test_open_with_explicit_associated_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stint.ssn");
        write_demo_session(&path);
        write_companion(&dir.path().join("stint.VTS.001.ssv"), 1.0, 1000.0);
        write_companion(&dir.path().join("stint.VTS.002.ssv"), 2.0, 2000.0);

        // The explicit list wins over the latest index
        let reader =
            FileSessionReader::open_with_associated(&path, &["stint.VTS.001.ssv"]).unwrap();
        let vcar = reader.parameter_by_identifier("vCar:Chassis").unwrap();
        let sources: Vec<_> = vcar.channels().map(|c| c.data_source.clone()).collect();
        assert!(sources.contains(&"VTS.001".to_string()));
        assert!(!sources.contains(&"VTS.002".to_string()));

        let err =
            FileSessionReader::open_with_associated(&path, &["stint.XXX.001.ssv"]).unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));

        let err = FileSessionReader::open_with_associated(&path, &["whatever.ssv"]).unwrap_err();
        assert!(matches!(err, SessionError::Argument(_)));
    }

    #[test]
    fn test_open_rejects_unclosed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crashed.ssn");

        // Header only, never closed
        let mut file = File::create(&path).unwrap();
        file.write_all(&super::super::format::SessionHeader::new().to_bytes())
            .unwrap();
        drop(file);

        let err = FileSessionReader::open(&path).unwrap_err();
        assert!(matches!(err, SessionError::Corruption(_)));
    }

    #[test]
    fn test_detail_updates_accumulate_in_side_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("race.ssn");
        write_demo_session(&path);
        let sse_path = path.with_extension("sse");

        let mut first = FileSessionReader::open(&path).unwrap();
        first.update_session_detail("Driver", "LN").unwrap();
        first
            .update_session_details(&["Weather"], &["Wet"])
            .unwrap();
        let err = first
            .update_session_details(&["A", "B"], &["only one"])
            .unwrap_err();
        assert!(matches!(err, SessionError::Argument(_)));
        first.close_session().unwrap();
        assert!(sse_path.exists());

        let mut second = FileSessionReader::open(&path).unwrap();
        assert_eq!(second.session_detail("Driver"), Some("LN"));
        assert_eq!(second.session_detail("Weather"), Some("Wet"));
        assert_eq!(second.session_detail("Track"), Some("Silverstone"));
        second.update_session_detail("Driver", "GR").unwrap();
        second.close_session().unwrap();

        let err = second.update_session_detail("Driver", "MV").unwrap_err();
        assert!(matches!(err, SessionError::State(_)));

        let log = detail::load_update_log(&sse_path).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[2], DetailUpdate::new("Driver", "GR"));

        // Closing without staged updates leaves the log alone
        let third = FileSessionReader::open(&path).unwrap();
        assert_eq!(third.session_detail("Driver"), Some("GR"));
        drop(third);
        assert_eq!(detail::load_update_log(&sse_path).unwrap().len(), 3);
    }

    #[test]
    fn test_channel_membership_checked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quali.ssn");
        write_demo_session(&path);
        let reader = FileSessionReader::open(&path).unwrap();

        // Channel 2 carries DrsOpen, not vCar
        let err = reader
            .get_channel_samples("vCar:Chassis", 2, SESSION_START, SESSION_END)
            .unwrap_err();
        assert!(matches!(err, SessionError::Query(_)));

        let direct = reader
            .get_channel_samples("vCar:Chassis", 1, SESSION_START, SESSION_END)
            .unwrap();
        assert_eq!(direct.len(), 6001);
    }

    #[test]
    fn test_virtual_parameters_evaluate_per_lap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("virt.ssn");

        let mut writer = FileSessionWriter::create(&path).unwrap();
        writer
            .build_rational_parameter("Chassis", "vCar", PhysicalRange::new(0.0, 400.0))
            .on_periodic_channel(Frequency::hz(10.0))
            .add_to_session()
            .unwrap();
        writer
            .add_virtual_parameter(VirtualParameter::new(
                "Double",
                "Chassis",
                VirtualExpr::scale("vCar:Chassis", 2.0, 0.0),
            ))
            .unwrap();
        writer
            .add_virtual_parameter(VirtualParameter::new(
                "LapNo",
                "Timing",
                VirtualExpr::sum(vec![
                    VirtualExpr::scale("vCar:Chassis", 0.0, 0.0),
                    VirtualExpr::LapNumber,
                ]),
            ))
            .unwrap();
        writer.commit_parameters().unwrap();

        // Ten seconds of ramp, a lap boundary at six seconds
        let values: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        writer
            .write_periodic_values(1, SESSION_START, &values)
            .unwrap();
        writer.add_lap(1, SESSION_START, LapType::OutLap).unwrap();
        writer
            .add_lap(2, SESSION_START + 6 * TICKS_PER_SECOND, LapType::InLap)
            .unwrap();
        writer.close_session().unwrap();

        let reader = FileSessionReader::open(&path).unwrap();
        let end = reader.end_time();

        let doubled = reader
            .get_samples("Double:Chassis", SESSION_START, end)
            .unwrap();
        // Lap windows are half-open, so the final tick is excluded
        assert_eq!(doubled.len(), 100);
        assert_eq!(doubled[0].value, 0.0);
        assert_eq!(doubled[1].value, 2.0);
        assert_eq!(doubled[99].value, 198.0);

        let lap_no = reader.get_samples("LapNo:Timing", SESSION_START, end).unwrap();
        assert_eq!(lap_no[0].value, 1.0);
        assert_eq!(lap_no[59].value, 1.0);
        assert_eq!(lap_no[60].value, 2.0);
        assert_eq!(
            lap_no[60].timestamp,
            SESSION_START + 6 * TICKS_PER_SECOND
        );

        // A window clipped to both sides of the lap boundary
        let clipped = reader
            .get_samples(
                "Double:Chassis",
                SESSION_START + 5 * TICKS_PER_SECOND,
                SESSION_START + 7 * TICKS_PER_SECOND,
            )
            .unwrap();
        assert_eq!(clipped.len(), 21);

        // Virtuals resample like any other parameter
        let data = reader
            .get_data(
                "Double:Chassis",
                SESSION_START,
                end,
                Frequency::hz(1.0),
                true,
            )
            .unwrap();
        assert_eq!(data.len(), 11);
        assert_eq!(data[0].value, 0.0);
        assert_eq!(data[1].value, 20.0);
    }

    #[test]
    fn test_open_session_without_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("laps_only.ssn");

        let mut writer = FileSessionWriter::create(&path).unwrap();
        writer.add_lap(1, 5_000, LapType::OutLap).unwrap();
        writer.add_lap(2, 9_000, LapType::InLap).unwrap();
        writer.close_session().unwrap();

        let reader = FileSessionReader::open(&path).unwrap();
        assert_eq!(reader.parameters().count(), 0);
        assert_eq!(reader.laps().len(), 2);
        assert_eq!((reader.start_time(), reader.end_time()), (5_000, 9_000));

        let err = reader.get_samples("vCar:Chassis", 5_000, 9_000).unwrap_err();
        assert!(matches!(err, SessionError::Query(_)));
    }
}
