//! Parameter catalog
//!
//! A session's schema is a catalog of typed parameters. Each parameter
//! owns one or more periodic channels (one per source file after a merge)
//! and references a conversion. The catalog is staged while the writer
//! defines parameters, then committed exactly once; after commit the
//! schema is frozen and samples may flow.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::conversion::{Conversion, ConversionKind};
use super::data::DataType;
use super::error::{SessionError, SessionResult};
use super::ordmap::OrderedMap;
use super::time::Frequency;
use super::virtual_param::VirtualParameter;

/// Data source tag for channels recorded by the session's own writer
pub const PRIMARY_SOURCE: &str = "primary";

/// A periodic channel: one stream of fixed-rate raw samples
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    /// Session-wide unique id (merged channels are renumbered)
    pub id: u32,
    /// Identifier of the owning parameter
    pub parameter: String,
    /// Origin of the data ("primary" or an associated-session tag)
    pub data_source: String,
    /// Raw sample representation
    pub data_type: DataType,
    /// Ticks between consecutive samples
    pub interval: i64,
}

impl Channel {
    pub fn new(id: u32, parameter: impl Into<String>, data_type: DataType, interval: i64) -> Self {
        Self {
            id,
            parameter: parameter.into(),
            data_source: PRIMARY_SOURCE.to_string(),
            data_type,
            interval,
        }
    }

    pub fn frequency(&self) -> Frequency {
        Frequency::from_interval(self.interval)
    }
}

/// Declaration of the single channel a staged parameter records on
#[derive(Debug, Clone, Copy)]
pub struct ChannelSpec {
    pub frequency: Frequency,
    pub data_type: DataType,
}

/// A catalogued parameter
///
/// The identifier is always `name:group`. Channels are kept in insertion
/// order; the primary channel is the one with the smallest interval
/// (highest rate), first added winning ties.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub identifier: String,
    pub name: String,
    pub group: String,
    pub sub_groups: Vec<String>,
    pub description: String,
    pub units: String,
    /// Identifier of this parameter's conversion
    pub conversion: String,
    channels: OrderedMap<u32, Channel>,
    primary: Option<u32>,
}

impl Parameter {
    /// Create a parameter with no channels yet
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        let name = name.into();
        let group = group.into();
        Self {
            identifier: format!("{}:{}", name, group),
            name,
            group,
            sub_groups: Vec::new(),
            description: String::new(),
            units: String::new(),
            conversion: String::new(),
            channels: OrderedMap::new(),
            primary: None,
        }
    }

    /// Builder: set description
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set sub-groups
    pub fn sub_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set units
    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Builder: set the conversion identifier
    pub fn conversion(mut self, identifier: impl Into<String>) -> Self {
        self.conversion = identifier.into();
        self
    }

    /// Rebuild a parameter from persisted parts
    pub(crate) fn from_parts(
        identifier: String,
        name: String,
        group: String,
        sub_groups: Vec<String>,
        description: String,
        units: String,
        conversion: String,
        channels: Vec<Channel>,
    ) -> Self {
        let mut parameter = Self {
            identifier,
            name,
            group,
            sub_groups,
            description,
            units,
            conversion,
            channels: OrderedMap::new(),
            primary: None,
        };
        for channel in channels {
            parameter.add_channel(channel);
        }
        parameter
    }

    /// Attach a channel, keeping the primary pointing at the fastest rate
    pub(crate) fn add_channel(&mut self, channel: Channel) {
        let replace = match self.primary_channel() {
            Some(primary) => channel.interval < primary.interval,
            None => true,
        };
        if replace {
            self.primary = Some(channel.id);
        }
        self.channels.insert(channel.id, channel);
    }

    /// Channels in insertion order
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channel(&self, id: u32) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// The fastest channel, queried when no channel is named explicitly
    pub fn primary_channel(&self) -> Option<&Channel> {
        self.channels.get(&self.primary?)
    }

    pub fn primary_channel_id(&self) -> Option<u32> {
        self.primary
    }

    /// Coarsest interval across all channels
    ///
    /// After a merge this is the natural output rate for whole-parameter
    /// resampling: every channel can supply it without upsampling.
    pub fn max_interval(&self) -> i64 {
        self.channels.values().map(|c| c.interval).max().unwrap_or(0)
    }

    pub fn merged_frequency(&self) -> Frequency {
        Frequency::from_interval(self.max_interval())
    }
}

/// The session schema: parameters, conversions and virtual parameters
#[derive(Debug, Default)]
pub struct ParameterCatalog {
    parameters: OrderedMap<String, Parameter>,
    conversions: OrderedMap<String, Conversion>,
    virtuals: OrderedMap<String, VirtualParameter>,
    /// Channel id to owning parameter identifier
    channel_owner: HashMap<u32, String>,
    next_channel_id: u32,
    committed: bool,
}

impl ParameterCatalog {
    pub fn new() -> Self {
        Self {
            parameters: OrderedMap::new(),
            conversions: OrderedMap::new(),
            virtuals: OrderedMap::new(),
            channel_owner: HashMap::new(),
            next_channel_id: 1,
            committed: false,
        }
    }

    /// Rebuild a committed catalog from persisted parts
    pub(crate) fn from_parts(
        parameters: Vec<Parameter>,
        conversions: Vec<Conversion>,
        virtuals: Vec<VirtualParameter>,
    ) -> SessionResult<Self> {
        let mut catalog = Self::new();
        for conversion in conversions {
            catalog
                .conversions
                .insert(conversion.identifier.clone(), conversion);
        }
        for parameter in parameters {
            if catalog.parameters.contains_key(&parameter.identifier) {
                return Err(SessionError::Corruption(format!(
                    "duplicate parameter identifier {}",
                    parameter.identifier
                )));
            }
            for channel in parameter.channels() {
                if catalog.channel_owner.contains_key(&channel.id) {
                    return Err(SessionError::Corruption(format!(
                        "duplicate channel id {}",
                        channel.id
                    )));
                }
                catalog
                    .channel_owner
                    .insert(channel.id, parameter.identifier.clone());
                catalog.next_channel_id = catalog.next_channel_id.max(channel.id + 1);
            }
            catalog
                .parameters
                .insert(parameter.identifier.clone(), parameter);
        }
        for vp in virtuals {
            catalog.virtuals.insert(vp.identifier.clone(), vp);
        }
        catalog.committed = true;
        Ok(catalog)
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Stage a parameter with its conversion and optional channel
    ///
    /// Returns the assigned channel id, if a channel was declared.
    pub fn register(
        &mut self,
        parameter: Parameter,
        conversion: Conversion,
        channel: Option<ChannelSpec>,
    ) -> SessionResult<Option<u32>> {
        self.ensure_staging()?;
        if parameter.name.is_empty() || parameter.group.is_empty() {
            return Err(SessionError::Schema(
                "parameter name and group must be non-empty".to_string(),
            ));
        }
        if self.parameters.contains_key(&parameter.identifier)
            || self.virtuals.contains_key(&parameter.identifier)
        {
            return Err(SessionError::Schema(format!(
                "duplicate parameter identifier {}",
                parameter.identifier
            )));
        }

        let mut parameter = parameter;
        let channel_id = match channel {
            Some(spec) => {
                if !spec.frequency.is_valid() {
                    return Err(SessionError::Schema(format!(
                        "parameter {} declares a non-positive channel interval",
                        parameter.identifier
                    )));
                }
                let id = self.allocate_channel_id();
                parameter.add_channel(Channel::new(
                    id,
                    parameter.identifier.clone(),
                    spec.data_type,
                    spec.frequency.interval(),
                ));
                self.channel_owner.insert(id, parameter.identifier.clone());
                Some(id)
            }
            None => None,
        };

        self.conversions
            .insert(conversion.identifier.clone(), conversion);
        self.parameters
            .insert(parameter.identifier.clone(), parameter);
        Ok(channel_id)
    }

    /// Stage a virtual parameter
    ///
    /// Source references are resolved at commit so they may name
    /// parameters staged later.
    pub fn register_virtual(&mut self, vp: VirtualParameter) -> SessionResult<()> {
        self.ensure_staging()?;
        if self.parameters.contains_key(&vp.identifier) || self.virtuals.contains_key(&vp.identifier)
        {
            return Err(SessionError::Schema(format!(
                "duplicate parameter identifier {}",
                vp.identifier
            )));
        }
        if vp.source_identifiers().is_empty() {
            return Err(SessionError::Schema(format!(
                "virtual parameter {} references no source parameters",
                vp.identifier
            )));
        }
        self.virtuals.insert(vp.identifier.clone(), vp);
        Ok(())
    }

    /// Validate and freeze the catalog
    pub fn commit(&mut self) -> SessionResult<()> {
        self.ensure_staging()?;
        for parameter in self.parameters.values() {
            if parameter.channel_count() == 0 {
                return Err(SessionError::Schema(format!(
                    "parameter {} has no channels",
                    parameter.identifier
                )));
            }
            let conversion = self.conversions.get(&parameter.conversion).ok_or_else(|| {
                SessionError::Schema(format!(
                    "parameter {} references unknown conversion {}",
                    parameter.identifier, parameter.conversion
                ))
            })?;
            if let ConversionKind::Lookup { entries, default } = &conversion.kind {
                if entries.is_empty() {
                    return Err(SessionError::Schema(format!(
                        "text parameter {} has an empty lookup table",
                        parameter.identifier
                    )));
                }
                if default.is_empty() {
                    return Err(SessionError::Schema(format!(
                        "text parameter {} has no default value",
                        parameter.identifier
                    )));
                }
            }
        }
        for vp in self.virtuals.values() {
            for source in vp.source_identifiers() {
                if !self.parameters.contains_key(source.as_str()) {
                    return Err(SessionError::Schema(format!(
                        "virtual parameter {} references unknown parameter {}",
                        vp.identifier, source
                    )));
                }
            }
        }
        self.committed = true;
        Ok(())
    }

    fn ensure_staging(&self) -> SessionResult<()> {
        if self.committed {
            return Err(SessionError::State(
                "parameter catalog already committed".to_string(),
            ));
        }
        Ok(())
    }

    /// Freeze without validation; staging calls fail from here on
    pub(crate) fn seal(&mut self) {
        self.committed = true;
    }

    /// Hand out the next channel id
    pub(crate) fn allocate_channel_id(&mut self) -> u32 {
        let id = self.next_channel_id;
        self.next_channel_id += 1;
        id
    }

    /// Attach a renumbered channel to an existing parameter (merge path)
    pub(crate) fn attach_channel(&mut self, identifier: &str, channel: Channel) -> bool {
        match self.parameters.get_mut(identifier) {
            Some(parameter) => {
                self.channel_owner
                    .insert(channel.id, identifier.to_string());
                parameter.add_channel(channel);
                true
            }
            None => false,
        }
    }

    /// Insert a parameter brought in whole from an associated session
    ///
    /// The conversion is kept only if the identifier is not already
    /// present; the first definition wins.
    pub(crate) fn adopt_parameter(&mut self, parameter: Parameter, conversion: Conversion) {
        if !self.conversions.contains_key(&conversion.identifier) {
            self.conversions
                .insert(conversion.identifier.clone(), conversion);
        }
        for channel in parameter.channels() {
            self.channel_owner
                .insert(channel.id, parameter.identifier.clone());
        }
        self.parameters
            .insert(parameter.identifier.clone(), parameter);
    }

    /// Parameters in registration order
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn parameter(&self, identifier: &str) -> Option<&Parameter> {
        self.parameters.get(identifier)
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Conversions in registration order
    pub fn conversions(&self) -> impl Iterator<Item = &Conversion> {
        self.conversions.values()
    }

    pub fn conversion(&self, identifier: &str) -> Option<&Conversion> {
        self.conversions.get(identifier)
    }

    /// Virtual parameters in registration order
    pub fn virtual_parameters(&self) -> impl Iterator<Item = &VirtualParameter> {
        self.virtuals.values()
    }

    pub fn virtual_parameter(&self, identifier: &str) -> Option<&VirtualParameter> {
        self.virtuals.get(identifier)
    }

    pub fn virtual_count(&self) -> usize {
        self.virtuals.len()
    }

    /// All channels, following parameter registration order
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.parameters.values().flat_map(|p| p.channels())
    }

    pub fn channel(&self, id: u32) -> Option<&Channel> {
        let owner = self.channel_owner.get(&id)?;
        self.parameters.get(owner)?.channel(id)
    }

    pub fn channel_count(&self) -> usize {
        self.channel_owner.len()
    }
}
