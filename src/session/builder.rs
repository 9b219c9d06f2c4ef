//! Fluent parameter definition
//!
//! Writers stage parameters through builder chains:
//!
//! ```ignore
//! writer
//!     .build_rational_parameter("Chassis", "vCar", PhysicalRange::new(0.0, 400.0))
//!     .description("Car speed")
//!     .units("kph")
//!     .on_periodic_channel(Frequency::hz(100.0))
//!     .add_to_session()?;
//! ```
//!
//! `add_to_session` validates and stages the parameter; nothing is final
//! until the catalog is committed.

use super::conversion::{Conversion, LookupEntry};
use super::data::{DataType, PhysicalRange};
use super::error::{SessionError, SessionResult};
use super::parameter::{ChannelSpec, Parameter, ParameterCatalog};
use super::time::Frequency;

fn conversion_identifier(name: &str, group: &str) -> String {
    format!("{}:{}.conv", name, group)
}

/// Builder for a numeric parameter with a linear conversion
pub struct RationalParameterBuilder<'a> {
    catalog: &'a mut ParameterCatalog,
    name: String,
    group: String,
    physical_range: PhysicalRange,
    description: String,
    sub_groups: Vec<String>,
    units: String,
    format: Option<String>,
    factor: f64,
    offset: f64,
    channel: Option<(Frequency, Option<DataType>)>,
}

impl<'a> RationalParameterBuilder<'a> {
    pub(crate) fn new(
        catalog: &'a mut ParameterCatalog,
        group: impl Into<String>,
        name: impl Into<String>,
        physical_range: PhysicalRange,
    ) -> Self {
        Self {
            catalog,
            name: name.into(),
            group: group.into(),
            physical_range,
            description: String::new(),
            sub_groups: Vec::new(),
            units: String::new(),
            format: None,
            factor: 1.0,
            offset: 0.0,
            channel: None,
        }
    }

    /// Set the human-readable description
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Set sub-groups below the parameter's group
    pub fn sub_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Set the engineering units
    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Override the display format (printf-style)
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set the linear scale applied to raw values
    pub fn linear_scale(mut self, factor: f64, offset: f64) -> Self {
        self.factor = factor;
        self.offset = offset;
        self
    }

    /// Record on a periodic channel at the given rate (raw f32 samples)
    pub fn on_periodic_channel(mut self, frequency: Frequency) -> Self {
        self.channel = Some((frequency, None));
        self
    }

    /// Record on a periodic channel with an explicit raw data type
    pub fn on_periodic_channel_as(mut self, frequency: Frequency, data_type: DataType) -> Self {
        self.channel = Some((frequency, Some(data_type)));
        self
    }

    /// Validate and stage the parameter in the catalog
    pub fn add_to_session(self) -> SessionResult<()> {
        let Self {
            catalog,
            name,
            group,
            physical_range,
            description,
            sub_groups,
            units,
            format,
            factor,
            offset,
            channel,
        } = self;

        let conversion_id = conversion_identifier(&name, &group);
        let mut conversion =
            Conversion::rational(&conversion_id, &units, physical_range).linear_scale(factor, offset);
        if let Some(format) = format {
            conversion = conversion.format(format);
        }

        let parameter = Parameter::new(name, group)
            .description(description)
            .sub_groups(sub_groups)
            .units(units)
            .conversion(conversion_id);

        let spec = channel.map(|(frequency, data_type)| ChannelSpec {
            frequency,
            data_type: data_type.unwrap_or(DataType::Float32),
        });
        catalog.register(parameter, conversion, spec)?;
        Ok(())
    }
}

/// Builder for a text parameter with a lookup conversion
pub struct TextParameterBuilder<'a> {
    catalog: &'a mut ParameterCatalog,
    name: String,
    group: String,
    description: String,
    sub_groups: Vec<String>,
    entries: Vec<LookupEntry>,
    default: Option<String>,
    format: Option<String>,
    physical_range: Option<PhysicalRange>,
    channel: Option<(Frequency, Option<DataType>)>,
}

impl<'a> TextParameterBuilder<'a> {
    pub(crate) fn new(
        catalog: &'a mut ParameterCatalog,
        group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            name: name.into(),
            group: group.into(),
            description: String::new(),
            sub_groups: Vec::new(),
            entries: Vec::new(),
            default: None,
            format: None,
            physical_range: None,
            channel: None,
        }
    }

    /// Set the human-readable description
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Set sub-groups below the parameter's group
    pub fn sub_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Map one raw code to a label
    pub fn add_lookup(mut self, raw: f64, label: impl Into<String>) -> Self {
        self.entries.push(LookupEntry::new(raw, label));
        self
    }

    /// Label used for codes absent from the lookup table
    pub fn default_value(mut self, label: impl Into<String>) -> Self {
        self.default = Some(label.into());
        self
    }

    /// Override the display format (printf-style)
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Override the physical range derived from the lookup codes
    pub fn physical_range(mut self, range: PhysicalRange) -> Self {
        self.physical_range = Some(range);
        self
    }

    /// Record on a periodic channel at the given rate (raw u8 codes)
    pub fn on_periodic_channel(mut self, frequency: Frequency) -> Self {
        self.channel = Some((frequency, None));
        self
    }

    /// Record on a periodic channel with an explicit raw data type
    pub fn on_periodic_channel_as(mut self, frequency: Frequency, data_type: DataType) -> Self {
        self.channel = Some((frequency, Some(data_type)));
        self
    }

    /// Validate and stage the parameter in the catalog
    pub fn add_to_session(self) -> SessionResult<()> {
        let Self {
            catalog,
            name,
            group,
            description,
            sub_groups,
            entries,
            default,
            format,
            physical_range,
            channel,
        } = self;

        if entries.is_empty() {
            return Err(SessionError::Schema(format!(
                "text parameter {}:{} has an empty lookup table",
                name, group
            )));
        }

        let conversion_id = conversion_identifier(&name, &group);
        let mut conversion =
            Conversion::lookup(&conversion_id, entries, default.unwrap_or_default());
        if let Some(format) = format {
            conversion = conversion.format(format);
        }
        if let Some(range) = physical_range {
            conversion = conversion.physical_range(range);
        }

        let parameter = Parameter::new(name, group)
            .description(description)
            .sub_groups(sub_groups)
            .conversion(conversion_id);

        let spec = channel.map(|(frequency, data_type)| ChannelSpec {
            frequency,
            data_type: data_type.unwrap_or(DataType::Unsigned8),
        });
        catalog.register(parameter, conversion, spec)?;
        Ok(())
    }
}
