//! Session data model
//!
//! This module defines everything a session is made of, independent of
//! how it is stored:
//!
//! - **time**: Tick time base, sample rates, query ranges
//! - **data**: Raw data types, physical ranges, query sample points
//! - **conversion**: Rational and lookup rate conversions
//! - **parameter**: Parameters, channels and the staged/committed catalog
//! - **builder**: Fluent parameter definition chains
//! - **lap**: Lap marks and derived lap windows
//! - **detail**: Key/value session details and the update side-log
//! - **virtual_param**: Derived parameters evaluated at query time
//! - **ordmap**: Insertion-ordered map used by catalog views
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use stint::session::{Frequency, PhysicalRange};
//! use stint::store::FileSessionWriter;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut writer = FileSessionWriter::create("demo.ssn")?;
//!     writer
//!         .build_rational_parameter("Chassis", "vCar", PhysicalRange::new(0.0, 400.0))
//!         .units("kph")
//!         .on_periodic_channel(Frequency::hz(100.0))
//!         .add_to_session()?;
//!     writer.commit_parameters()?;
//!     writer.write_periodic_values(1, 32_400_000_000_000, &[312.0, 311.5, 310.8])?;
//!     writer.close_session()?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod conversion;
pub mod data;
pub mod detail;
pub mod error;
pub mod lap;
pub mod ordmap;
pub mod parameter;
pub mod time;
pub mod virtual_param;

// Re-export commonly used types
pub use builder::{RationalParameterBuilder, TextParameterBuilder};
pub use conversion::{Conversion, ConversionKind, LookupEntry};
pub use data::{DataPoint, DataType, PhysicalRange};
pub use detail::{DetailUpdate, SessionDetails};
pub use error::{SessionError, SessionResult};
pub use lap::{Lap, LapIndex, LapMark, LapType};
pub use ordmap::OrderedMap;
pub use parameter::{Channel, ChannelSpec, Parameter, ParameterCatalog, PRIMARY_SOURCE};
pub use time::{format_ticks, parse_ticks, Frequency, TickRange, TICKS_PER_SECOND};
pub use virtual_param::{VirtualExpr, VirtualParameter};
