//! # Stint
//!
//! Columnar telemetry session store - records multi-rate periodic
//! channels into immutable session files and answers time-windowed,
//! rate-converted queries over them.
//!
//! ## Features
//!
//! - **Multi-rate recording**: Each channel samples at its own fixed rate
//! - **Immutable sessions**: Write once, query forever; checksummed format
//! - **Read-side merging**: Associated sessions join the primary catalog
//! - **Rate conversion**: Any parameter resamples onto any output grid
//! - **Virtual parameters**: Expressions evaluated lap by lap at query time
//!
//! ## Modules
//!
//! - [`session`]: The data model - time base, parameters, conversions, laps
//! - [`store`]: The file format, writer, reader and resampling
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stint::{FileSessionReader, FileSessionWriter, Frequency, PhysicalRange};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Record a session
//!     let mut writer = FileSessionWriter::create("quali.ssn")?;
//!     writer
//!         .build_rational_parameter("Chassis", "vCar", PhysicalRange::new(0.0, 400.0))
//!         .units("kph")
//!         .on_periodic_channel(Frequency::hz(100.0))
//!         .add_to_session()?;
//!     writer.commit_parameters()?;
//!     writer.write_periodic_values(1, 32_400_000_000_000, &[312.0, 314.5, 316.0])?;
//!     writer.close_session()?;
//!
//!     // Query it back at any rate
//!     let reader = FileSessionReader::open("quali.ssn")?;
//!     let data = reader.get_data(
//!         "vCar:Chassis",
//!         reader.start_time(),
//!         reader.end_time(),
//!         Frequency::khz(1.0),
//!         true,
//!     )?;
//!     println!("Resampled to {} points", data.len());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod session;
pub mod store;

// Re-export top-level types for convenience
pub use session::{
    format_ticks, parse_ticks, Channel, ChannelSpec, Conversion, ConversionKind, DataPoint,
    DataType, DetailUpdate, Frequency, Lap, LapIndex, LapMark, LapType, LookupEntry, Parameter,
    ParameterCatalog, PhysicalRange, SessionDetails, SessionError, SessionResult, TickRange,
    VirtualExpr, VirtualParameter, PRIMARY_SOURCE, TICKS_PER_SECOND,
};

pub use store::{
    ChannelSeries, FileSessionReader, FileSessionWriter, ResampleMode, SessionHeader,
    FORMAT_VERSION, SESSION_MAGIC,
};

pub use config::{Config, ConfigError, ExportConfig, LoggingConfig, SessionConfig};
