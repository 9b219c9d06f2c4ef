//! Session file storage
//!
//! The on-disk layer of the crate: the binary session format, the
//! streaming writer, the merging reader and the resampling primitives
//! queries are built on.
//!
//! A session is written once and never modified; readers merge
//! associated sessions and stage detail updates in a side file instead
//! of touching the original.

pub mod format;
pub mod reader;
pub mod resample;
pub mod writer;

pub use format::{
    BlockRecord, CatalogRecord, ParameterRecord, SessionHeader, FORMAT_VERSION, HEADER_SIZE,
    SESSION_MAGIC,
};
pub use reader::FileSessionReader;
pub use resample::{ChannelSeries, ResampleMode};
pub use writer::FileSessionWriter;
