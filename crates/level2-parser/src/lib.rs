//! NEXRAD / TDWR Level II Archive decoder.
//!
//! A Level II chunk is an optional 24-byte volume header followed by LDM
//! records, each of which is raw or bzip2-compressed. Inside a record,
//! messages are framed by a control header and a message header. This crate
//! decodes message 31 (radials with their moment blocks) and message 5 (the
//! volume coverage pattern) and skips everything else.
//!
//! NEXRAD and TDWR archives differ in a few block lengths and in the moments
//! they carry; both go through the same decoder driven by a [`FormatProfile`].
//!
//! ```no_run
//! use level2_parser::decode_chunk;
//!
//! # fn run(bytes: bytes::Bytes) -> level2_parser::Level2Result<()> {
//! let chunk = decode_chunk(bytes)?;
//! for radial in &chunk.radials {
//!     println!("elevation {} has {} moments", radial.elevation_number(), radial.moments.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cursor;
pub mod error;
pub mod messages;
pub mod product;
pub mod profile;
pub mod reader;
pub mod record;
pub mod volume_header;

pub use cursor::ByteCursor;
pub use error::{Level2Error, Level2Result};
pub use messages::{
    AzimuthResolution, ElevationCut, ElevationData, Message31, Message31Header, Message5,
    Message5Header, MessageHeader, Moment, RadialCalibration, RadialData, RadialStatus,
    VolumeData, Waveform,
};
pub use product::Product;
pub use profile::{FormatProfile, RadarKind};
pub use reader::{decode_chunk, DecodeStats, Level2Chunk, Level2Reader};
pub use record::{LdmRecord, RecordFramer};
pub use volume_header::{is_archive_header, julian_to_datetime, VolumeHeader};
