//! Message 31: generic digital radar data (one radial).
//!
//! Layout:
//! - 32-byte radial header
//! - `data_block_count` big-endian u32 pointers, relative to the header start
//! - data blocks, each starting with a 1-byte block type and a 3-character name
//!
//! Block names `VOL`, `ELV` and `RAD` carry calibration constants; moment
//! blocks (`REF`, `VEL`, `SW `, ...) share one generic header followed by the
//! packed gate words.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::trace;

use crate::cursor::ByteCursor;
use crate::error::{Level2Error, Level2Result};
use crate::product::Product;
use crate::profile::FormatProfile;
use crate::volume_header::{icao_from_bytes, julian_to_datetime};

/// Length of the fixed radial header.
pub const MESSAGE31_HEADER_SIZE: usize = 32;
/// Length of the generic moment header preceding the gate data.
pub const MOMENT_HEADER_SIZE: usize = 28;
/// Length of the ELV block.
pub const ELEVATION_BLOCK_SIZE: usize = 12;

/// Fixed radial header.
#[derive(Debug, Clone, PartialEq)]
pub struct Message31Header {
    pub icao: [u8; 4],
    pub collection_time: u32,
    pub collection_date: u16,
    pub azimuth_number: u16,
    /// Azimuth angle in degrees.
    pub azimuth_angle: f32,
    pub compression: u8,
    pub radial_length: u16,
    /// 1 = 0.5 degree, 2 = 1.0 degree.
    pub azimuth_resolution: u8,
    pub radial_status: u8,
    /// 1-based elevation number within the volume.
    pub elevation_number: u8,
    pub cut_sector_number: u8,
    /// Elevation angle in degrees.
    pub elevation_angle: f32,
    pub radial_blanking: u8,
    pub azimuth_indexing: u8,
    pub data_block_count: u16,
}

impl Message31Header {
    fn decode(cursor: &mut ByteCursor<'_>) -> Level2Result<Self> {
        const CTX: &str = "message 31 header";
        cursor.require(MESSAGE31_HEADER_SIZE, CTX)?;

        let icao = cursor.read_array(CTX)?;
        let collection_time = cursor.read_u32(CTX)?;
        let collection_date = cursor.read_u16(CTX)?;
        let azimuth_number = cursor.read_u16(CTX)?;
        let azimuth_angle = cursor.read_f32(CTX)?;
        let compression = cursor.read_u8(CTX)?;
        let _spare = cursor.read_u8(CTX)?;
        let radial_length = cursor.read_u16(CTX)?;
        let azimuth_resolution = cursor.read_u8(CTX)?;
        let radial_status = cursor.read_u8(CTX)?;
        let elevation_number = cursor.read_u8(CTX)?;
        let cut_sector_number = cursor.read_u8(CTX)?;
        let elevation_angle = cursor.read_f32(CTX)?;
        let radial_blanking = cursor.read_u8(CTX)?;
        let azimuth_indexing = cursor.read_u8(CTX)?;
        let data_block_count = cursor.read_u16(CTX)?;

        Ok(Self {
            icao,
            collection_time,
            collection_date,
            azimuth_number,
            azimuth_angle,
            compression,
            radial_length,
            azimuth_resolution,
            radial_status,
            elevation_number,
            cut_sector_number,
            elevation_angle,
            radial_blanking,
            azimuth_indexing,
            data_block_count,
        })
    }
}

/// Position of a radial within its elevation sweep and volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadialStatus {
    StartOfElevation,
    Intermediate,
    EndOfElevation,
    StartOfVolume,
    EndOfVolume,
    StartOfElevationLastCut,
    Unknown(u8),
}

impl RadialStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => RadialStatus::StartOfElevation,
            1 => RadialStatus::Intermediate,
            2 => RadialStatus::EndOfElevation,
            3 => RadialStatus::StartOfVolume,
            4 => RadialStatus::EndOfVolume,
            5 => RadialStatus::StartOfElevationLastCut,
            other => RadialStatus::Unknown(other),
        }
    }

    /// End of volume also ends the elevation.
    pub fn is_end_of_elevation(&self) -> bool {
        matches!(self, RadialStatus::EndOfElevation | RadialStatus::EndOfVolume)
    }

    pub fn is_end_of_volume(&self) -> bool {
        matches!(self, RadialStatus::EndOfVolume)
    }
}

/// Azimuthal spacing of radials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AzimuthResolution(pub u8);

impl AzimuthResolution {
    pub fn degrees(&self) -> f32 {
        self.0 as f32 / 2.0
    }
}

/// VOL block: site location and volume-wide calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeData {
    pub block_length: u16,
    pub version_major: u8,
    pub version_minor: u8,
    pub latitude: f32,
    pub longitude: f32,
    /// Site height above sea level (m).
    pub site_height: u16,
    pub feedhorn_height: u16,
    pub calibration_constant: f32,
    pub horizontal_tx_power: f32,
    pub vertical_tx_power: f32,
    pub system_differential_reflectivity: f32,
    pub initial_differential_phase: f32,
    pub vcp: u16,
    pub processing_status: u16,
    /// NEXRAD only.
    pub zdr_bias_estimate: Option<u16>,
}

impl VolumeData {
    fn decode(cursor: &mut ByteCursor<'_>, profile: &FormatProfile) -> Level2Result<Self> {
        const CTX: &str = "VOL block";
        cursor.require(profile.volume_block_len, CTX)?;
        cursor.skip(4);

        let block_length = cursor.read_u16(CTX)?;
        let version_major = cursor.read_u8(CTX)?;
        let version_minor = cursor.read_u8(CTX)?;
        let latitude = cursor.read_f32(CTX)?;
        let longitude = cursor.read_f32(CTX)?;
        let site_height = cursor.read_u16(CTX)?;
        let feedhorn_height = cursor.read_u16(CTX)?;
        let calibration_constant = cursor.read_f32(CTX)?;
        let horizontal_tx_power = cursor.read_f32(CTX)?;
        let vertical_tx_power = cursor.read_f32(CTX)?;
        let system_differential_reflectivity = cursor.read_f32(CTX)?;
        let initial_differential_phase = cursor.read_f32(CTX)?;
        let vcp = cursor.read_u16(CTX)?;
        let processing_status = cursor.read_u16(CTX)?;

        let zdr_bias_estimate = if profile.volume_block_len > 44 {
            let value = cursor.read_u16(CTX)?;
            cursor.skip(6);
            Some(value)
        } else {
            None
        };

        Ok(Self {
            block_length,
            version_major,
            version_minor,
            latitude,
            longitude,
            site_height,
            feedhorn_height,
            calibration_constant,
            horizontal_tx_power,
            vertical_tx_power,
            system_differential_reflectivity,
            initial_differential_phase,
            vcp,
            processing_status,
            zdr_bias_estimate,
        })
    }

    /// Site coordinates, or `None` when the block carries the (0, 0) placeholder.
    pub fn coordinates(&self) -> Option<(f32, f32)> {
        if self.latitude == 0.0 && self.longitude == 0.0 {
            None
        } else {
            Some((self.latitude, self.longitude))
        }
    }
}

/// ELV block.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationData {
    pub block_length: u16,
    pub atmospheric_attenuation: u16,
    pub calibration_constant: f32,
}

impl ElevationData {
    fn decode(cursor: &mut ByteCursor<'_>) -> Level2Result<Self> {
        const CTX: &str = "ELV block";
        cursor.require(ELEVATION_BLOCK_SIZE, CTX)?;
        cursor.skip(4);
        Ok(Self {
            block_length: cursor.read_u16(CTX)?,
            atmospheric_attenuation: cursor.read_u16(CTX)?,
            calibration_constant: cursor.read_f32(CTX)?,
        })
    }
}

/// NEXRAD-only tail of the RAD block.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialCalibration {
    pub horizontal_noise: f32,
    pub vertical_noise: f32,
    /// Nyquist velocity, scaled by 100.
    pub nyquist_velocity: u16,
    pub radial_flags: u16,
    pub horizontal_calibration: f32,
    pub vertical_calibration: f32,
}

/// RAD block.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialData {
    pub block_length: u16,
    /// Unambiguous range, scaled by 10 (km).
    pub unambiguous_range: u16,
    pub calibration: Option<RadialCalibration>,
}

impl RadialData {
    fn decode(cursor: &mut ByteCursor<'_>, profile: &FormatProfile) -> Level2Result<Self> {
        const CTX: &str = "RAD block";
        cursor.require(profile.radial_block_len, CTX)?;
        cursor.skip(4);

        let block_length = cursor.read_u16(CTX)?;
        let unambiguous_range = cursor.read_u16(CTX)?;
        let calibration = if profile.radial_block_len > 8 {
            Some(RadialCalibration {
                horizontal_noise: cursor.read_f32(CTX)?,
                vertical_noise: cursor.read_f32(CTX)?,
                nyquist_velocity: cursor.read_u16(CTX)?,
                radial_flags: cursor.read_u16(CTX)?,
                horizontal_calibration: cursor.read_f32(CTX)?,
                vertical_calibration: cursor.read_f32(CTX)?,
            })
        } else {
            None
        };

        Ok(Self {
            block_length,
            unambiguous_range,
            calibration,
        })
    }
}

/// One decoded moment block.
#[derive(Debug, Clone, PartialEq)]
pub struct Moment {
    pub product: Product,
    pub number_gates: u16,
    /// Range to the first gate (m).
    pub range: u16,
    /// Gate spacing (m).
    pub range_sample_interval: u16,
    pub tover: u16,
    pub snr_threshold: u16,
    pub control_flags: u8,
    pub data_word_size: u8,
    pub scale: f32,
    pub offset: f32,
    /// Gate values ordered by increasing range; empty when `scale` is zero.
    pub data: Vec<f32>,
}

impl Moment {
    fn decode(cursor: &mut ByteCursor<'_>, product: Product) -> Level2Result<Self> {
        const CTX: &str = "moment header";
        cursor.require(MOMENT_HEADER_SIZE, CTX)?;
        cursor.skip(4);

        let _reserved = cursor.read_u32(CTX)?;
        let number_gates = cursor.read_u16(CTX)?;
        let range = cursor.read_u16(CTX)?;
        let range_sample_interval = cursor.read_u16(CTX)?;
        let tover = cursor.read_u16(CTX)?;
        let snr_threshold = cursor.read_u16(CTX)?;
        let control_flags = cursor.read_u8(CTX)?;
        let data_word_size = cursor.read_u8(CTX)?;
        let scale = cursor.read_f32(CTX)?;
        let offset = cursor.read_f32(CTX)?;

        let gate_bytes = number_gates as usize * data_word_size as usize / 8;
        let raw = cursor.read_bytes(gate_bytes, "moment gate data")?;
        let data = rescale_gates(raw, data_word_size, scale, offset).ok_or_else(|| {
            Level2Error::UnsupportedWordSize {
                tag: product.tag().to_string(),
                word_size: data_word_size,
            }
        })?;

        Ok(Self {
            product,
            number_gates,
            range,
            range_sample_interval,
            tover,
            snr_threshold,
            control_flags,
            data_word_size,
            scale,
            offset,
            data,
        })
    }

    pub fn start_range_km(&self) -> f32 {
        self.range as f32 / 1000.0
    }

    pub fn gate_interval_km(&self) -> f32 {
        self.range_sample_interval as f32 / 1000.0
    }
}

/// Apply `(raw - offset) / scale` to each gate word.
///
/// Returns an empty sequence when `scale` is zero and `None` for word sizes
/// other than 8 or 16 bits.
pub fn rescale_gates(raw: &[u8], word_size: u8, scale: f32, offset: f32) -> Option<Vec<f32>> {
    if scale == 0.0 {
        return Some(Vec::new());
    }

    let convert = |word: f32| (word - offset) / scale;
    match word_size {
        8 => Some(raw.iter().map(|&b| convert(b as f32)).collect()),
        16 => Some(
            raw.chunks_exact(2)
                .map(|w| convert(u16::from_be_bytes([w[0], w[1]]) as f32))
                .collect(),
        ),
        _ => None,
    }
}

/// A fully decoded radial.
#[derive(Debug, Clone, PartialEq)]
pub struct Message31 {
    pub header: Message31Header,
    /// Pointer table as read, zero entries included.
    pub block_pointers: Vec<u32>,
    pub volume: Option<VolumeData>,
    pub elevation: Option<ElevationData>,
    pub radial: Option<RadialData>,
    pub moments: BTreeMap<Product, Moment>,
}

impl Message31 {
    /// Decode a radial whose header starts at `start` within `data`.
    ///
    /// Block pointers are relative to `start`. A zero pointer marks an absent
    /// block and is skipped without moving the cursor.
    pub fn decode(data: &[u8], start: usize, profile: &FormatProfile) -> Level2Result<Self> {
        let mut cursor = ByteCursor::new(data);
        cursor.seek(start);

        let header = Message31Header::decode(&mut cursor)?;

        let mut block_pointers = Vec::with_capacity(header.data_block_count as usize);
        for _ in 0..header.data_block_count {
            block_pointers.push(cursor.read_u32("data block pointer table")?);
        }

        let mut message = Message31 {
            header,
            block_pointers,
            volume: None,
            elevation: None,
            radial: None,
            moments: BTreeMap::new(),
        };

        for &pointer in &message.block_pointers {
            if pointer == 0 {
                continue;
            }

            // One block-type byte precedes the name; step back over both
            // once the name is known so each decoder sees the whole block.
            cursor.seek(start.saturating_add(pointer as usize + 1));
            let name = cursor.read_array::<3>("data block name")?;
            cursor.seek(cursor.position() - 4);

            match &name {
                b"VOL" => message.volume = Some(VolumeData::decode(&mut cursor, profile)?),
                b"ELV" => message.elevation = Some(ElevationData::decode(&mut cursor)?),
                b"RAD" => message.radial = Some(RadialData::decode(&mut cursor, profile)?),
                _ => {
                    let tag = String::from_utf8_lossy(&name);
                    match Product::from_tag(&tag).filter(|p| profile.decodes(*p)) {
                        Some(product) => {
                            let moment = Moment::decode(&mut cursor, product)?;
                            message.moments.insert(product, moment);
                        }
                        None => trace!(tag = %tag, "Ignoring unknown data block"),
                    }
                }
            }
        }

        Ok(message)
    }

    pub fn icao(&self) -> Option<String> {
        icao_from_bytes(&self.header.icao)
    }

    pub fn elevation_number(&self) -> u8 {
        self.header.elevation_number
    }

    pub fn status(&self) -> RadialStatus {
        RadialStatus::from_code(self.header.radial_status)
    }

    pub fn azimuth_resolution(&self) -> AzimuthResolution {
        AzimuthResolution(self.header.azimuth_resolution)
    }

    pub fn collection_time(&self) -> DateTime<Utc> {
        julian_to_datetime(self.header.collection_date as u32, self.header.collection_time)
    }
}
