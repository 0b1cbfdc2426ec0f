//! Message 5: Volume Coverage Pattern.

use crate::cursor::ByteCursor;
use crate::error::Level2Result;

/// Length of the VCP header.
pub const MESSAGE5_HEADER_SIZE: usize = 22;
/// Length of one elevation cut record.
pub const ELEVATION_CUT_SIZE: usize = 46;

/// Fixed VCP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message5Header {
    /// Message size in half-words.
    pub message_size: u16,
    pub pattern_type: u16,
    pub pattern_number: u16,
    pub number_of_cuts: u16,
    pub version: u8,
    pub clutter_map_group: u8,
    pub doppler_resolution: u8,
    pub pulse_width: u8,
    pub sequencing: u16,
    pub supplemental_data: u16,
}

impl Message5Header {
    fn decode(cursor: &mut ByteCursor<'_>) -> Level2Result<Self> {
        const CTX: &str = "message 5 header";
        cursor.require(MESSAGE5_HEADER_SIZE, CTX)?;

        let message_size = cursor.read_u16(CTX)?;
        let pattern_type = cursor.read_u16(CTX)?;
        let pattern_number = cursor.read_u16(CTX)?;
        let number_of_cuts = cursor.read_u16(CTX)?;
        let version = cursor.read_u8(CTX)?;
        let clutter_map_group = cursor.read_u8(CTX)?;
        let doppler_resolution = cursor.read_u8(CTX)?;
        let pulse_width = cursor.read_u8(CTX)?;
        cursor.skip(4);
        let sequencing = cursor.read_u16(CTX)?;
        let supplemental_data = cursor.read_u16(CTX)?;
        cursor.skip(2);

        Ok(Self {
            message_size,
            pattern_type,
            pattern_number,
            number_of_cuts,
            version,
            clutter_map_group,
            doppler_resolution,
            pulse_width,
            sequencing,
            supplemental_data,
        })
    }
}

/// Waveform used for an elevation cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    /// Contiguous surveillance
    ContiguousSurveillance,
    /// Contiguous Doppler with ambiguity resolution
    ContiguousDopplerWithGating,
    /// Contiguous Doppler without ambiguity resolution
    ContiguousDopplerWithoutGating,
    /// Batch
    Batch,
    /// Staggered pulse pair
    StaggeredPulsePair,
    Unknown(u8),
}

impl Waveform {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Waveform::ContiguousSurveillance,
            2 => Waveform::ContiguousDopplerWithGating,
            3 => Waveform::ContiguousDopplerWithoutGating,
            4 => Waveform::Batch,
            5 => Waveform::StaggeredPulsePair,
            other => Waveform::Unknown(other),
        }
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Waveform::ContiguousSurveillance => "CS",
            Waveform::ContiguousDopplerWithGating => "CDW",
            Waveform::ContiguousDopplerWithoutGating => "CDWO",
            Waveform::Batch => "B",
            Waveform::StaggeredPulsePair => "SPP",
            Waveform::Unknown(_) => "?",
        }
    }
}

/// One elevation cut of the VCP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevationCut {
    /// Coded target elevation angle.
    pub elevation_angle: u16,
    pub channel_configuration: u8,
    pub waveform_type: u8,
    pub super_resolution_control: u8,
    pub surveillance_prf_number: u8,
    pub surveillance_prf_pulse_count: u16,
    pub azimuth_rate: u16,
    pub reflectivity_threshold: u16,
    pub velocity_threshold: u16,
    pub spectrum_width_threshold: u16,
    pub differential_reflectivity_threshold: u16,
    pub differential_phase_threshold: u16,
    pub correlation_coefficient_threshold: u16,
    pub edge_angle_1: u16,
    pub doppler_prf_number_1: u16,
    pub doppler_prf_pulse_count_1: u16,
    pub supplemental_data: u16,
    pub edge_angle_2: u16,
    pub doppler_prf_number_2: u16,
    pub doppler_prf_pulse_count_2: u16,
    pub ebc_angle: u16,
    pub edge_angle_3: u16,
    pub doppler_prf_number_3: u16,
    pub doppler_prf_pulse_count_3: u16,
}

impl ElevationCut {
    fn decode(cursor: &mut ByteCursor<'_>) -> Level2Result<Self> {
        const CTX: &str = "elevation cut";
        cursor.require(ELEVATION_CUT_SIZE, CTX)?;

        let cut = Self {
            elevation_angle: cursor.read_u16(CTX)?,
            channel_configuration: cursor.read_u8(CTX)?,
            waveform_type: cursor.read_u8(CTX)?,
            super_resolution_control: cursor.read_u8(CTX)?,
            surveillance_prf_number: cursor.read_u8(CTX)?,
            surveillance_prf_pulse_count: cursor.read_u16(CTX)?,
            azimuth_rate: cursor.read_u16(CTX)?,
            reflectivity_threshold: cursor.read_u16(CTX)?,
            velocity_threshold: cursor.read_u16(CTX)?,
            spectrum_width_threshold: cursor.read_u16(CTX)?,
            differential_reflectivity_threshold: cursor.read_u16(CTX)?,
            differential_phase_threshold: cursor.read_u16(CTX)?,
            correlation_coefficient_threshold: cursor.read_u16(CTX)?,
            edge_angle_1: cursor.read_u16(CTX)?,
            doppler_prf_number_1: cursor.read_u16(CTX)?,
            doppler_prf_pulse_count_1: cursor.read_u16(CTX)?,
            supplemental_data: cursor.read_u16(CTX)?,
            edge_angle_2: cursor.read_u16(CTX)?,
            doppler_prf_number_2: cursor.read_u16(CTX)?,
            doppler_prf_pulse_count_2: cursor.read_u16(CTX)?,
            ebc_angle: cursor.read_u16(CTX)?,
            edge_angle_3: cursor.read_u16(CTX)?,
            doppler_prf_number_3: cursor.read_u16(CTX)?,
            doppler_prf_pulse_count_3: cursor.read_u16(CTX)?,
        };
        cursor.skip(2);
        Ok(cut)
    }

    /// Target elevation in degrees (binary angle, 13 significant bits).
    pub fn elevation_degrees(&self) -> f32 {
        (self.elevation_angle >> 3) as f32 * 0.043_945
    }

    pub fn waveform(&self) -> Waveform {
        Waveform::from_code(self.waveform_type)
    }
}

/// Decoded Volume Coverage Pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message5 {
    pub header: Message5Header,
    /// Cuts in scan order; may be shorter than `number_of_cuts` when the
    /// stream ended early.
    pub elevation_cuts: Vec<ElevationCut>,
}

impl Message5 {
    /// Decode a VCP starting at the cursor position.
    ///
    /// A short header is an error; running out of bytes part-way through the
    /// cut list just ends the list.
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Level2Result<Self> {
        let header = Message5Header::decode(cursor)?;

        let mut elevation_cuts = Vec::with_capacity(header.number_of_cuts as usize);
        for _ in 0..header.number_of_cuts {
            match ElevationCut::decode(cursor) {
                Ok(cut) => elevation_cuts.push(cut),
                Err(_) => break,
            }
        }

        Ok(Self {
            header,
            elevation_cuts,
        })
    }

    pub fn pattern_number(&self) -> u16 {
        self.header.pattern_number
    }

    pub fn is_complete(&self) -> bool {
        self.elevation_cuts.len() == self.header.number_of_cuts as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevation_degrees() {
        let cut = ElevationCut {
            elevation_angle: 91 << 3,
            channel_configuration: 0,
            waveform_type: 1,
            super_resolution_control: 0,
            surveillance_prf_number: 0,
            surveillance_prf_pulse_count: 0,
            azimuth_rate: 0,
            reflectivity_threshold: 0,
            velocity_threshold: 0,
            spectrum_width_threshold: 0,
            differential_reflectivity_threshold: 0,
            differential_phase_threshold: 0,
            correlation_coefficient_threshold: 0,
            edge_angle_1: 0,
            doppler_prf_number_1: 0,
            doppler_prf_pulse_count_1: 0,
            supplemental_data: 0,
            edge_angle_2: 0,
            doppler_prf_number_2: 0,
            doppler_prf_pulse_count_2: 0,
            ebc_angle: 0,
            edge_angle_3: 0,
            doppler_prf_number_3: 0,
            doppler_prf_pulse_count_3: 0,
        };
        assert!((cut.elevation_degrees() - 4.0).abs() < 0.01);
        assert_eq!(cut.waveform(), Waveform::ContiguousSurveillance);
        assert_eq!(cut.waveform().abbreviation(), "CS");
    }

    #[test]
    fn test_short_header_is_error() {
        let data = [0u8; 10];
        assert!(Message5::decode(&mut ByteCursor::new(&data)).is_err());
    }
}
