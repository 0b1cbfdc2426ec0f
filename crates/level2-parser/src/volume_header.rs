//! Archive II volume header (the first 24 bytes of a volume file).

use chrono::{DateTime, Duration, Utc};

use crate::cursor::ByteCursor;
use crate::error::{Level2Error, Level2Result};

/// Size of the volume header in bytes.
pub const VOLUME_HEADER_SIZE: usize = 24;

/// Tape identifier prefix shared by every Archive II version.
pub const ARCHIVE_TAPE_PREFIX: &[u8; 4] = b"AR2V";

/// Volume header: tape[9], extension[3], julian date, ms of day, icao[4].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeHeader {
    pub tape: [u8; 9],
    pub extension: [u8; 3],
    pub julian_date: u32,
    pub time_ms: u32,
    pub icao: [u8; 4],
}

impl VolumeHeader {
    /// Parse the header from the start of `data`.
    pub fn parse(data: &[u8]) -> Level2Result<Self> {
        if data.len() < VOLUME_HEADER_SIZE {
            return Err(Level2Error::TruncatedVolumeHeader(data.len()));
        }

        let mut cursor = ByteCursor::new(data);
        Ok(Self {
            tape: cursor.read_array("volume header")?,
            extension: cursor.read_array("volume header")?,
            julian_date: cursor.read_u32("volume header")?,
            time_ms: cursor.read_u32("volume header")?,
            icao: cursor.read_array("volume header")?,
        })
    }

    /// Tape identifier as text, e.g. `AR2V0006.`
    pub fn version(&self) -> String {
        String::from_utf8_lossy(&self.tape).into_owned()
    }

    /// Volume sequence extension, e.g. `001`
    pub fn extension(&self) -> String {
        String::from_utf8_lossy(&self.extension).into_owned()
    }

    /// Site ICAO, or `None` when the field is blank (streaming chunks).
    pub fn icao(&self) -> Option<String> {
        icao_from_bytes(&self.icao)
    }

    /// Volume start time: epoch + julian days + milliseconds of day.
    pub fn date_time(&self) -> DateTime<Utc> {
        julian_to_datetime(self.julian_date, self.time_ms)
    }
}

/// Whether `data` starts with an Archive II tape identifier.
pub fn is_archive_header(data: &[u8]) -> bool {
    data.len() >= VOLUME_HEADER_SIZE && data.starts_with(ARCHIVE_TAPE_PREFIX)
}

/// Convert a Level II (julian date, ms of day) pair to UTC.
pub fn julian_to_datetime(julian_date: u32, time_ms: u32) -> DateTime<Utc> {
    DateTime::<Utc>::default()
        + Duration::days(julian_date as i64)
        + Duration::milliseconds(time_ms as i64)
}

/// Trimmed ASCII ICAO; blank or NUL-filled fields yield `None`.
pub(crate) fn icao_from_bytes(bytes: &[u8]) -> Option<String> {
    let icao = String::from_utf8_lossy(bytes)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string();
    if icao.is_empty() {
        None
    } else {
        Some(icao)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn header_bytes() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"AR2V0006.");
        data.extend_from_slice(b"001");
        data.extend_from_slice(&19_814u32.to_be_bytes());
        data.extend_from_slice(&78_417_000u32.to_be_bytes());
        data.extend_from_slice(b"KTLX");
        data
    }

    #[test]
    fn test_parse_volume_header() {
        let header = VolumeHeader::parse(&header_bytes()).unwrap();

        assert_eq!(header.version(), "AR2V0006.");
        assert_eq!(header.extension(), "001");
        assert_eq!(header.julian_date, 19_814);
        assert_eq!(header.icao(), Some("KTLX".to_string()));
    }

    #[test]
    fn test_date_time_adds_days_and_millis() {
        let header = VolumeHeader::parse(&header_bytes()).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 4, 1, 21, 46, 57).unwrap();
        assert_eq!(header.date_time(), expected);
    }

    #[test]
    fn test_blank_icao_is_none() {
        let mut data = header_bytes();
        data[20..24].copy_from_slice(&[0, 0, 0, 0]);
        assert_eq!(VolumeHeader::parse(&data).unwrap().icao(), None);

        data[20..24].copy_from_slice(b"    ");
        assert_eq!(VolumeHeader::parse(&data).unwrap().icao(), None);
    }

    #[test]
    fn test_truncated_header() {
        let data = header_bytes();
        let err = VolumeHeader::parse(&data[..10]).unwrap_err();
        assert!(matches!(err, Level2Error::TruncatedVolumeHeader(10)));
        assert!(err.is_framing());
    }

    #[test]
    fn test_is_archive_header() {
        assert!(is_archive_header(&header_bytes()));
        assert!(!is_archive_header(&[0u8; 24]));
        assert!(!is_archive_header(b"AR2V"));
    }
}
