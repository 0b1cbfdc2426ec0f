//! Common test fixtures for Level II tests.
//!
//! Values describe a plausible real-time volume so tests across crates agree
//! on site, time and pattern without repeating literals.

/// The NEXRAD site used by default builders.
pub mod site {
    /// Oklahoma City/Twin Lakes
    pub const ICAO: &str = "KTLX";

    pub const LATITUDE: f32 = 35.333;
    pub const LONGITUDE: f32 = -97.278;

    /// Precipitation-mode pattern used by the fixture volume.
    pub const VCP: u16 = 212;

    /// Days since 1970-01-01 for 2024-04-01.
    pub const JULIAN_DATE: u32 = 19_814;

    /// 21:46:57 UTC in milliseconds of day.
    pub const TIME_MS: u32 = 78_417_000;

    /// `YYYYMMDDHHMMSS` + ICAO for the fixture volume.
    pub const VOLUME_ID: &str = "20240401214657KTLX";
}

/// A TDWR site.
pub mod tdwr {
    /// Dallas Love Field
    pub const ICAO: &str = "TDAL";

    pub const TAPE: &str = "AR2V0008.";

    pub const LATITUDE: f32 = 32.926;
    pub const LONGITUDE: f32 = -96.968;

    pub const VCP: u16 = 80;
}

/// Real-time chunk object names for the fixture volume.
pub mod chunks {
    pub const START: &str = "20240401-214657-001-S";
    pub const INTERMEDIATE: &str = "20240401-214657-002-I";
    pub const END: &str = "20240401-214657-003-E";

    /// Full object key as it appears in the bucket.
    pub const START_KEY: &str = "KTLX/1/20240401-214657-001-S";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_id_matches_site() {
        assert!(site::VOLUME_ID.ends_with(site::ICAO));
        assert!(chunks::START_KEY.ends_with(chunks::START));
    }
}
