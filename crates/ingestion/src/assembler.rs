//! Per-chunk scan assembly.
//!
//! Radials decoded from one chunk are grouped by elevation number and turned
//! into one [`Scan`] fragment per (elevation, product). Fragments are merged
//! across chunks by the accumulator.

use chrono::{DateTime, Utc};
use level2_parser::{Message31, Product};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of an in-flight scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScanKey {
    pub site: String,
    pub product: Product,
    pub elevation: u8,
}

impl ScanKey {
    pub fn new(site: impl Into<String>, product: Product, elevation: u8) -> Self {
        Self {
            site: site.into(),
            product,
            elevation,
        }
    }
}

impl fmt::Display for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.site, self.product, self.elevation)
    }
}

/// One product on one elevation: a sequence of gate rows, one per radial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub icao: String,
    #[serde(rename = "productType")]
    pub product: Product,
    /// Mean elevation angle of the radials (degrees).
    #[serde(rename = "elevationAngle")]
    pub elevation_angle: f32,
    #[serde(rename = "elevationNumber")]
    pub elevation_number: u8,
    /// Azimuth of the first row (degrees).
    #[serde(rename = "startAngle")]
    pub start_azimuth: f32,
    #[serde(skip)]
    pub start_azimuth_number: u16,
    /// Degrees between radials.
    #[serde(rename = "azimuthResolution")]
    pub azimuth_resolution: f32,
    /// Range to the first gate (km).
    #[serde(rename = "startRange")]
    pub start_range: f32,
    /// Gate spacing (km).
    #[serde(rename = "gateInterval")]
    pub gate_interval: f32,
    pub lat: f32,
    pub lon: f32,
    pub gates: Vec<Vec<f32>>,
    pub init_time: DateTime<Utc>,
    #[serde(skip)]
    pub eoe: bool,
    #[serde(skip)]
    pub eov: bool,
}

impl Scan {
    pub fn key(&self) -> ScanKey {
        ScanKey::new(self.icao.clone(), self.product, self.elevation_number)
    }

    pub fn rows(&self) -> usize {
        self.gates.len()
    }

    /// End of elevation or end of volume has been seen.
    pub fn is_flagged_complete(&self) -> bool {
        self.eoe || self.eov
    }

    /// Append a later fragment of the same scan.
    ///
    /// Rows keep call order; flags are ORed. Geometry of the first fragment wins,
    /// except that coordinates missing so far are taken from the later one.
    pub fn append(&mut self, fragment: Scan) {
        self.gates.extend(fragment.gates);
        self.eoe |= fragment.eoe;
        self.eov |= fragment.eov;
        if self.lat == 0.0 && self.lon == 0.0 {
            self.lat = fragment.lat;
            self.lon = fragment.lon;
        }
    }
}

/// Build scan fragments from the radials of one chunk.
///
/// Output is ordered by elevation number, then product.
pub fn assemble(radials: &[Message31], icao: &str, init_time: DateTime<Utc>) -> Vec<Scan> {
    let mut groups: BTreeMap<u8, Vec<&Message31>> = BTreeMap::new();
    for radial in radials {
        groups.entry(radial.elevation_number()).or_default().push(radial);
    }

    let mut scans = Vec::new();
    for (elevation_number, group) in groups {
        scans.extend(assemble_elevation(elevation_number, &group, icao, init_time));
    }
    scans
}

fn assemble_elevation(
    elevation_number: u8,
    group: &[&Message31],
    icao: &str,
    init_time: DateTime<Utc>,
) -> Vec<Scan> {
    let Some(first) = group.first() else {
        return Vec::new();
    };

    let angle_sum: f32 = group.iter().map(|r| r.header.elevation_angle).sum();
    let elevation_angle = angle_sum / group.len() as f32;
    let azimuth_resolution = first.azimuth_resolution().degrees();
    let (lat, lon) = group
        .iter()
        .find_map(|r| r.volume.as_ref().and_then(|v| v.coordinates()))
        .unwrap_or((0.0, 0.0));

    let mut eoe = false;
    let mut eov = false;
    for radial in group {
        let status = radial.status();
        eoe |= status.is_end_of_elevation();
        eov |= status.is_end_of_volume();
    }

    let mut by_product: BTreeMap<Product, Scan> = BTreeMap::new();
    for radial in group {
        for (product, moment) in &radial.moments {
            by_product
                .entry(*product)
                .or_insert_with(|| Scan {
                    icao: icao.to_string(),
                    product: *product,
                    elevation_angle,
                    elevation_number,
                    start_azimuth: radial.header.azimuth_angle,
                    start_azimuth_number: radial.header.azimuth_number,
                    azimuth_resolution,
                    start_range: moment.start_range_km(),
                    gate_interval: moment.gate_interval_km(),
                    lat,
                    lon,
                    gates: Vec::new(),
                    init_time,
                    eoe,
                    eov,
                })
                .gates
                .push(moment.data.clone());
        }
    }

    by_product.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use level2_parser::FormatProfile;
    use test_utils::{assert_approx_eq, site, Message31Builder};

    fn radial(builder: Message31Builder) -> Message31 {
        Message31::decode(&builder.build_body(), 0, &FormatProfile::NEXRAD).unwrap()
    }

    #[test]
    fn test_scan_json_field_names() {
        let scans = assemble(
            &[radial(Message31Builder::new().reflectivity(&[10], 2.0, 0.0))],
            site::ICAO,
            DateTime::<Utc>::default(),
        );
        let json = serde_json::to_value(&scans[0]).unwrap();

        assert_eq!(json["productType"], "REF");
        assert_eq!(json["elevationNumber"], 1);
        assert!(json.get("startAngle").is_some());
        assert!(json.get("gates").is_some());
        assert!(json.get("init_time").is_some());
        assert!(json.get("eoe").is_none());
        assert!(json.get("start_azimuth_number").is_none());
    }

    #[test]
    fn test_append_keeps_first_geometry() {
        let mut a = assemble(
            &[radial(Message31Builder::new().azimuth(1, 10.0).reflectivity(&[10], 2.0, 0.0))],
            site::ICAO,
            DateTime::<Utc>::default(),
        )
        .remove(0);
        let b = assemble(
            &[radial(
                Message31Builder::new()
                    .azimuth(2, 10.5)
                    .status(2)
                    .reflectivity(&[20], 2.0, 0.0),
            )],
            site::ICAO,
            DateTime::<Utc>::default(),
        )
        .remove(0);

        a.append(b);
        assert_eq!(a.start_azimuth, 10.0);
        assert_eq!(a.gates, vec![vec![5.0], vec![10.0]]);
        assert!(a.eoe);
        assert!(!a.eov);
    }

    #[test]
    fn test_elevation_geometry_and_order() {
        let radials = [
            radial(
                Message31Builder::new()
                    .elevation(2, 1.4)
                    .azimuth(1, 0.0)
                    .azimuth_resolution(2)
                    .without_volume_block()
                    .status(0)
                    .reflectivity(&[10], 2.0, 0.0)
                    .velocity(&[129], 2.0, 129.0),
            ),
            radial(
                Message31Builder::new()
                    .elevation(1, 0.4)
                    .azimuth(1, 10.0)
                    .azimuth_resolution(1)
                    .site_location(0.0, 0.0)
                    .status(1)
                    .reflectivity(&[20], 2.0, 0.0),
            ),
            radial(
                Message31Builder::new()
                    .elevation(1, 0.6)
                    .azimuth(2, 10.5)
                    .azimuth_resolution(2)
                    .status(2)
                    .reflectivity(&[30], 2.0, 0.0),
            ),
            radial(
                Message31Builder::new()
                    .elevation(2, 1.6)
                    .azimuth(2, 1.0)
                    .azimuth_resolution(1)
                    .site_location(36.0, -98.0)
                    .status(1)
                    .reflectivity(&[40], 2.0, 0.0)
                    .velocity(&[131], 2.0, 129.0),
            ),
        ];

        let scans = assemble(&radials, site::ICAO, DateTime::<Utc>::default());
        let keys: Vec<(u8, Product)> = scans
            .iter()
            .map(|s| (s.elevation_number, s.product))
            .collect();
        assert_eq!(
            keys,
            vec![
                (1, Product::Reflectivity),
                (2, Product::Reflectivity),
                (2, Product::Velocity),
            ]
        );

        let low = &scans[0];
        assert_approx_eq!(low.elevation_angle, 0.5, 1e-5);
        assert_eq!(low.azimuth_resolution, 0.5);
        assert_eq!(low.start_azimuth, 10.0);
        assert_eq!(low.start_azimuth_number, 1);
        assert_eq!((low.lat, low.lon), (site::LATITUDE, site::LONGITUDE));
        assert_eq!(low.gates, vec![vec![10.0], vec![15.0]]);
        assert!(low.eoe);
        assert!(!low.eov);

        for high in &scans[1..] {
            assert_approx_eq!(high.elevation_angle, 1.5, 1e-5);
            assert_eq!(high.azimuth_resolution, 1.0);
            assert_eq!(high.start_azimuth, 0.0);
            assert_eq!((high.lat, high.lon), (36.0, -98.0));
            assert_eq!(high.rows(), 2);
            assert!(!high.eoe);
            assert!(!high.eov);
        }
        assert_eq!(scans[2].gates, vec![vec![0.0], vec![1.0]]);
    }

    #[test]
    fn test_end_of_volume_and_missing_location() {
        let radials = [
            radial(
                Message31Builder::new()
                    .without_volume_block()
                    .status(1)
                    .reflectivity(&[10], 2.0, 0.0),
            ),
            radial(
                Message31Builder::new()
                    .site_location(0.0, 0.0)
                    .status(4)
                    .reflectivity(&[20], 2.0, 0.0),
            ),
        ];

        let scans = assemble(&radials, site::ICAO, DateTime::<Utc>::default());
        assert_eq!(scans.len(), 1);
        assert_eq!((scans[0].lat, scans[0].lon), (0.0, 0.0));
        assert!(scans[0].eoe);
        assert!(scans[0].eov);
    }
}
