//! Format profiles describing the small layout deltas between radar families.
//!
//! NEXRAD (WSR-88D) and TDWR share the Archive II framing and the message 31
//! layout. They differ only in the length of the VOL and RAD calibration blocks
//! and in which moments they transmit. One decoder handles both, driven by a
//! profile selected once from the volume header's tape identifier.

use crate::product::Product;

/// Radar family a chunk was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadarKind {
    Nexrad,
    Tdwr,
}

/// Layout parameters for one radar family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatProfile {
    pub kind: RadarKind,
    /// Tape identifier written by this family.
    pub tape: &'static [u8; 9],
    /// Byte length of the VOL block.
    pub volume_block_len: usize,
    /// Byte length of the RAD block.
    pub radial_block_len: usize,
    /// Moment tags decoded for this family; other tags are ignored.
    pub products: &'static [Product],
}

const NEXRAD_PRODUCTS: &[Product] = &[
    Product::Reflectivity,
    Product::Velocity,
    Product::ClutterFilterPower,
    Product::SpectrumWidth,
    Product::DifferentialReflectivity,
    Product::DifferentialPhase,
    Product::CorrelationCoefficient,
];

const TDWR_PRODUCTS: &[Product] = &[
    Product::Reflectivity,
    Product::Velocity,
    Product::SpectrumWidth,
];

impl FormatProfile {
    pub const NEXRAD: FormatProfile = FormatProfile {
        kind: RadarKind::Nexrad,
        tape: b"AR2V0006.",
        volume_block_len: 52,
        radial_block_len: 28,
        products: NEXRAD_PRODUCTS,
    };

    pub const TDWR: FormatProfile = FormatProfile {
        kind: RadarKind::Tdwr,
        tape: b"AR2V0008.",
        volume_block_len: 44,
        radial_block_len: 8,
        products: TDWR_PRODUCTS,
    };

    /// Pick the profile for a tape identifier. Unrecognised tapes fall back to NEXRAD.
    pub fn from_tape(tape: &[u8; 9]) -> Self {
        if tape == Self::TDWR.tape {
            Self::TDWR
        } else {
            Self::NEXRAD
        }
    }

    pub fn decodes(&self, product: Product) -> bool {
        self.products.contains(&product)
    }
}

impl Default for FormatProfile {
    fn default() -> Self {
        Self::NEXRAD
    }
}
