//! Moment (product) tags carried in message 31 data blocks.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A radar moment, identified on the wire by a 3-character tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Product {
    /// `REF`
    Reflectivity,
    /// `VEL`
    Velocity,
    /// `SW ` (note the trailing space)
    SpectrumWidth,
    /// `ZDR`
    DifferentialReflectivity,
    /// `PHI`
    DifferentialPhase,
    /// `RHO`
    CorrelationCoefficient,
    /// `CFP`
    ClutterFilterPower,
}

impl Product {
    pub const ALL: [Product; 7] = [
        Product::Reflectivity,
        Product::Velocity,
        Product::SpectrumWidth,
        Product::DifferentialReflectivity,
        Product::DifferentialPhase,
        Product::CorrelationCoefficient,
        Product::ClutterFilterPower,
    ];

    /// Wire tag exactly as it appears in the data block.
    pub fn tag(&self) -> &'static str {
        match self {
            Product::Reflectivity => "REF",
            Product::Velocity => "VEL",
            Product::SpectrumWidth => "SW ",
            Product::DifferentialReflectivity => "ZDR",
            Product::DifferentialPhase => "PHI",
            Product::CorrelationCoefficient => "RHO",
            Product::ClutterFilterPower => "CFP",
        }
    }

    /// Look up a product by wire tag. A trimmed `SW` is accepted as well.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "SW" => Some(Product::SpectrumWidth),
            _ => Self::ALL.into_iter().find(|p| p.tag() == tag),
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag().trim_end())
    }
}

impl Serialize for Product {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for Product {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Product::from_tag(&tag)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown moment tag {:?}", tag)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_lookup() {
        for product in Product::ALL {
            assert_eq!(Product::from_tag(product.tag()), Some(product));
        }
        assert_eq!(Product::from_tag("SW"), Some(Product::SpectrumWidth));
        assert_eq!(Product::from_tag("DVL"), None);
    }

    #[test]
    fn test_display_trims_padding() {
        assert_eq!(Product::SpectrumWidth.to_string(), "SW");
        assert_eq!(Product::Reflectivity.to_string(), "REF");
    }
}
