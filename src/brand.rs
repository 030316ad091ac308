//! Brand identities and their color palettes.

use std::fmt;
use std::str::FromStr;

use palette::{Srgb, Srgba};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One of the two fixed visual identities a signature can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum Brand {
    #[default]
    #[serde(alias = "Pentec", alias = "PENTEC")]
    Pentec,
    #[serde(alias = "Samoo", alias = "SAMOO")]
    Samoo,
}

impl Brand {
    pub const ALL: [Brand; 2] = [Brand::Pentec, Brand::Samoo];

    /// Lower-case identifier, used in file names and asset names.
    pub fn slug(self) -> &'static str {
        match self {
            Brand::Pentec => "pentec",
            Brand::Samoo => "samoo",
        }
    }

    /// File name of the brand's default background template.
    pub fn background_file(self) -> &'static str {
        match self {
            Brand::Pentec => "BG_pentec.png",
            Brand::Samoo => "BG_samoo.png",
        }
    }

    pub fn palette(self) -> BrandPalette {
        match self {
            Brand::Pentec => BrandPalette {
                primary: Srgb::new(0x1e, 0x64, 0xa5),
                text_main: Srgb::new(0x1e, 0x64, 0xa5),
                text_secondary: Srgba::new(85, 85, 85, 204),
                accent: Srgb::new(0x1e, 0x64, 0xa5),
                fallback_fill: Srgb::new(0xff, 0xff, 0xff),
            },
            Brand::Samoo => BrandPalette {
                primary: Srgb::new(0xc1, 0x53, 0x84),
                text_main: Srgb::new(0xff, 0xff, 0xff),
                text_secondary: Srgba::new(255, 255, 255, 191),
                accent: Srgb::new(0xc1, 0x53, 0x84),
                fallback_fill: Srgb::new(0x33, 0x33, 0x33),
            },
        }
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Brand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pentec" => Ok(Brand::Pentec),
            "samoo" => Ok(Brand::Samoo),
            other => Err(Error::InvalidRequest(format!("unknown brand: {other}"))),
        }
    }
}

/// The colors a brand paints with.
///
/// `primary` is UI chrome only and never touches the canvas. The divider and
/// the contact lines share `text_secondary`; the photo ring uses `accent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrandPalette {
    pub primary: Srgb<u8>,
    pub text_main: Srgb<u8>,
    pub text_secondary: Srgba<u8>,
    pub accent: Srgb<u8>,
    /// Flat fill used when the background template fails to load.
    pub fallback_fill: Srgb<u8>,
}

/// Formats a color as `#rrggbb`.
pub fn hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Pentec".parse::<Brand>().unwrap(), Brand::Pentec);
        assert_eq!(" SAMOO ".parse::<Brand>().unwrap(), Brand::Samoo);
        assert!("acme".parse::<Brand>().is_err());
    }

    #[test]
    fn serde_accepts_original_casing() {
        let brand: Brand = serde_json::from_str("\"Samoo\"").unwrap();
        assert_eq!(brand, Brand::Samoo);
        assert_eq!(serde_json::to_string(&Brand::Pentec).unwrap(), "\"pentec\"");
    }

    #[test]
    fn fallback_fills_differ_per_brand() {
        assert_eq!(hex(Brand::Pentec.palette().fallback_fill), "#ffffff");
        assert_eq!(hex(Brand::Samoo.palette().fallback_fill), "#333333");
    }

    #[test]
    fn accent_matches_primary() {
        for brand in Brand::ALL {
            let palette = brand.palette();
            assert_eq!(palette.accent, palette.primary);
        }
    }
}
