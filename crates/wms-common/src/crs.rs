//! Spatial reference identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An EPSG spatial reference identifier (SRID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Srid(pub u32);

impl Srid {
    /// WGS84 geographic (degrees).
    pub const WGS84: Srid = Srid(4326);
    /// Web Mercator (meters), the XYZ tile grid.
    pub const WEB_MERCATOR: Srid = Srid(3857);

    /// Projection string in the `init=epsg:NNNN` form MapServer expects.
    pub fn init_string(&self) -> String {
        format!("init=epsg:{}", self.0)
    }

    /// Lowercase `epsg:NNNN` form used in `wms_srs` metadata.
    pub fn metadata_string(&self) -> String {
        format!("epsg:{}", self.0)
    }
}

impl fmt::Display for Srid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for Srid {
    type Err = CrsParseError;

    /// Accepts "EPSG:4326", "epsg:4326" or a bare "4326".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = match trimmed.split_once(':') {
            Some((authority, code)) if authority.eq_ignore_ascii_case("epsg") => code,
            Some(_) => return Err(CrsParseError::UnsupportedCrs(s.to_string())),
            None => trimmed,
        };
        code.parse::<u32>()
            .map(Srid)
            .map_err(|_| CrsParseError::UnsupportedCrs(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_srid() {
        assert_eq!("EPSG:4326".parse::<Srid>().unwrap(), Srid::WGS84);
        assert_eq!("epsg:3857".parse::<Srid>().unwrap(), Srid::WEB_MERCATOR);
        assert_eq!("3086".parse::<Srid>().unwrap(), Srid(3086));
        assert!("CRS:84".parse::<Srid>().is_err());
        assert!("EPSG:abc".parse::<Srid>().is_err());
    }

    #[test]
    fn test_srid_formats() {
        assert_eq!(Srid(3086).to_string(), "EPSG:3086");
        assert_eq!(Srid(3086).init_string(), "init=epsg:3086");
        assert_eq!(Srid(3086).metadata_string(), "epsg:3086");
    }
}
