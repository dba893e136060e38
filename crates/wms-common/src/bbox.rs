//! Axis-aligned extents in map units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An extent in the units of its reference system (degrees for EPSG:4326,
/// meters for Web Mercator).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse the WMS `BBOX` wire form `minx,miny,maxx,maxy`.
    pub fn from_wms_string(s: &str) -> Result<Self, BboxParseError> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match values.as_slice() {
            &[min_x, min_y, max_x, max_y] => Ok(Self::new(min_x, min_y, max_x, max_y)),
            _ => Err(BboxParseError::InvalidFormat(s.to_string())),
        }
    }

    /// The WMS `BBOX` wire form. Coordinates use the shortest decimal that
    /// parses back to the same `f64`.
    pub fn to_wms_string(&self) -> String {
        self.to_string()
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl FromStr for BoundingBox {
    type Err = BboxParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wms_string(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wms_bbox() {
        let bbox: BoundingBox = "-180, -90,180,90".parse().unwrap();
        assert_eq!(bbox, BoundingBox::new(-180.0, -90.0, 180.0, 90.0));
        assert_eq!(bbox.width(), 360.0);

        assert!(matches!(
            BoundingBox::from_wms_string("1,2,3"),
            Err(BboxParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            BoundingBox::from_wms_string("1,2,x,4"),
            Err(BboxParseError::InvalidNumber(ref p)) if p == "x"
        ));
    }

    #[test]
    fn test_wms_string_keeps_full_precision() {
        let bbox = BoundingBox::new(-20037508.342789244, 0.5, 1.0e-3, 20037508.342789244);
        assert_eq!(
            bbox.to_wms_string(),
            "-20037508.342789244,0.5,0.001,20037508.342789244"
        );
        assert_eq!(BoundingBox::from_wms_string(&bbox.to_wms_string()).unwrap(), bbox);
    }
}
