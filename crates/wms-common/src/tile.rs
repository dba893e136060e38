//! XYZ ("slippy map") tile addressing on the Web Mercator grid.

use crate::{BoundingBox, WmsError, WmsResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Equatorial circumference of the WGS84 ellipsoid in meters.
pub const EARTH_CIRCUMFERENCE: f64 = 2.0 * PI * 6378137.0;

/// Edge length of a rendered tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// A tile coordinate (z/x/y).
///
/// Indices are signed and unchecked: any x/y yields a bounding box, even if it
/// lies outside the grid for that zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: i64,
    /// Row (y), 0 is the northernmost row
    pub y: i64,
}

impl TileCoord {
    pub fn new(z: u32, x: i64, y: i64) -> Self {
        Self { z, x, y }
    }

    /// Web Mercator bounds of this tile.
    pub fn bbox(&self) -> BoundingBox {
        tile_to_bbox(self.x, self.y, self.z)
    }
}

/// Compute the Web Mercator bounding box of tile `(x, y)` at zoom `z`.
///
/// Row 0 is at the top of the grid while projected Y grows northward, so the
/// Y axis is flipped relative to X.
pub fn tile_to_bbox(x: i64, y: i64, z: u32) -> BoundingBox {
    let half = EARTH_CIRCUMFERENCE / 2.0;
    let tile_size = EARTH_CIRCUMFERENCE / (z as f64).exp2();

    let x = x as f64;
    let y = y as f64;

    BoundingBox::new(
        x * tile_size - half,
        half - (y + 1.0) * tile_size,
        (x + 1.0) * tile_size - half,
        half - y * tile_size,
    )
}

/// Image formats addressable through a tile path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileFormat {
    Png,
    Jpeg,
}

impl TileFormat {
    /// Map a path suffix (with leading dot) to a format.
    pub fn from_suffix(suffix: &str) -> WmsResult<Self> {
        match suffix {
            ".png" => Ok(TileFormat::Png),
            ".jpg" => Ok(TileFormat::Jpeg),
            other => Err(WmsError::UnsupportedFormat(other.to_string())),
        }
    }

    /// MIME type sent as the WMS `FORMAT` parameter.
    pub fn mime_type(&self) -> &'static str {
        match self {
            TileFormat::Png => "image/png",
            TileFormat::Jpeg => "image/jpeg",
        }
    }
}
