//! Common types and utilities shared across the pg-wms crates.

pub mod bbox;
pub mod crs;
pub mod db;
pub mod error;
pub mod style;
pub mod tile;

pub use bbox::BoundingBox;
pub use crs::Srid;
pub use db::ConnectionParams;
pub use error::{WmsError, WmsResult};
pub use style::normalize_color;
pub use tile::{tile_to_bbox, TileCoord, TileFormat, EARTH_CIRCUMFERENCE};
