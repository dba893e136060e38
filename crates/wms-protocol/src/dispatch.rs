//! Request normalization.
//!
//! A request is either a raw WMS query string, forwarded as-is, or an XYZ
//! tile path, expanded into a full `GetMap` parameter set. The two modes are
//! mutually exclusive.

use std::collections::BTreeMap;

use wms_common::tile::TILE_SIZE;
use wms_common::{Srid, TileCoord, TileFormat, WmsError, WmsResult};

/// WMS version used for synthesized tile requests.
pub const TILE_WMS_VERSION: &str = "1.1.1";

/// A parsed `/tile/{layers}/{z}/{x}/{y}{.png|.jpg}` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePath {
    /// Comma-separated layer names, as given
    pub layers: String,
    pub tile: TileCoord,
    pub format: TileFormat,
}

impl TilePath {
    /// Parse the raw path segments. The last segment carries the row and the
    /// image suffix (`216.png`).
    pub fn parse(layers: &str, z: &str, x: &str, y_with_suffix: &str) -> WmsResult<Self> {
        let (y, suffix) = match y_with_suffix.find('.') {
            Some(dot) => y_with_suffix.split_at(dot),
            None => return Err(WmsError::UnsupportedFormat("(no suffix)".to_string())),
        };
        let format = TileFormat::from_suffix(suffix)?;

        let z = z
            .parse::<u32>()
            .map_err(|_| WmsError::invalid_parameter("z", format!("'{}' is not a zoom level", z)))?;
        let x = parse_index("x", x)?;
        let y = parse_index("y", y)?;

        Ok(Self {
            layers: layers.to_string(),
            tile: TileCoord::new(z, x, y),
            format,
        })
    }
}

fn parse_index(name: &str, value: &str) -> WmsResult<i64> {
    value
        .parse::<i64>()
        .map_err(|_| WmsError::invalid_parameter(name, format!("'{}' is not a tile index", value)))
}

/// The parameter set handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedRequest {
    params: BTreeMap<String, String>,
    tile: Option<TileCoord>,
}

impl NormalizedRequest {
    /// Case-insensitive parameter lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Tile coordinate for requests that came in as a tile path.
    pub fn tile(&self) -> Option<TileCoord> {
        self.tile
    }

    /// Non-empty names from the `LAYERS` parameter.
    pub fn layers(&self) -> Vec<&str> {
        self.get("LAYERS")
            .map(|l| l.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Upper-cased `REQUEST` value, if any.
    pub fn request_type(&self) -> Option<String> {
        self.get("REQUEST").map(str::to_ascii_uppercase)
    }
}

/// Build the renderer parameters for a request.
///
/// With a tile path the raw query is ignored and a `GetMap` for the tile's
/// Web Mercator bounds is synthesized. Otherwise the raw parameters pass
/// through unchanged.
pub fn normalize(
    raw: impl IntoIterator<Item = (String, String)>,
    tile_path: Option<&TilePath>,
) -> NormalizedRequest {
    let Some(path) = tile_path else {
        return NormalizedRequest {
            params: raw.into_iter().collect(),
            tile: None,
        };
    };

    let size = TILE_SIZE.to_string();
    let params = [
        ("SERVICE", "WMS".to_string()),
        ("REQUEST", "GetMap".to_string()),
        ("VERSION", TILE_WMS_VERSION.to_string()),
        ("TRANSPARENT", "true".to_string()),
        ("HEIGHT", size.clone()),
        ("WIDTH", size),
        ("SRS", Srid::WEB_MERCATOR.to_string()),
        ("FORMAT", path.format.mime_type().to_string()),
        ("LAYERS", path.layers.clone()),
        ("BBOX", path.tile.bbox().to_wms_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    NormalizedRequest {
        params,
        tile: Some(path.tile),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tile_path() {
        let path = TilePath::parse("mylayer", "9", "141", "216.png").unwrap();
        assert_eq!(path.tile, TileCoord::new(9, 141, 216));
        assert_eq!(path.format, TileFormat::Png);
        assert_eq!(path.layers, "mylayer");
    }

    #[test]
    fn test_parse_tile_path_errors() {
        assert!(matches!(
            TilePath::parse("l", "9", "141", "216.gif"),
            Err(WmsError::UnsupportedFormat(ref s)) if s == ".gif"
        ));
        assert!(matches!(
            TilePath::parse("l", "9", "141", "216"),
            Err(WmsError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            TilePath::parse("l", "9", "abc", "216.png"),
            Err(WmsError::InvalidParameter { ref param, .. }) if param == "x"
        ));
        assert!(matches!(
            TilePath::parse("l", "-1", "0", "0.jpg"),
            Err(WmsError::InvalidParameter { ref param, .. }) if param == "z"
        ));
    }

    #[test]
    fn test_raw_parameters_pass_through() {
        let raw = vec![
            ("REQUEST".to_string(), "GetCapabilities".to_string()),
            ("service".to_string(), "WMS".to_string()),
        ];
        let normalized = normalize(raw, None);
        assert_eq!(normalized.params().len(), 2);
        assert_eq!(normalized.get("SERVICE"), Some("WMS"));
        assert_eq!(normalized.params().get("service").map(String::as_str), Some("WMS"));
        assert_eq!(normalized.request_type().as_deref(), Some("GETCAPABILITIES"));
        assert!(normalized.tile().is_none());
    }

    #[test]
    fn test_layers_split() {
        let normalized = normalize(
            vec![("layers".to_string(), "a, b,,c".to_string())],
            None,
        );
        assert_eq!(normalized.layers(), vec!["a", "b", "c"]);
    }
}
