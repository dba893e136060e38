//! Raster pyramid level selection.

use serde::{Deserialize, Serialize};
use wms_common::{WmsError, WmsResult};

/// Decimation levels available when none are configured.
pub const DEFAULT_PYRAMID_LEVELS: [u32; 6] = [1, 2, 4, 8, 16, 32];

/// Level requested when the client does not send a `level` parameter.
///
/// The tile zoom is not consulted, so this always lands on the finest level.
pub const FALLBACK_REQUESTED_LEVEL: i64 = 0;

/// Pick the level closest to `requested` by absolute difference.
///
/// Ties go to the first minimal element in iteration order, so for an
/// ascending slice the smaller level wins. Returns `None` for an empty slice.
pub fn closest_level(levels: &[u32], requested: i64) -> Option<u32> {
    levels
        .iter()
        .copied()
        .min_by_key(|level| i64::from(*level).abs_diff(requested))
}

/// A non-empty, ascending set of supported pyramid levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct PyramidLevels(Vec<u32>);

impl PyramidLevels {
    pub fn new(mut levels: Vec<u32>) -> WmsResult<Self> {
        if levels.is_empty() {
            return Err(WmsError::MisconfiguredMap(
                "pyramid levels must not be empty".to_string(),
            ));
        }
        levels.sort_unstable();
        levels.dedup();
        Ok(Self(levels))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Closest supported level to `requested`.
    pub fn closest(&self, requested: i64) -> u32 {
        // Non-empty by construction.
        closest_level(&self.0, requested).unwrap_or(self.0[0])
    }

    /// Resolve the raw `level` query parameter to a supported level.
    pub fn select(&self, level_param: Option<&str>) -> WmsResult<u32> {
        let requested = match level_param {
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                WmsError::invalid_parameter("level", format!("'{}' is not an integer", raw))
            })?,
            None => FALLBACK_REQUESTED_LEVEL,
        };
        Ok(self.closest(requested))
    }
}

impl Default for PyramidLevels {
    fn default() -> Self {
        Self(DEFAULT_PYRAMID_LEVELS.to_vec())
    }
}

impl TryFrom<Vec<u32>> for PyramidLevels {
    type Error = WmsError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        PyramidLevels::new(value)
    }
}

impl From<PyramidLevels> for Vec<u32> {
    fn from(value: PyramidLevels) -> Self {
        value.0
    }
}
