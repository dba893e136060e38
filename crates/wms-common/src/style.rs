//! Color handling for cartography rules.
//!
//! Colors arrive from layer configuration either as `#RRGGBB` literals or as
//! whitespace-separated decimal triples (`"58 112 38"`).

/// Normalize a configured color to a `#rrggbb` hex string.
///
/// Strings starting with `#` pass through unchanged. Anything else must be
/// three whitespace-separated base-10 integers in `0..=255`.
pub fn normalize_color(value: &str) -> Result<String, ColorParseError> {
    if value.starts_with('#') {
        return Ok(value.to_string());
    }

    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(ColorParseError::InvalidFormat(value.to_string()));
    }

    let mut rgb = [0u8; 3];
    for (slot, part) in rgb.iter_mut().zip(&parts) {
        *slot = part
            .parse::<u8>()
            .map_err(|_| ColorParseError::InvalidComponent(part.to_string()))?;
    }

    Ok(format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2]))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("Invalid color '{0}': expected '#RRGGBB' or 'R G B'")]
    InvalidFormat(String),

    #[error("Invalid color component: {0}")]
    InvalidComponent(String),
}
