//! Error types for pg-wms services.

use thiserror::Error;

/// Result type alias using WmsError.
pub type WmsResult<T> = Result<T, WmsError>;

/// Primary error type for WMS operations.
#[derive(Debug, Error)]
pub enum WmsError {
    // === WMS Protocol Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Requested format not supported: {0}")]
    UnsupportedFormat(String),

    // === Map Construction Errors ===
    #[error("No spatial field found on '{table}'{}", field.as_ref().map(|f| format!(" (requested field '{}')", f)).unwrap_or_default())]
    NoSpatialFieldFound {
        table: String,
        field: Option<String>,
    },

    #[error("Duplicate layer name: {0}")]
    DuplicateLayerName(String),

    #[error("Misconfigured map: {0}")]
    MisconfiguredMap(String),

    // === Infrastructure Errors ===
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Rendering failed: {0}")]
    RenderError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl WmsError {
    /// Get the OGC WMS exception code for this error.
    pub fn wms_exception_code(&self) -> &'static str {
        match self {
            WmsError::MissingParameter(_) => "MissingParameterValue",
            WmsError::InvalidParameter { .. } => "InvalidParameterValue",
            WmsError::LayerNotFound(_) => "LayerNotDefined",
            WmsError::UnsupportedFormat(_) => "InvalidFormat",
            _ => "NoApplicableCode",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            WmsError::MissingParameter(_)
            | WmsError::InvalidParameter { .. }
            | WmsError::UnsupportedFormat(_) => 400,

            WmsError::LayerNotFound(_) => 404,

            WmsError::RenderError(_) => 502,

            _ => 500,
        }
    }

    /// Shorthand for an `InvalidParameter` error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        WmsError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for WmsError {
    fn from(err: std::io::Error) -> Self {
        WmsError::InternalError(err.to_string())
    }
}
