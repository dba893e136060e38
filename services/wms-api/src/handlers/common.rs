//! Shared pieces of the WMS and tile handlers.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{error, warn};

use wms_common::{WmsError, WmsResult};
use wms_map::RequestContext;
use wms_protocol::{service_exception_xml, NormalizedRequest};

use crate::backend::RenderedOutput;
use crate::metrics;
use crate::state::AppState;

// ============================================================================
// Exception Helpers
// ============================================================================

/// Generate a WMS-formatted exception response
pub fn wms_exception(code: &str, msg: &str, status: StatusCode) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/xml")],
        service_exception_xml(code, msg),
    )
        .into_response()
}

/// Map an error to its exception report and HTTP status.
pub fn error_response(err: &WmsError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        warn!(error = %err, "Request rejected");
    }
    metrics::record_request_error(err.wms_exception_code());
    wms_exception(err.wms_exception_code(), &err.to_string(), status)
}

/// `{scheme}://{host}{path}?`, the endpoint advertised in capabilities.
///
/// The scheme comes from `X-Forwarded-Proto` when a proxy terminates TLS in
/// front of the service, and defaults to `http`.
pub fn online_resource(headers: &HeaderMap, path: &str) -> Option<String> {
    let host = headers.get(header::HOST)?.to_str().ok()?;
    Some(format!("{}://{}{}?", request_scheme(headers), host, path))
}

fn request_scheme(headers: &HeaderMap) -> &'static str {
    let forwarded = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim);
    match forwarded {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Assemble the map for `ctx` and hand it to the render back end.
pub async fn render(
    state: &AppState,
    request: &NormalizedRequest,
    ctx: &RequestContext,
    online_resource: Option<String>,
) -> WmsResult<RenderedOutput> {
    let map = state.assemble(ctx, online_resource)?;

    if let Some(name) = map.missing_layers(request.layers()).first() {
        return Err(WmsError::LayerNotFound(name.to_string()));
    }

    let start = Instant::now();
    let result = state.backend.render(&map, request).await;
    metrics::record_render(start.elapsed(), result.is_ok());
    result
}

/// Turn a render result into an HTTP response.
pub fn render_response(result: WmsResult<RenderedOutput>) -> Response {
    match result {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, output.content_type)],
            output.bytes,
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}
