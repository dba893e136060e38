//! WMS endpoint.
//!
//! Query parameters are forwarded to the render back end unchanged; only
//! `REQUEST` is required here.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, Uri},
    response::Response,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use wms_common::WmsError;
use wms_map::RequestContext;
use wms_protocol::normalize;

use super::common::{error_response, online_resource, render, render_response};
use crate::metrics;
use crate::state::AppState;

/// GET /wms
#[instrument(skip(state, headers, params), fields(request = tracing::field::Empty))]
pub async fn wms_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let request = normalize(params, None);

    let Some(request_type) = request.get("REQUEST").map(str::to_string) else {
        return error_response(&WmsError::MissingParameter("REQUEST".to_string()));
    };
    tracing::Span::current().record("request", request_type.as_str());
    metrics::record_wms_request(&request_type);

    let ctx = RequestContext {
        tile: None,
        level: request.get("level").map(str::to_string),
    };
    debug!(layers = ?request.layers(), "WMS request");

    let result = render(&state, &request, &ctx, online_resource(&headers, uri.path())).await;
    render_response(result)
}
