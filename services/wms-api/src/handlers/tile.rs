//! XYZ tile endpoint: `/tile/{layers}/{z}/{x}/{y}.{png|jpg}`.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, Uri},
    response::Response,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

use wms_map::RequestContext;
use wms_protocol::{normalize, TilePath};

use super::common::{error_response, online_resource, render, render_response};
use crate::metrics;
use crate::state::AppState;

/// GET /tile/:layers/:z/:x/:y
///
/// The optional `level` query parameter picks a raster pyramid level.
#[instrument(skip(state, headers, query))]
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Path((layers, z, x, y)): Path<(String, String, String, String)>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    let path = match TilePath::parse(&layers, &z, &x, &y) {
        Ok(path) => path,
        Err(e) => return error_response(&e),
    };
    metrics::record_tile_request(path.tile.z);

    let ctx = RequestContext {
        tile: Some(path.tile),
        level: query
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("level"))
            .map(|(_, v)| v.clone()),
    };
    let request = normalize(Vec::new(), Some(&path));

    let result = render(&state, &request, &ctx, online_resource(&headers, uri.path())).await;
    render_response(result)
}
