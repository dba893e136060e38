//! Application metrics recorded through the `metrics` facade.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record a request on the WMS endpoint.
pub fn record_wms_request(request: &str) {
    counter!("wms_requests_total", "request" => request_label(request)).increment(1);
}

/// Label for a client `REQUEST` value. Anything outside the known WMS
/// operations is counted as `other`.
pub fn request_label(request: &str) -> &'static str {
    const KNOWN: [&str; 4] = ["GetMap", "GetCapabilities", "GetLegendGraphic", "GetFeatureInfo"];
    KNOWN
        .into_iter()
        .find(|known| known.eq_ignore_ascii_case(request.trim()))
        .unwrap_or("other")
}

/// Record a request on the tile endpoint.
pub fn record_tile_request(zoom: u32) {
    counter!("tile_requests_total").increment(1);
    histogram!("tile_request_zoom").record(f64::from(zoom));
}

/// Record one call into the render back end.
pub fn record_render(elapsed: Duration, ok: bool) {
    histogram!("render_duration_seconds").record(elapsed.as_secs_f64());
    if !ok {
        counter!("render_errors_total").increment(1);
    }
}

/// Record a request rejected before rendering.
pub fn record_request_error(code: &'static str) {
    counter!("request_errors_total", "code" => code).increment(1);
}
