//! Tests for the HTTP surface, driven in-process against a fake render
//! back end. No database or MapServer is needed.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use wms_api::{
    app,
    backend::{RenderBackend, RenderedOutput},
    state::AppState,
};
use wms_common::{tile_to_bbox, Srid, WmsError, WmsResult};
use wms_map::symbol::DEFAULT_SYMBOL_SIZE;
use wms_map::{
    ColumnType, FieldDef, LayerSpec, MapDescriptor, MapMetadata, ModelSchema, SymbolCatalog,
};
use wms_protocol::NormalizedRequest;

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct FakeBackend {
    calls: Mutex<Vec<(MapDescriptor, NormalizedRequest)>>,
    fail: bool,
}

impl FakeBackend {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn last_call(&self) -> (MapDescriptor, NormalizedRequest) {
        self.calls.lock().unwrap().last().cloned().expect("backend was called")
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RenderBackend for FakeBackend {
    async fn render(
        &self,
        map: &MapDescriptor,
        request: &NormalizedRequest,
    ) -> WmsResult<RenderedOutput> {
        self.calls.lock().unwrap().push((map.clone(), request.clone()));
        if self.fail {
            return Err(WmsError::RenderError("mapserv unavailable".to_string()));
        }
        Ok(RenderedOutput {
            bytes: Bytes::from_static(b"rendered"),
            content_type: request.get("FORMAT").unwrap_or("application/xml").to_string(),
        })
    }
}

fn parcels() -> LayerSpec {
    let model = ModelSchema::new(
        "parcels",
        vec![
            FieldDef::new("id", ColumnType::Other("int4".into()), None),
            FieldDef::new("name", ColumnType::Other("varchar".into()), None),
            FieldDef::new("geom", ColumnType::Polygon, Some(Srid::WGS84)),
        ],
    );
    LayerSpec::new(model, None).unwrap()
}

fn landcover() -> LayerSpec {
    let model = ModelSchema::new(
        "landcover",
        vec![
            FieldDef::new("rid", ColumnType::Other("int4".into()), None),
            FieldDef::new("rast", ColumnType::Raster, None),
        ],
    );
    LayerSpec::new(model, None).unwrap()
}

fn test_app(backend: Arc<FakeBackend>) -> Router {
    let state = AppState::from_parts(
        vec![parcels(), landcover()],
        SymbolCatalog::presets(DEFAULT_SYMBOL_SIZE),
        MapMetadata::default(),
        backend,
    )
    .unwrap();
    app(Arc::new(state))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    get_with_headers(app, uri, &[]).await
}

async fn get_with_headers(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, Option<String>, String) {
    let mut builder = Request::builder()
        .uri(uri)
        .header(header::HOST, "maps.example.org");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, String::from_utf8_lossy(&body).to_string())
}

// ============================================================================
// Tile endpoint
// ============================================================================

#[tokio::test]
async fn test_tile_renders_getmap() {
    let backend = Arc::new(FakeBackend::default());
    let (status, content_type, body) =
        get(test_app(backend.clone()), "/tile/parcels/9/141/216.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(body, "rendered");

    let (map, request) = backend.last_call();
    assert_eq!(request.get("REQUEST"), Some("GetMap"));
    assert_eq!(request.get("SRS"), Some("EPSG:3857"));
    assert_eq!(request.get("WIDTH"), Some("256"));
    assert_eq!(request.get("HEIGHT"), Some("256"));
    assert_eq!(
        request.get("BBOX"),
        Some(tile_to_bbox(141, 216, 9).to_wms_string().as_str())
    );
    assert_eq!(map.layers.len(), 2);
    assert_eq!(
        map.metadata.online_resource,
        "http://maps.example.org/tile/parcels/9/141/216.png?"
    );
}

#[tokio::test]
async fn test_tile_selects_closest_pyramid_level() {
    let backend = Arc::new(FakeBackend::default());
    let (status, content_type, _) = get(
        test_app(backend.clone()),
        "/tile/landcover/3/2/5.jpg?level=20",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/jpeg"));

    let (map, _) = backend.last_call();
    let layer = map.layer("landcover").unwrap();
    let predicate = layer.data_source.where_literal().unwrap();
    assert_eq!(predicate, "tilex = 2 AND tiley = 5 AND tilez = 3 AND level = 16");
}

#[tokio::test]
async fn test_tile_unsupported_suffix() {
    let backend = Arc::new(FakeBackend::default());
    let (status, content_type, body) =
        get(test_app(backend.clone()), "/tile/parcels/9/141/216.gif").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/xml"));
    assert!(body.contains(r#"code="InvalidFormat""#));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_tile_bad_index_and_level() {
    let backend = Arc::new(FakeBackend::default());

    let (status, _, body) = get(test_app(backend.clone()), "/tile/parcels/9/east/216.png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("InvalidParameterValue"));

    let (status, _, body) = get(
        test_app(backend.clone()),
        "/tile/landcover/3/2/5.png?level=high",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("level"));

    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_tile_unknown_layer() {
    let backend = Arc::new(FakeBackend::default());
    let (status, _, body) = get(test_app(backend.clone()), "/tile/roads/0/0/0.png").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("LayerNotDefined"));
    assert!(body.contains("roads"));
    assert_eq!(backend.call_count(), 0);
}

// ============================================================================
// WMS endpoint
// ============================================================================

#[tokio::test]
async fn test_wms_parameters_pass_through() {
    let backend = Arc::new(FakeBackend::default());
    let (status, _, _) = get(
        test_app(backend.clone()),
        "/wms/?SERVICE=WMS&REQUEST=GetCapabilities&VERSION=1.3.0",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (map, request) = backend.last_call();
    assert_eq!(request.params().len(), 3);
    assert_eq!(request.get("VERSION"), Some("1.3.0"));
    assert!(request.tile().is_none());
    assert_eq!(map.metadata.online_resource, "http://maps.example.org/wms/?");
}

#[tokio::test]
async fn test_wms_getmap_format_from_query() {
    let backend = Arc::new(FakeBackend::default());
    let (status, content_type, _) = get(
        test_app(backend.clone()),
        "/wms?SERVICE=WMS&REQUEST=GetMap&LAYERS=parcels&FORMAT=image/png&BBOX=0,0,1,1&WIDTH=10&HEIGHT=10&SRS=EPSG:4326",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_wms_layer_names_match_case_insensitively() {
    let backend = Arc::new(FakeBackend::default());
    let (status, _, _) = get(
        test_app(backend.clone()),
        "/wms?SERVICE=WMS&REQUEST=GetMap&LAYERS=Parcels,LANDCOVER&FORMAT=image/png&BBOX=0,0,1,1&WIDTH=10&HEIGHT=10&SRS=EPSG:4326",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, request) = backend.last_call();
    assert_eq!(request.layers(), ["Parcels", "LANDCOVER"]);

    let (status, _, _) = get(test_app(backend.clone()), "/tile/PARCELS/0/0/0.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn test_wms_online_resource_follows_forwarded_proto() {
    let backend = Arc::new(FakeBackend::default());
    let (status, _, _) = get_with_headers(
        test_app(backend.clone()),
        "/wms/?SERVICE=WMS&REQUEST=GetCapabilities",
        &[("x-forwarded-proto", "https")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (map, _) = backend.last_call();
    assert_eq!(map.metadata.online_resource, "https://maps.example.org/wms/?");
}

#[tokio::test]
async fn test_wms_missing_request() {
    let backend = Arc::new(FakeBackend::default());
    let (status, _, body) = get(test_app(backend.clone()), "/wms?SERVICE=WMS").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("MissingParameterValue"));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_backend_failure_is_bad_gateway() {
    let backend = Arc::new(FakeBackend::failing());
    let (status, _, body) = get(test_app(backend.clone()), "/tile/parcels/1/0/1.png").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("mapserv unavailable"));
    assert_eq!(backend.call_count(), 1);
}

// ============================================================================
// Startup and health
// ============================================================================

#[test]
fn test_duplicate_layers_fail_at_startup() {
    let result = AppState::from_parts(
        vec![parcels(), parcels()],
        SymbolCatalog::presets(DEFAULT_SYMBOL_SIZE),
        MapMetadata::default(),
        Arc::new(FakeBackend::default()),
    );
    assert!(matches!(result, Err(WmsError::DuplicateLayerName(ref n)) if n == "parcels"));
}

#[tokio::test]
async fn test_health_endpoints() {
    let backend = Arc::new(FakeBackend::default());

    let (status, _, body) = get(test_app(backend.clone()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");

    // static schemas only, so no database to check
    let (status, _, _) = get(test_app(backend.clone()), "/ready").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = get(test_app(backend), "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
