//! Application state shared across handlers.

use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use storage::Catalog;
use wms_common::WmsResult;
use wms_map::{assemble, LayerSpec, MapDescriptor, MapMetadata, RequestContext, SymbolCatalog};

use crate::backend::{MapServerBackend, RenderBackend};
use crate::config::Args;
use crate::layer_config::{resolve_layers, MapConfig};

/// Read-only after startup.
pub struct AppState {
    pub layers: Vec<LayerSpec>,
    pub symbols: Arc<SymbolCatalog>,
    pub metadata: MapMetadata,
    pub backend: Arc<dyn RenderBackend>,
    pub catalog: Option<Catalog>,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Load the map configuration, resolve every layer and connect the
    /// render back end.
    pub async fn new(args: &Args, prometheus: Option<PrometheusHandle>) -> anyhow::Result<Self> {
        let config = MapConfig::load(&args.map_config)
            .with_context(|| format!("loading {}", args.map_config.display()))?;
        let defaults = args.pyramid.layer_defaults()?;
        let connection = args.database.connection_params();

        let catalog = if config.needs_catalog() {
            Some(Catalog::connect(&connection).await?)
        } else {
            info!("All layers carry static schemas; skipping catalog connection");
            None
        };

        let layers = resolve_layers(config.layers, catalog.as_ref(), &defaults).await?;
        let backend = Arc::new(MapServerBackend::new(args.mapserv_url.clone(), connection)?);

        let mut state = Self::from_parts(layers, config.symbols, config.metadata, backend)?;
        state.catalog = catalog;
        state.prometheus = prometheus;
        Ok(state)
    }

    /// Build state from resolved parts. The map is assembled once so naming
    /// conflicts fail at startup rather than on the first request.
    pub fn from_parts(
        layers: Vec<LayerSpec>,
        symbols: SymbolCatalog,
        metadata: MapMetadata,
        backend: Arc<dyn RenderBackend>,
    ) -> WmsResult<Self> {
        let state = Self {
            layers,
            symbols: Arc::new(symbols),
            metadata,
            backend,
            catalog: None,
            prometheus: None,
        };
        let map = state.assemble(&RequestContext::default(), None)?;
        info!(
            layers = map.layers.len(),
            symbols = map.symbols.len(),
            "Map validated"
        );
        Ok(state)
    }

    /// Assemble the map for one request.
    pub fn assemble(
        &self,
        ctx: &RequestContext,
        online_resource: Option<String>,
    ) -> WmsResult<MapDescriptor> {
        let mut metadata = self.metadata.clone();
        if let Some(url) = online_resource {
            metadata.online_resource = url;
        }
        assemble(&self.layers, Arc::clone(&self.symbols), metadata, ctx)
    }
}
