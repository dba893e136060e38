//! Map assembly.
//!
//! Assembly runs in two phases: every layer is built independently with
//! symbols referenced by name, then one pass over the finished map binds
//! those names to indices in the shared catalog.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use wms_common::{BoundingBox, Srid, WmsError, WmsResult};

use crate::layer::{LayerBuilder, LayerDescriptor, RequestContext};
use crate::symbol::SymbolCatalog;

/// Service-level settings of a map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMetadata {
    pub title: String,
    /// Reference systems advertised in `wms_srs`
    pub srs: Vec<Srid>,
    /// Requests advertised in `wms_enable_request`
    pub enable_requests: Vec<String>,
    /// Legend key size in pixels (x, y)
    pub legend_size: (u32, u32),
    /// Endpoint advertised in capabilities; set per request from the host
    pub online_resource: String,
    pub projection: Srid,
    pub extent: BoundingBox,
    pub transparent: bool,
}

impl Default for MapMetadata {
    fn default() -> Self {
        Self {
            title: "pg-wms service".to_string(),
            srs: vec![Srid(4326), Srid(3086), Srid(3857)],
            enable_requests: vec![
                "GetMap".to_string(),
                "GetLegendGraphic".to_string(),
                "GetCapabilities".to_string(),
            ],
            legend_size: (20, 20),
            online_resource: "/wms/?".to_string(),
            projection: Srid::WGS84,
            extent: BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
            transparent: true,
        }
    }
}

/// A complete map: metadata, ordered layers and the symbol catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDescriptor {
    pub metadata: MapMetadata,
    pub layers: Vec<LayerDescriptor>,
    pub symbols: Arc<SymbolCatalog>,
}

impl MapDescriptor {
    /// Look up a layer by name, ignoring ASCII case as MapServer does.
    pub fn layer(&self, name: &str) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// Names in `requested` that no layer of this map carries, ignoring case.
    pub fn missing_layers<'a>(&self, requested: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        requested
            .into_iter()
            .filter(|name| self.layer(name).is_none())
            .collect()
    }

    /// Bind every class symbol name to its catalog index.
    ///
    /// Unknown names stay unbound and are logged; the renderer draws those
    /// classes without a symbol. Returns the number of unbound references.
    pub fn bind_symbols(&mut self) -> usize {
        let mut unbound = 0;
        for layer in &mut self.layers {
            for class in &mut layer.classes {
                let Some(symbol) = class.symbol.as_mut() else {
                    continue;
                };
                symbol.index = self.symbols.index_of(&symbol.name);
                if symbol.index.is_none() {
                    warn!(layer = %layer.name, class = %class.name, symbol = %symbol.name, "Unknown symbol");
                    unbound += 1;
                }
            }
        }
        unbound
    }
}

/// Build every layer for `ctx` and combine them into one map.
///
/// Layer names must be pairwise distinct; the check only runs when more than
/// one builder is given. Layer order follows `builders`.
pub fn assemble<L: LayerBuilder>(
    builders: &[L],
    symbols: Arc<SymbolCatalog>,
    metadata: MapMetadata,
    ctx: &RequestContext,
) -> WmsResult<MapDescriptor> {
    if builders.len() > 1 {
        let mut seen = HashSet::new();
        for builder in builders {
            let name = builder.layer_name();
            if !seen.insert(name.clone()) {
                return Err(WmsError::DuplicateLayerName(name));
            }
        }
    }

    let layers = builders
        .iter()
        .map(|b| b.build(ctx))
        .collect::<WmsResult<Vec<_>>>()?;

    let mut map = MapDescriptor {
        metadata,
        layers,
        symbols,
    };
    let unbound = map.bind_symbols();
    debug!(layers = map.layers.len(), unbound_symbols = unbound, "Map assembled");

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{ColumnType, FieldDef, ModelSchema};
    use crate::layer::{CartographyRule, LayerSpec};
    use crate::symbol::DEFAULT_SYMBOL_SIZE;

    fn spec(table: &str) -> LayerSpec {
        LayerSpec::new(
            ModelSchema::new(table, vec![FieldDef::new("geom", ColumnType::Point, None)]),
            None,
        )
        .unwrap()
    }

    fn symbols() -> Arc<SymbolCatalog> {
        Arc::new(SymbolCatalog::presets(DEFAULT_SYMBOL_SIZE))
    }

    fn rule(name: &str, symbol: &str) -> CartographyRule {
        CartographyRule {
            name: name.into(),
            expression: None,
            color: Some("#000000".into()),
            outline_color: None,
            outline_width: None,
            symbol: Some(symbol.into()),
        }
    }

    #[test]
    fn test_single_layer_is_not_name_checked() {
        let map = assemble(
            &[spec("activity")],
            symbols(),
            MapMetadata::default(),
            &RequestContext::default(),
        )
        .unwrap();
        assert_eq!(map.layers.len(), 1);
        assert!(map.layer("activity").is_some());
    }

    #[test]
    fn test_symbols_bound_after_build() {
        let layer = spec("activity").with_cartography(vec![rule("a", "triangle"), rule("b", "hash")]);
        let map = assemble(&[layer], symbols(), MapMetadata::default(), &RequestContext::default())
            .unwrap();

        let classes = &map.layers[0].classes;
        assert_eq!(classes[0].symbol.as_ref().unwrap().index, Some(2));
        assert_eq!(classes[1].symbol.as_ref().unwrap().index, None);
    }

    #[test]
    fn test_missing_layers() {
        let map = assemble(
            &[spec("activity"), spec("species")],
            symbols(),
            MapMetadata::default(),
            &RequestContext::default(),
        )
        .unwrap();
        assert_eq!(map.missing_layers(["species", "roads"]), vec!["roads"]);
    }

    #[test]
    fn test_layer_lookup_ignores_case() {
        let map = assemble(
            &[spec("activity"), spec("species")],
            symbols(),
            MapMetadata::default(),
            &RequestContext::default(),
        )
        .unwrap();
        assert_eq!(map.layer("SPECIES").map(|l| l.name.as_str()), Some("species"));
        assert!(map.missing_layers(["Activity", "Species"]).is_empty());
        assert_eq!(map.missing_layers(["Roads"]), vec!["Roads"]);
    }
}
