//! Map configuration loader.
//!
//! Loads the map (service metadata, extra symbols) and its layers from one
//! YAML file. Each layer names a table and optionally carries a static column
//! list; layers without one are described through the PostGIS catalog at
//! startup.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use storage::Catalog;
use wms_common::{BoundingBox, Srid, WmsError, WmsResult};
use wms_map::symbol::DEFAULT_SYMBOL_SIZE;
use wms_map::{
    CartographyRule, FieldDef, Filter, Identifier, LayerBuilder, LayerSpec, MapMetadata,
    ModelSchema, PyramidLevels, RasterOptions, Symbol, SymbolCatalog,
};

/// Process-wide defaults applied while turning layer configs into specs.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDefaults {
    /// SRID assumed for raster columns that report none
    pub raster_srid: Srid,
    pub levels: PyramidLevels,
}

impl Default for LayerDefaults {
    fn default() -> Self {
        Self {
            raster_srid: Srid::WEB_MERCATOR,
            levels: PyramidLevels::default(),
        }
    }
}

/// Where a layer's column list comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// Columns listed in the configuration file
    Static(ModelSchema),
    /// Columns read from the database catalog
    Catalog { schema: String, table: String },
}

/// Raster addressing overrides for one layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasterConfig {
    pub nodata: Option<f64>,
    pub levels: Option<PyramidLevels>,
    pub filters: Vec<Filter>,
    pub tile_x_column: Option<Identifier>,
    pub tile_y_column: Option<Identifier>,
    pub tile_z_column: Option<Identifier>,
    pub level_column: Option<Identifier>,
}

/// One configured layer, before its spatial field is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    pub source: ModelSource,
    pub name: Option<String>,
    pub title: Option<String>,
    /// Explicit spatial field; otherwise the first spatial column wins
    pub field: Option<String>,
    pub unique_key: Option<Identifier>,
    pub class_item: Option<Identifier>,
    pub opacity: Option<u8>,
    pub filters: Vec<Filter>,
    pub cartography: Vec<CartographyRule>,
    pub raster: Option<RasterConfig>,
}

impl LayerConfig {
    fn table(&self) -> String {
        match &self.source {
            ModelSource::Static(model) => format!("{}.{}", model.schema, model.table),
            ModelSource::Catalog { schema, table } => format!("{}.{}", schema, table),
        }
    }

    /// Resolve the spatial field of `model` and apply this config on top.
    pub fn into_spec(self, model: ModelSchema, defaults: &LayerDefaults) -> WmsResult<LayerSpec> {
        let mut spec = LayerSpec::new(model, self.field.as_deref())?;
        spec.name = self.name;
        spec.title = self.title;
        if let Some(key) = self.unique_key {
            spec.unique_key = key;
        }
        spec.class_item = self.class_item;
        spec.opacity = self.opacity;
        spec.filters = self.filters;
        spec.cartography = self.cartography;

        if spec.field.kind.is_raster() {
            spec.default_srid = defaults.raster_srid;
            let raster = self.raster.unwrap_or_default();
            let base = std::mem::take(&mut spec.raster);
            spec.raster = RasterOptions {
                filters: raster.filters,
                nodata: raster.nodata,
                levels: raster.levels.unwrap_or_else(|| defaults.levels.clone()),
                tile_x_column: raster.tile_x_column.unwrap_or(base.tile_x_column),
                tile_y_column: raster.tile_y_column.unwrap_or(base.tile_y_column),
                tile_z_column: raster.tile_z_column.unwrap_or(base.tile_z_column),
                level_column: raster.level_column.unwrap_or(base.level_column),
            };
        } else if self.raster.is_some() {
            warn!(layer = %spec.layer_name(), "Raster options ignored on a vector layer");
        }

        Ok(spec)
    }
}

/// Parsed map configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub metadata: MapMetadata,
    pub symbols: SymbolCatalog,
    pub layers: Vec<LayerConfig>,
}

impl MapConfig {
    /// Load and validate a map configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> WmsResult<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            WmsError::MisconfiguredMap(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        let config = Self::from_yaml_str(&contents)?;
        info!(
            path = %path.as_ref().display(),
            layers = config.layers.len(),
            symbols = config.symbols.len(),
            "Loaded map config"
        );
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> WmsResult<Self> {
        let yaml: YamlMapFile = serde_yaml::from_str(contents)
            .map_err(|e| WmsError::MisconfiguredMap(format!("invalid map config: {}", e)))?;
        yaml.into_config()
    }

    /// Whether any layer has to be described through the database.
    pub fn needs_catalog(&self) -> bool {
        self.layers
            .iter()
            .any(|l| matches!(l.source, ModelSource::Catalog { .. }))
    }
}

/// Turn layer configs into specs, describing tables through `catalog` where
/// no static schema is configured.
pub async fn resolve_layers(
    layers: Vec<LayerConfig>,
    catalog: Option<&Catalog>,
    defaults: &LayerDefaults,
) -> WmsResult<Vec<LayerSpec>> {
    let mut specs = Vec::with_capacity(layers.len());
    for layer in layers {
        let model = match (&layer.source, catalog) {
            (ModelSource::Static(model), _) => model.clone(),
            (ModelSource::Catalog { schema, table }, Some(catalog)) => {
                catalog.describe_table(schema, table).await?
            }
            (ModelSource::Catalog { .. }, None) => {
                return Err(WmsError::MisconfiguredMap(format!(
                    "layer on {} needs a database connection",
                    layer.table()
                )));
            }
        };

        let spec = layer.into_spec(model, defaults)?;
        info!(
            layer = %spec.layer_name(),
            kind = ?spec.field.kind,
            column = %spec.field.column,
            "Resolved layer"
        );
        specs.push(spec);
    }
    Ok(specs)
}

// ============================================================================
// YAML Parsing Structures
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlMapFile {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    srs: Option<Vec<Srid>>,
    #[serde(default)]
    enable_requests: Option<Vec<String>>,
    #[serde(default)]
    legend_size: Option<(u32, u32)>,
    #[serde(default)]
    projection: Option<Srid>,
    /// minx, miny, maxx, maxy
    #[serde(default)]
    extent: Option<[f64; 4]>,
    #[serde(default)]
    symbol_size: Option<u32>,
    #[serde(default)]
    symbols: Vec<Symbol>,
    layers: Vec<YamlLayer>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlLayer {
    table: String,
    #[serde(default = "default_schema")]
    schema: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    unique_key: Option<Identifier>,
    #[serde(default)]
    class_item: Option<Identifier>,
    #[serde(default)]
    opacity: Option<u8>,
    #[serde(default)]
    filters: Vec<Filter>,
    #[serde(default)]
    cartography: Vec<CartographyRule>,
    #[serde(default)]
    raster: Option<YamlRaster>,
    /// Static column list; skips catalog introspection
    #[serde(default)]
    fields: Option<Vec<FieldDef>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlRaster {
    #[serde(default)]
    nodata: Option<f64>,
    #[serde(default)]
    levels: Option<PyramidLevels>,
    #[serde(default)]
    filters: Vec<Filter>,
    #[serde(default)]
    tile_x_column: Option<Identifier>,
    #[serde(default)]
    tile_y_column: Option<Identifier>,
    #[serde(default)]
    tile_z_column: Option<Identifier>,
    #[serde(default)]
    level_column: Option<Identifier>,
}

fn default_schema() -> String {
    "public".to_string()
}

impl YamlMapFile {
    fn into_config(self) -> WmsResult<MapConfig> {
        if self.layers.is_empty() {
            return Err(WmsError::MisconfiguredMap(
                "map config defines no layers".to_string(),
            ));
        }

        let mut metadata = MapMetadata::default();
        if let Some(title) = self.title {
            metadata.title = title;
        }
        if let Some(srs) = self.srs {
            metadata.srs = srs;
        }
        if let Some(requests) = self.enable_requests {
            metadata.enable_requests = requests;
        }
        if let Some(size) = self.legend_size {
            metadata.legend_size = size;
        }
        if let Some(projection) = self.projection {
            metadata.projection = projection;
        }
        if let Some([min_x, min_y, max_x, max_y]) = self.extent {
            metadata.extent = BoundingBox::new(min_x, min_y, max_x, max_y);
        }

        let symbols = SymbolCatalog::presets(self.symbol_size.unwrap_or(DEFAULT_SYMBOL_SIZE))
            .with_custom(self.symbols);

        let layers = self.layers.into_iter().map(YamlLayer::into_layer).collect();

        Ok(MapConfig {
            metadata,
            symbols,
            layers,
        })
    }
}

impl YamlLayer {
    fn into_layer(self) -> LayerConfig {
        let source = match self.fields {
            Some(fields) => {
                let mut model = ModelSchema::new(self.table, fields);
                model.schema = self.schema;
                ModelSource::Static(model)
            }
            None => ModelSource::Catalog {
                schema: self.schema,
                table: self.table,
            },
        };

        LayerConfig {
            source,
            name: self.name,
            title: self.title,
            field: self.field,
            unique_key: self.unique_key,
            class_item: self.class_item,
            opacity: self.opacity,
            filters: self.filters,
            cartography: self.cartography,
            raster: self.raster.map(|r| RasterConfig {
                nodata: r.nodata,
                levels: r.levels,
                filters: r.filters,
                tile_x_column: r.tile_x_column,
                tile_y_column: r.tile_y_column,
                tile_z_column: r.tile_z_column,
                level_column: r.level_column,
            }),
        }
    }
}
