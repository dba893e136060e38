//! Layer descriptors and the per-request layer builder.

use serde::{Deserialize, Serialize};
use wms_common::{normalize_color, Srid, TileCoord, WmsError, WmsResult};

use crate::datasource::{DataSource, Filter, Identifier, RasterSource, TableRef, VectorSource};
use crate::field::{resolve, ModelSchema, SpatialFieldDescriptor, SpatialFieldKind};
use crate::pyramid::PyramidLevels;

/// Fill used when a vector layer has no cartography rules.
pub const DEFAULT_FILL_COLOR: &str = "#777777";
/// Outline used when a vector layer has no cartography rules.
pub const DEFAULT_OUTLINE_COLOR: &str = "#000000";
pub const DEFAULT_OUTLINE_WIDTH: f64 = 1.0;

/// Class item MapServer uses to classify raster pixel values.
pub const RASTER_CLASS_ITEM: &str = "[pixel]";

/// A styling rule as written in layer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartographyRule {
    /// Display name of the class (legend label)
    pub name: String,
    /// MapServer expression matched against the class item
    #[serde(default)]
    pub expression: Option<String>,
    /// Fill color, `#RRGGBB` or `"R G B"`
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub outline_color: Option<String>,
    #[serde(default)]
    pub outline_width: Option<f64>,
    /// Name of a symbol in the shared catalog
    #[serde(default)]
    pub symbol: Option<String>,
}

/// A symbol referenced by name, bound to a catalog index after assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRef {
    pub name: String,
    pub index: Option<usize>,
}

impl SymbolRef {
    pub fn unbound(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }
}

/// One class of a layer with its single style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRule {
    pub expression: Option<String>,
    pub name: String,
    pub fill_color: Option<String>,
    pub outline_color: Option<String>,
    pub outline_width: f64,
    pub symbol: Option<SymbolRef>,
}

impl ClassRule {
    fn from_rule(rule: &CartographyRule) -> WmsResult<Self> {
        let color = |value: &Option<String>| -> WmsResult<Option<String>> {
            value
                .as_deref()
                .map(normalize_color)
                .transpose()
                .map_err(|e| WmsError::MisconfiguredMap(format!("class '{}': {}", rule.name, e)))
        };

        Ok(Self {
            expression: rule.expression.clone(),
            name: rule.name.clone(),
            fill_color: color(&rule.color)?,
            outline_color: color(&rule.outline_color)?,
            outline_width: rule.outline_width.unwrap_or(DEFAULT_OUTLINE_WIDTH),
            symbol: rule.symbol.as_ref().map(SymbolRef::unbound),
        })
    }

    fn default_vector() -> Self {
        Self {
            expression: None,
            name: "default".to_string(),
            fill_color: Some(DEFAULT_FILL_COLOR.to_string()),
            outline_color: Some(DEFAULT_OUTLINE_COLOR.to_string()),
            outline_width: DEFAULT_OUTLINE_WIDTH,
            symbol: None,
        }
    }
}

/// A renderable layer: one data source plus its classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub name: String,
    pub title: String,
    pub kind: SpatialFieldKind,
    pub projection: Srid,
    pub data_source: DataSource,
    pub class_item: Option<String>,
    pub classes: Vec<ClassRule>,
    /// Renderer processing directives such as `NODATA=0`
    pub processing: Vec<String>,
    /// Opacity percentage in `0..=100`
    pub opacity: Option<u8>,
}

/// Request-derived inputs to layer construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Tile being rendered, for `/tile/...` requests
    pub tile: Option<TileCoord>,
    /// Raw `level` query parameter
    pub level: Option<String>,
}

/// Raster addressing options.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Predicate applied in both direct and tiled mode
    pub filters: Vec<Filter>,
    /// Pixel value treated as transparent
    pub nodata: Option<f64>,
    pub levels: PyramidLevels,
    pub tile_x_column: Identifier,
    pub tile_y_column: Identifier,
    pub tile_z_column: Identifier,
    pub level_column: Identifier,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            nodata: None,
            levels: PyramidLevels::default(),
            tile_x_column: Identifier::trusted("tilex"),
            tile_y_column: Identifier::trusted("tiley"),
            tile_z_column: Identifier::trusted("tilez"),
            level_column: Identifier::trusted("level"),
        }
    }
}

/// Anything that can produce a layer for a request.
pub trait LayerBuilder {
    /// Name the built layer will carry.
    fn layer_name(&self) -> String;

    fn build(&self, ctx: &RequestContext) -> WmsResult<LayerDescriptor>;
}

/// Static description of a layer over one model.
///
/// The spatial field is resolved once in [`LayerSpec::new`]; [`build`] is
/// called per request.
///
/// [`build`]: LayerBuilder::build
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    /// Explicit layer name; defaults to the lowercased table name
    pub name: Option<String>,
    pub title: Option<String>,
    pub model: ModelSchema,
    pub field: SpatialFieldDescriptor,
    pub unique_key: Identifier,
    pub class_item: Option<Identifier>,
    pub cartography: Vec<CartographyRule>,
    /// Vector predicate
    pub filters: Vec<Filter>,
    pub raster: RasterOptions,
    /// Used when the catalog reports no SRID for the field
    pub default_srid: Srid,
    pub opacity: Option<u8>,
}

impl LayerSpec {
    /// Resolve the spatial field of `model` and create a spec with defaults.
    pub fn new(model: ModelSchema, explicit_field: Option<&str>) -> WmsResult<Self> {
        let field = resolve(&model, explicit_field)?;
        Ok(Self {
            name: None,
            title: None,
            model,
            field,
            unique_key: Identifier::trusted("id"),
            class_item: None,
            cartography: Vec::new(),
            filters: Vec::new(),
            raster: RasterOptions::default(),
            default_srid: Srid::WGS84,
            opacity: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_cartography(mut self, rules: Vec<CartographyRule>) -> Self {
        self.cartography = rules;
        self
    }

    fn table_ref(&self) -> WmsResult<TableRef> {
        Ok(TableRef {
            schema: identifier(&self.model.schema)?,
            table: identifier(&self.model.table)?,
        })
    }

    fn classes(&self) -> WmsResult<Vec<ClassRule>> {
        self.cartography.iter().map(ClassRule::from_rule).collect()
    }

    fn build_vector(&self) -> WmsResult<LayerDescriptor> {
        let srid = self.field.srid.unwrap_or(self.default_srid);
        let source = VectorSource {
            table: self.table_ref()?,
            geometry_column: identifier(&self.field.column)?,
            unique_key: self.unique_key.clone(),
            attributes: self.class_item.iter().cloned().collect(),
            srid,
            filters: self.filters.clone(),
        };

        let classes = if self.cartography.is_empty() {
            vec![ClassRule::default_vector()]
        } else {
            self.classes()?
        };

        Ok(LayerDescriptor {
            name: self.layer_name(),
            title: self.title(),
            kind: self.field.kind,
            projection: srid,
            data_source: DataSource::Vector(source),
            class_item: self.class_item.as_ref().map(|c| c.to_string()),
            classes,
            processing: Vec::new(),
            opacity: self.opacity,
        })
    }

    fn build_raster(&self, ctx: &RequestContext) -> WmsResult<LayerDescriptor> {
        let raster = &self.raster;
        let mut filters = raster.filters.clone();

        if let Some(tile) = ctx.tile {
            let level = raster.levels.select(ctx.level.as_deref())?;
            filters.push(Filter::eq(raster.tile_x_column.clone(), tile.x));
            filters.push(Filter::eq(raster.tile_y_column.clone(), tile.y));
            filters.push(Filter::eq(raster.tile_z_column.clone(), i64::from(tile.z)));
            filters.push(Filter::eq(raster.level_column.clone(), i64::from(level)));
        }

        let source = RasterSource {
            table: self.table_ref()?,
            raster_column: identifier(&self.field.column)?,
            filters,
        };

        let classes = self.classes()?;
        let class_item = (!classes.is_empty()).then(|| RASTER_CLASS_ITEM.to_string());
        let processing = raster
            .nodata
            .map(|value| vec![format!("NODATA={}", value)])
            .unwrap_or_default();

        Ok(LayerDescriptor {
            name: self.layer_name(),
            title: self.title(),
            kind: SpatialFieldKind::Raster,
            projection: self.field.srid.unwrap_or(self.default_srid),
            data_source: DataSource::Raster(source),
            class_item,
            classes,
            processing,
            opacity: self.opacity,
        })
    }

    fn title(&self) -> String {
        self.title.clone().unwrap_or_else(|| self.layer_name())
    }
}

impl LayerBuilder for LayerSpec {
    fn layer_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.model.table.to_lowercase())
    }

    fn build(&self, ctx: &RequestContext) -> WmsResult<LayerDescriptor> {
        if let Some(opacity) = self.opacity {
            if opacity > 100 {
                return Err(WmsError::MisconfiguredMap(format!(
                    "layer '{}': opacity {} is outside 0..=100",
                    self.layer_name(),
                    opacity
                )));
            }
        }

        match self.field.kind {
            SpatialFieldKind::Raster => self.build_raster(ctx),
            SpatialFieldKind::Point
            | SpatialFieldKind::Line
            | SpatialFieldKind::Polygon
            | SpatialFieldKind::MultiPolygon => self.build_vector(),
        }
    }
}

fn identifier(name: &str) -> WmsResult<Identifier> {
    Identifier::new(name).map_err(|e| WmsError::MisconfiguredMap(e.to_string()))
}
