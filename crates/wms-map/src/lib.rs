//! Declarative map and layer descriptors for PostGIS-backed WMS layers.
//!
//! The flow is: describe a table ([`ModelSchema`]), resolve its spatial
//! column ([`resolve`]), build per-request [`LayerDescriptor`]s from a
//! [`LayerSpec`], then [`assemble`] them with a shared [`SymbolCatalog`] into
//! a [`MapDescriptor`] that a renderer can consume (see [`mapfile`]).

pub mod datasource;
pub mod field;
pub mod layer;
pub mod map;
pub mod mapfile;
pub mod pyramid;
pub mod symbol;

pub use datasource::{CompareOp, DataSource, Filter, Identifier, SqlValue};
pub use field::{resolve, ColumnType, FieldDef, ModelSchema, SpatialFieldDescriptor, SpatialFieldKind};
pub use layer::{
    CartographyRule, ClassRule, LayerBuilder, LayerDescriptor, LayerSpec, RasterOptions,
    RequestContext, SymbolRef,
};
pub use map::{assemble, MapDescriptor, MapMetadata};
pub use pyramid::{closest_level, PyramidLevels, DEFAULT_PYRAMID_LEVELS};
pub use symbol::{Symbol, SymbolCatalog, SymbolKind};
