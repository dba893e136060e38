//! Spatial field resolution.
//!
//! A [`ModelSchema`] lists a table's columns in declaration order. Resolution
//! picks the column that carries geometry or raster data and classifies it as
//! a closed [`SpatialFieldKind`].

use serde::{Deserialize, Serialize};
use std::fmt;
use wms_common::{Srid, WmsError, WmsResult};

/// Declared column type, as reported by the catalog or configured statically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Point,
    LineString,
    Polygon,
    MultiPolygon,
    Raster,
    /// Any non-spatial or unsupported type (varchar, integer, multipoint...).
    Other(String),
}

impl ColumnType {
    /// Classify a PostGIS column from its `udt_name` and, for geometry
    /// columns, the `geometry_columns.type` entry.
    pub fn from_postgis(udt_name: &str, geometry_type: Option<&str>) -> Self {
        match (udt_name, geometry_type) {
            ("raster", _) => ColumnType::Raster,
            ("geometry", Some(kind)) => ColumnType::from(kind.to_string()),
            (other, Some(kind)) => ColumnType::Other(format!("{}({})", other, kind)),
            (other, None) => ColumnType::Other(other.to_string()),
        }
    }

    /// The spatial kind for this type, if it is one of the recognized kinds.
    pub fn spatial_kind(&self) -> Option<SpatialFieldKind> {
        match self {
            ColumnType::Point => Some(SpatialFieldKind::Point),
            ColumnType::LineString => Some(SpatialFieldKind::Line),
            ColumnType::Polygon => Some(SpatialFieldKind::Polygon),
            ColumnType::MultiPolygon => Some(SpatialFieldKind::MultiPolygon),
            ColumnType::Raster => Some(SpatialFieldKind::Raster),
            ColumnType::Other(_) => None,
        }
    }
}

impl From<String> for ColumnType {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "point" => ColumnType::Point,
            "line" | "linestring" => ColumnType::LineString,
            "polygon" => ColumnType::Polygon,
            "multipolygon" => ColumnType::MultiPolygon,
            "raster" => ColumnType::Raster,
            _ => ColumnType::Other(value),
        }
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Point => write!(f, "point"),
            ColumnType::LineString => write!(f, "linestring"),
            ColumnType::Polygon => write!(f, "polygon"),
            ColumnType::MultiPolygon => write!(f, "multipolygon"),
            ColumnType::Raster => write!(f, "raster"),
            ColumnType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// One column of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub srid: Option<Srid>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType, srid: Option<Srid>) -> Self {
        Self {
            name: name.into(),
            column_type,
            srid,
        }
    }
}

/// A table and its columns in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    pub fields: Vec<FieldDef>,
}

fn default_schema() -> String {
    "public".to_string()
}

impl ModelSchema {
    pub fn new(table: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            schema: default_schema(),
            table: table.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The recognized spatial column kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialFieldKind {
    Point,
    Line,
    Polygon,
    MultiPolygon,
    Raster,
}

impl SpatialFieldKind {
    pub fn is_raster(&self) -> bool {
        matches!(self, SpatialFieldKind::Raster)
    }

    /// MapServer `TYPE` keyword for a layer of this kind.
    pub fn layer_type(&self) -> &'static str {
        match self {
            SpatialFieldKind::Point => "POINT",
            SpatialFieldKind::Line => "LINE",
            SpatialFieldKind::Polygon | SpatialFieldKind::MultiPolygon => "POLYGON",
            SpatialFieldKind::Raster => "RASTER",
        }
    }
}

/// The resolved spatial column of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialFieldDescriptor {
    pub kind: SpatialFieldKind,
    pub column: String,
    /// Declared SRID; `None` when the catalog did not report one.
    pub srid: Option<Srid>,
}

/// Find the spatial column of `model`.
///
/// With `explicit_field`, that column is looked up and classified. Otherwise
/// the first column in declaration order with a recognized spatial type wins;
/// later candidates are ignored without warning.
pub fn resolve(model: &ModelSchema, explicit_field: Option<&str>) -> WmsResult<SpatialFieldDescriptor> {
    let not_found = || WmsError::NoSpatialFieldFound {
        table: model.table.clone(),
        field: explicit_field.map(str::to_string),
    };

    let (field, kind) = match explicit_field {
        Some(name) => {
            let field = model.field(name).ok_or_else(not_found)?;
            let kind = field.column_type.spatial_kind().ok_or_else(not_found)?;
            (field, kind)
        }
        None => model
            .fields
            .iter()
            .find_map(|f| f.column_type.spatial_kind().map(|k| (f, k)))
            .ok_or_else(not_found)?,
    };

    Ok(SpatialFieldDescriptor {
        kind,
        column: field.name.clone(),
        srid: field.srid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_model() -> ModelSchema {
        ModelSchema::new(
            "landuse",
            vec![
                FieldDef::new("name", ColumnType::Other("varchar".into()), None),
                FieldDef::new("geom", ColumnType::Polygon, Some(Srid(4326))),
                FieldDef::new("rast", ColumnType::Raster, Some(Srid(3086))),
            ],
        )
    }

    #[test]
    fn test_first_spatial_field_in_declaration_order() {
        let field = resolve(&mixed_model(), None).unwrap();
        assert_eq!(field.kind, SpatialFieldKind::Polygon);
        assert_eq!(field.column, "geom");
        assert_eq!(field.srid, Some(Srid(4326)));
    }

    #[test]
    fn test_explicit_field() {
        let field = resolve(&mixed_model(), Some("rast")).unwrap();
        assert_eq!(field.kind, SpatialFieldKind::Raster);
        assert_eq!(field.column, "rast");
    }

    #[test]
    fn test_explicit_non_spatial_field_fails() {
        let err = resolve(&mixed_model(), Some("name")).unwrap_err();
        assert!(matches!(
            err,
            WmsError::NoSpatialFieldFound { ref field, .. } if field.as_deref() == Some("name")
        ));
        assert!(resolve(&mixed_model(), Some("missing")).is_err());
    }

    #[test]
    fn test_no_spatial_field() {
        let model = ModelSchema::new(
            "people",
            vec![
                FieldDef::new("id", ColumnType::Other("int4".into()), None),
                FieldDef::new("visits", ColumnType::Other("geometry(MULTIPOINT)".into()), None),
            ],
        );
        assert!(matches!(
            resolve(&model, None),
            Err(WmsError::NoSpatialFieldFound { ref table, field: None }) if table == "people"
        ));
    }

    #[test]
    fn test_column_type_from_postgis() {
        assert_eq!(ColumnType::from_postgis("geometry", Some("POINT")), ColumnType::Point);
        assert_eq!(
            ColumnType::from_postgis("geometry", Some("MULTIPOLYGON")),
            ColumnType::MultiPolygon
        );
        assert_eq!(ColumnType::from_postgis("raster", None), ColumnType::Raster);
        assert_eq!(
            ColumnType::from_postgis("geometry", Some("MULTIPOINT")),
            ColumnType::Other("MULTIPOINT".into())
        );
        assert_eq!(
            ColumnType::from_postgis("varchar", None),
            ColumnType::Other("varchar".into())
        );
    }
}
