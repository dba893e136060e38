//! Structured PostGIS data sources.
//!
//! Layer data is described as tables, columns and typed filters rather than
//! SQL text. Two renderings exist: a parameterized query with `$n`
//! placeholders for database clients, and an inline form for MapServer where
//! every literal goes through [`SqlValue::literal`].

use serde::{Deserialize, Serialize};
use std::fmt;
use wms_common::Srid;

/// A validated SQL identifier: ASCII letters, digits and `_`, not starting
/// with a digit. Only such names ever reach query text.
///
/// Rendered double-quoted when it contains uppercase letters, since
/// PostgreSQL folds unquoted names to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Result<Self, IdentifierError> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(IdentifierError(name));
        }
        Ok(Self(name))
    }

    /// Wrap a compile-time constant name.
    pub(crate) fn trusted(name: &'static str) -> Self {
        debug_assert!(Identifier::new(name).is_ok(), "invalid identifier {}", name);
        Self(name.to_string())
    }

    /// The bare name, as stored in the catalog.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn needs_quotes(&self) -> bool {
        self.0.chars().any(|c| c.is_ascii_uppercase())
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identifier::new(value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.needs_quotes() {
            write!(f, "\"{}\"", self.0)
        } else {
            f.write_str(&self.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid SQL identifier: '{0}'")]
pub struct IdentifierError(pub String);

/// A typed literal used in a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// Inline SQL literal. Text is single-quoted with embedded quotes doubled.
    pub fn literal(&self) -> String {
        match self {
            SqlValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Float(f) if f.is_finite() => format!("{:?}", f),
            SqlValue::Float(f) => format!("'{}'::float8", f),
            SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

/// Comparison operators allowed in filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[default]
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// `column op value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: Identifier,
    #[serde(default)]
    pub op: CompareOp,
    pub value: SqlValue,
}

impl Filter {
    pub fn eq(column: Identifier, value: impl Into<SqlValue>) -> Self {
        Self {
            column,
            op: CompareOp::Eq,
            value: value.into(),
        }
    }
}

/// A schema-qualified table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: Identifier,
    pub table: Identifier,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Geometry rows selected from a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSource {
    pub table: TableRef,
    pub geometry_column: Identifier,
    pub unique_key: Identifier,
    /// Extra attribute columns (class items, labels).
    pub attributes: Vec<Identifier>,
    pub srid: Srid,
    pub filters: Vec<Filter>,
}

/// Raster rows selected from a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterSource {
    pub table: TableRef,
    pub raster_column: Identifier,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataSource {
    Vector(VectorSource),
    Raster(RasterSource),
}

impl DataSource {
    pub fn filters(&self) -> &[Filter] {
        match self {
            DataSource::Vector(v) => &v.filters,
            DataSource::Raster(r) => &r.filters,
        }
    }

    pub fn table(&self) -> &TableRef {
        match self {
            DataSource::Vector(v) => &v.table,
            DataSource::Raster(r) => &r.table,
        }
    }

    /// Parameterized query text plus the values to bind to `$1..$n`.
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let columns = match self {
            DataSource::Vector(v) => {
                let mut cols = vec![v.unique_key.to_string(), v.geometry_column.to_string()];
                cols.extend(v.attributes.iter().map(Identifier::to_string));
                cols.join(", ")
            }
            DataSource::Raster(r) => r.raster_column.to_string(),
        };

        let mut sql = format!("SELECT {} FROM {}", columns, self.table());
        let mut params = Vec::new();
        for (i, filter) in self.filters().iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str(&format!("{} {} ${}", filter.column, filter.op.as_sql(), i + 1));
            params.push(filter.value.clone());
        }
        (sql, params)
    }

    /// The filters as an inline `WHERE` body, or `None` without filters.
    pub fn where_literal(&self) -> Option<String> {
        inline_predicate(self.filters())
    }
}

fn inline_predicate(filters: &[Filter]) -> Option<String> {
    if filters.is_empty() {
        return None;
    }
    Some(
        filters
            .iter()
            .map(|f| format!("{} {} {}", f.column, f.op.as_sql(), f.value.literal()))
            .collect::<Vec<_>>()
            .join(" AND "),
    )
}

impl RasterSource {
    pub fn where_literal(&self) -> Option<String> {
        inline_predicate(&self.filters)
    }
}

impl VectorSource {
    pub fn where_literal(&self) -> Option<String> {
        inline_predicate(&self.filters)
    }

    /// MapServer PostGIS `DATA` statement.
    pub fn mapserver_data(&self) -> String {
        let mut columns = vec![self.unique_key.to_string(), self.geometry_column.to_string()];
        columns.extend(self.attributes.iter().map(Identifier::to_string));

        let mut inner = format!("SELECT {} FROM {}", columns.join(", "), self.table);
        if let Some(predicate) = self.where_literal() {
            inner.push_str(" WHERE ");
            inner.push_str(&predicate);
        }

        format!(
            "{} FROM ({}) AS subquery USING UNIQUE {} USING SRID={}",
            self.geometry_column, inner, self.unique_key, self.srid.0
        )
    }
}
