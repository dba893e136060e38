//! Table introspection against a PostGIS catalog.

use std::time::Duration;

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    FromRow, PgPool,
};
use tracing::{debug, info};

use wms_common::{ConnectionParams, Srid, WmsError, WmsResult};
use wms_map::{ColumnType, FieldDef, ModelSchema};

const DESCRIBE_TABLE_SQL: &str = r#"
    SELECT
        c.column_name::text AS column_name,
        c.udt_name::text AS udt_name,
        g.type::text AS geometry_type,
        COALESCE(g.srid, r.srid) AS srid
    FROM information_schema.columns c
    LEFT JOIN geometry_columns g
        ON g.f_table_schema = c.table_schema
        AND g.f_table_name = c.table_name
        AND g.f_geometry_column = c.column_name
    LEFT JOIN raster_columns r
        ON r.r_table_schema = c.table_schema
        AND r.r_table_name = c.table_name
        AND r.r_raster_column = c.column_name
    WHERE c.table_schema = $1 AND c.table_name = $2
    ORDER BY c.ordinal_position
"#;

/// Database connection pool and catalog operations.
#[derive(Clone)]
pub struct Catalog {
    pool: PgPool,
}

impl Catalog {
    /// Open a pool using discrete connection parameters.
    pub async fn connect(params: &ConnectionParams) -> WmsResult<Self> {
        let options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .database(&params.dbname)
            .username(&params.user)
            .password(&params.password);

        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| WmsError::DatabaseError(format!("Connection failed: {}", e)))?;

        info!(host = %params.host, dbname = %params.dbname, "Connected to PostGIS");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check that the database answers.
    pub async fn ping(&self) -> WmsResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| WmsError::DatabaseError(format!("Ping failed: {}", e)))?;
        Ok(())
    }

    /// Read a table's columns, in declaration order, into a [`ModelSchema`].
    pub async fn describe_table(&self, schema: &str, table: &str) -> WmsResult<ModelSchema> {
        let rows = sqlx::query_as::<_, ColumnRow>(DESCRIBE_TABLE_SQL)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WmsError::DatabaseError(format!("Describe {}.{} failed: {}", schema, table, e)))?;

        debug!(schema, table, columns = rows.len(), "Described table");
        schema_from_rows(schema, table, rows)
    }
}

/// One row of the introspection query.
#[derive(Debug, Clone, FromRow)]
pub struct ColumnRow {
    pub column_name: String,
    pub udt_name: String,
    pub geometry_type: Option<String>,
    pub srid: Option<i32>,
}

impl ColumnRow {
    fn into_field(self) -> FieldDef {
        let column_type = ColumnType::from_postgis(&self.udt_name, self.geometry_type.as_deref());
        // 0 is PostGIS' "unknown" SRID
        let srid = self
            .srid
            .and_then(|s| u32::try_from(s).ok())
            .filter(|s| *s > 0)
            .map(Srid);
        FieldDef::new(self.column_name, column_type, srid)
    }
}

fn schema_from_rows(schema: &str, table: &str, rows: Vec<ColumnRow>) -> WmsResult<ModelSchema> {
    if rows.is_empty() {
        return Err(WmsError::MisconfiguredMap(format!(
            "Table {}.{} not found or has no columns",
            schema, table
        )));
    }

    let mut model = ModelSchema::new(table, rows.into_iter().map(ColumnRow::into_field).collect());
    model.schema = schema.to_string();
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, udt: &str, geometry_type: Option<&str>, srid: Option<i32>) -> ColumnRow {
        ColumnRow {
            column_name: name.to_string(),
            udt_name: udt.to_string(),
            geometry_type: geometry_type.map(str::to_string),
            srid,
        }
    }

    #[test]
    fn test_rows_keep_declaration_order() {
        let rows = vec![
            row("id", "int4", None, None),
            row("name", "varchar", None, None),
            row("geom", "geometry", Some("POINT"), Some(4326)),
            row("outline", "geometry", Some("POLYGON"), Some(3857)),
        ];
        let model = schema_from_rows("gis", "parcels", rows).unwrap();

        assert_eq!(model.schema, "gis");
        assert_eq!(model.table, "parcels");
        let names: Vec<_> = model.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "geom", "outline"]);
        assert_eq!(model.fields[2].column_type, ColumnType::Point);
        assert_eq!(model.fields[2].srid, Some(Srid::WGS84));
        assert_eq!(model.fields[3].column_type, ColumnType::Polygon);
    }

    #[test]
    fn test_raster_and_unknown_srid() {
        let rows = vec![
            row("rid", "int4", None, None),
            row("rast", "raster", None, Some(0)),
        ];
        let model = schema_from_rows("public", "elevation", rows).unwrap();
        assert_eq!(model.fields[1].column_type, ColumnType::Raster);
        assert_eq!(model.fields[1].srid, None);
    }

    #[test]
    fn test_missing_table() {
        let err = schema_from_rows("public", "nope", Vec::new()).unwrap_err();
        assert!(matches!(err, WmsError::MisconfiguredMap(_)));
    }
}
