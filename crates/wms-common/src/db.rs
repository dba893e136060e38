//! Database connection parameters shared by the catalog and the renderer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// PostGIS connection parameters, read once at startup.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub host: String,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub port: u16,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            dbname: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            port: 5432,
        }
    }
}

impl ConnectionParams {
    /// libpq keyword/value connection string.
    ///
    /// Every value is single-quoted with `\` and `'` escaped, so configured
    /// values cannot introduce extra keywords.
    pub fn libpq_string(&self) -> String {
        format!(
            "host={} dbname={} user={} port={} password={}",
            quote_conninfo(&self.host),
            quote_conninfo(&self.dbname),
            quote_conninfo(&self.user),
            self.port,
            quote_conninfo(&self.password),
        )
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"***")
            .field("port", &self.port)
            .finish()
    }
}

/// Quote a value for a libpq / GDAL `key='value'` string.
pub fn quote_conninfo(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_libpq_string() {
        let params = ConnectionParams {
            host: "db.local".into(),
            dbname: "gis".into(),
            user: "reader".into(),
            password: "it's secret".into(),
            port: 5433,
        };
        assert_eq!(
            params.libpq_string(),
            r"host='db.local' dbname='gis' user='reader' port=5433 password='it\'s secret'"
        );
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", ConnectionParams::default());
        assert!(rendered.contains(r#"password: "***""#));
        assert!(rendered.contains(r#"user: "postgres""#));
    }
}
