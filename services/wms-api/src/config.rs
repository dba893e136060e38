//! Command line and environment configuration.

use clap::{Args as ClapArgs, Parser};
use std::path::PathBuf;

use wms_common::{ConnectionParams, Srid, WmsError, WmsResult};
use wms_map::PyramidLevels;

use crate::layer_config::LayerDefaults;

#[derive(Parser, Debug, Clone)]
#[command(name = "wms-api")]
#[command(about = "PostGIS-backed WMS and XYZ tile server")]
pub struct Args {
    /// Listen address
    #[arg(short, long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Force debug logging
    #[arg(long, env = "DEBUG")]
    pub debug: bool,

    /// Map and layer configuration file
    #[arg(long, env = "MAP_CONFIG", default_value = "config/map.yaml")]
    pub map_config: PathBuf,

    /// MapServer CGI endpoint used for rendering
    #[arg(long, env = "MAPSERV_URL", default_value = "http://localhost:8081/cgi-bin/mapserv")]
    pub mapserv_url: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "TOKIO_WORKER_THREADS")]
    pub worker_threads: Option<usize>,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub pyramid: PyramidArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DatabaseArgs {
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    #[arg(long, env = "DB_NAME", default_value = "postgres")]
    pub db_name: String,

    #[arg(long, env = "DB_USER", default_value = "postgres")]
    pub db_user: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "postgres", hide_env_values = true)]
    pub db_password: String,

    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,
}

impl DatabaseArgs {
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            host: self.db_host.clone(),
            dbname: self.db_name.clone(),
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            port: self.db_port,
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PyramidArgs {
    /// SRID assumed for raster pyramids that report none
    #[arg(long, env = "PYRAMID_SRID", default_value_t = 3857)]
    pub pyramid_srid: u32,

    /// Comma-separated pyramid levels
    #[arg(long, env = "PYRAMID_LEVELS", default_value = "1,2,4,8,16,32")]
    pub pyramid_levels: String,
}

impl PyramidArgs {
    pub fn layer_defaults(&self) -> WmsResult<LayerDefaults> {
        Ok(LayerDefaults {
            raster_srid: Srid(self.pyramid_srid),
            levels: parse_levels(&self.pyramid_levels)?,
        })
    }
}

/// Parse a comma-separated level list such as `1,2,4,8`.
pub fn parse_levels(raw: &str) -> WmsResult<PyramidLevels> {
    let levels = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>().map_err(|_| {
                WmsError::MisconfiguredMap(format!("pyramid level '{}' is not an integer", s))
            })
        })
        .collect::<WmsResult<Vec<_>>>()?;
    PyramidLevels::new(levels)
}
