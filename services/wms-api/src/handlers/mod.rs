//! HTTP request handlers.
//!
//! - `wms`: raw WMS requests, forwarded to the render back end
//! - `tile`: XYZ tiles, expanded into WMS GetMap requests
//! - `metrics`: health checks and Prometheus metrics
//! - `common`: exception reports and the shared render path

pub mod common;
pub mod metrics;
pub mod tile;
pub mod wms;

pub use common::{error_response, wms_exception};
pub use metrics::{health_handler, metrics_handler, ready_handler};
pub use tile::tile_handler;
pub use wms::wms_handler;
