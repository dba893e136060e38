//! WMS request handling shared by the HTTP service.
//!
//! - [`dispatch`]: normalize raw WMS query strings and XYZ tile paths into one
//!   parameter set for the renderer
//! - [`exception`]: OGC `ServiceExceptionReport` documents

pub mod dispatch;
pub mod exception;

pub use dispatch::{normalize, NormalizedRequest, TilePath};
pub use exception::service_exception_xml;
