//! PostGIS access for pg-wms services.
//!
//! Provides catalog introspection used to resolve model schemas at startup.

pub mod catalog;

pub use catalog::{Catalog, ColumnRow};
