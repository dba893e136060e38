//! MapServer mapfile serialization.
//!
//! Turns an assembled [`MapDescriptor`] into mapfile text the `mapserv`
//! binary can load. Every quoted value goes through [`quote`], and SQL
//! literals were already escaped by the data source layer.

use std::fmt::Write;
use wms_common::db::quote_conninfo;
use wms_common::ConnectionParams;

use crate::datasource::{DataSource, RasterSource};
use crate::layer::{ClassRule, LayerDescriptor};
use crate::map::MapDescriptor;
use crate::symbol::Symbol;

/// Quote a value as a mapfile string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' | '\r' => out.push(' '),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Serialize `map` to mapfile text, using `connection` for every PostGIS layer.
pub fn write_mapfile(map: &MapDescriptor, connection: &ConnectionParams) -> String {
    let mut out = String::new();
    let meta = &map.metadata;

    line(&mut out, 0, "MAP");
    line(&mut out, 1, "NAME \"pgwms\"");
    line(&mut out, 1, "STATUS ON");
    line(
        &mut out,
        1,
        &format!(
            "EXTENT {} {} {} {}",
            meta.extent.min_x, meta.extent.min_y, meta.extent.max_x, meta.extent.max_y
        ),
    );
    projection(&mut out, 1, &meta.projection.init_string());

    line(&mut out, 1, "WEB");
    line(&mut out, 2, "METADATA");
    let srs = meta
        .srs
        .iter()
        .map(|s| s.metadata_string())
        .collect::<Vec<_>>()
        .join(" ");
    let requests = meta.enable_requests.join(" ");
    for (key, value) in [
        ("wms_title", meta.title.as_str()),
        ("wms_onlineresource", meta.online_resource.as_str()),
        ("wms_srs", srs.as_str()),
        ("wms_enable_request", requests.as_str()),
        ("wms_feature_info_mime_type", "text/html"),
    ] {
        line(&mut out, 3, &format!("{} {}", quote(key), quote(value)));
    }
    line(&mut out, 2, "END");
    line(&mut out, 1, "END");

    output_formats(&mut out, meta.transparent);

    line(&mut out, 1, "LEGEND");
    line(
        &mut out,
        2,
        &format!("KEYSIZE {} {}", meta.legend_size.0, meta.legend_size.1),
    );
    line(&mut out, 1, "END");

    for symbol in map.symbols.iter() {
        write_symbol(&mut out, symbol);
    }

    for layer in &map.layers {
        write_layer(&mut out, layer, connection);
    }

    line(&mut out, 0, "END");
    out
}

fn line(out: &mut String, depth: usize, text: &str) {
    let _ = writeln!(out, "{}{}", "  ".repeat(depth), text);
}

fn projection(out: &mut String, depth: usize, init: &str) {
    line(out, depth, "PROJECTION");
    line(out, depth + 1, &quote(init));
    line(out, depth, "END");
}

fn output_formats(out: &mut String, transparent: bool) {
    line(out, 1, "OUTPUTFORMAT");
    line(out, 2, "NAME \"png\"");
    line(out, 2, "DRIVER \"AGG/PNG\"");
    line(out, 2, "MIMETYPE \"image/png\"");
    line(out, 2, "IMAGEMODE RGBA");
    line(out, 2, "EXTENSION \"png\"");
    line(out, 2, if transparent { "TRANSPARENT ON" } else { "TRANSPARENT OFF" });
    line(out, 1, "END");

    line(out, 1, "OUTPUTFORMAT");
    line(out, 2, "NAME \"jpeg\"");
    line(out, 2, "DRIVER \"AGG/JPEG\"");
    line(out, 2, "MIMETYPE \"image/jpeg\"");
    line(out, 2, "IMAGEMODE RGB");
    line(out, 2, "EXTENSION \"jpg\"");
    line(out, 1, "END");
}

fn write_symbol(out: &mut String, symbol: &Symbol) {
    line(out, 1, "SYMBOL");
    line(out, 2, &format!("NAME {}", quote(&symbol.name)));
    line(out, 2, &format!("TYPE {}", symbol.kind.keyword()));
    if symbol.filled {
        line(out, 2, "FILLED TRUE");
    }
    if !symbol.points.is_empty() {
        let points = symbol
            .points
            .iter()
            .map(|(x, y)| format!("{} {}", x, y))
            .collect::<Vec<_>>()
            .join(" ");
        line(out, 2, &format!("POINTS {} END", points));
    }
    line(out, 1, "END");
}

fn write_layer(out: &mut String, layer: &LayerDescriptor, connection: &ConnectionParams) {
    line(out, 1, "LAYER");
    line(out, 2, &format!("NAME {}", quote(&layer.name)));
    line(out, 2, &format!("TYPE {}", layer.kind.layer_type()));
    line(out, 2, "STATUS ON");
    projection(out, 2, &layer.projection.init_string());

    line(out, 2, "METADATA");
    line(out, 3, &format!("\"wms_title\" {}", quote(&layer.title)));
    line(out, 3, &format!("\"wms_srs\" {}", quote(&layer.projection.to_string())));
    line(out, 2, "END");

    match &layer.data_source {
        DataSource::Vector(source) => {
            line(out, 2, "CONNECTIONTYPE POSTGIS");
            line(out, 2, &format!("CONNECTION {}", quote(&connection.libpq_string())));
            line(out, 2, &format!("DATA {}", quote(&source.mapserver_data())));
        }
        DataSource::Raster(source) => {
            line(out, 2, &format!("DATA {}", quote(&raster_data(source, connection))));
        }
    }

    if let Some(item) = &layer.class_item {
        line(out, 2, &format!("CLASSITEM {}", quote(item)));
    }
    if let Some(opacity) = layer.opacity {
        line(out, 2, "COMPOSITE");
        line(out, 3, &format!("OPACITY {}", opacity));
        line(out, 2, "END");
    }
    for directive in &layer.processing {
        line(out, 2, &format!("PROCESSING {}", quote(directive)));
    }
    for class in &layer.classes {
        write_class(out, class);
    }
    line(out, 1, "END");
}

/// GDAL PostGIS raster connection string, selecting whole rows (`mode=2`).
fn raster_data(raster: &RasterSource, connection: &ConnectionParams) -> String {
    let mut data = format!(
        "PG:host={} port={} dbname={} user={} password={} schema={} table={} column={} mode=2",
        quote_conninfo(&connection.host),
        connection.port,
        quote_conninfo(&connection.dbname),
        quote_conninfo(&connection.user),
        quote_conninfo(&connection.password),
        quote_conninfo(raster.table.schema.as_str()),
        quote_conninfo(raster.table.table.as_str()),
        quote_conninfo(raster.raster_column.as_str()),
    );
    if let Some(predicate) = raster.where_literal() {
        let _ = write!(data, " where={}", quote_conninfo(&predicate));
    }
    data
}

fn write_class(out: &mut String, class: &ClassRule) {
    line(out, 2, "CLASS");
    line(out, 3, &format!("NAME {}", quote(&class.name)));
    if let Some(expression) = &class.expression {
        line(out, 3, &format!("EXPRESSION {}", expression_literal(expression)));
    }
    line(out, 3, "STYLE");
    if let Some(color) = &class.fill_color {
        line(out, 4, &format!("COLOR {}", quote(color)));
    }
    if let Some(color) = &class.outline_color {
        line(out, 4, &format!("OUTLINECOLOR {}", quote(color)));
    }
    line(out, 4, &format!("WIDTH {}", class.outline_width));
    // Symbol 0 is reserved by MapServer, so bound symbols are written by name.
    if let Some(symbol) = class.symbol.as_ref().filter(|s| s.index.is_some()) {
        line(out, 4, &format!("SYMBOL {}", quote(&symbol.name)));
    }
    line(out, 3, "END");
    line(out, 2, "END");
}

/// Logical `(...)` and regex `/.../` expressions are written bare, anything
/// else as a string comparison.
fn expression_literal(expression: &str) -> String {
    let trimmed = expression.trim();
    let logical = trimmed.starts_with('(') && trimmed.ends_with(')');
    let regex = trimmed.len() > 1 && trimmed.starts_with('/') && trimmed.ends_with('/');
    if (logical || regex) && !trimmed.contains(['\n', '\r']) {
        trimmed.to_string()
    } else {
        quote(expression)
    }
}
