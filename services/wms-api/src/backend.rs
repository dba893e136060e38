//! Render back ends.
//!
//! A back end turns an assembled map plus the normalized request parameters
//! into image bytes. [`MapServerBackend`] serializes the map to a mapfile and
//! forwards the request to a `mapserv` CGI endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use wms_common::{ConnectionParams, WmsError, WmsResult};
use wms_map::mapfile::write_mapfile;
use wms_map::MapDescriptor;
use wms_protocol::NormalizedRequest;

/// Rendered response body and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub bytes: Bytes,
    pub content_type: String,
}

#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn render(
        &self,
        map: &MapDescriptor,
        request: &NormalizedRequest,
    ) -> WmsResult<RenderedOutput>;
}

/// Renders through a MapServer CGI.
pub struct MapServerBackend {
    client: reqwest::Client,
    mapserv_url: String,
    connection: ConnectionParams,
}

impl MapServerBackend {
    pub fn new(mapserv_url: impl Into<String>, connection: ConnectionParams) -> WmsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| WmsError::InternalError(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            mapserv_url: mapserv_url.into(),
            connection,
        })
    }
}

/// Query parameters forwarded to `mapserv`. A client supplied `map` is
/// dropped so only the generated mapfile can be selected.
fn forwarded_query(request: &NormalizedRequest, mapfile: &str) -> Vec<(String, String)> {
    let mut query: Vec<(String, String)> = request
        .params()
        .iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case("map"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    query.push(("map".to_string(), mapfile.to_string()));
    query
}

/// Write `text` to a fresh temp mapfile. The file is removed when the
/// returned handle is dropped.
fn write_temp_mapfile(text: &str) -> WmsResult<NamedTempFile> {
    let mut mapfile = tempfile::Builder::new()
        .prefix("pg-wms-")
        .suffix(".map")
        .tempfile()?;
    mapfile.write_all(text.as_bytes())?;
    mapfile.flush()?;
    Ok(mapfile)
}

#[async_trait]
impl RenderBackend for MapServerBackend {
    async fn render(
        &self,
        map: &MapDescriptor,
        request: &NormalizedRequest,
    ) -> WmsResult<RenderedOutput> {
        let text = write_mapfile(map, &self.connection);

        // Kept alive until mapserv has answered.
        let mapfile = tokio::task::spawn_blocking(move || write_temp_mapfile(&text))
            .await
            .map_err(|e| WmsError::InternalError(format!("mapfile writer: {}", e)))??;

        let path = mapfile.path().to_string_lossy().to_string();
        debug!(mapfile = %path, layers = map.layers.len(), "Forwarding to mapserv");

        let response = self
            .client
            .get(&self.mapserv_url)
            .query(&forwarded_query(request, &path))
            .send()
            .await
            .map_err(|e| WmsError::RenderError(format!("mapserv request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "mapserv returned an error status");
            return Err(WmsError::RenderError(format!("mapserv returned {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| WmsError::RenderError(format!("reading mapserv response: {}", e)))?;

        Ok(RenderedOutput {
            bytes,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wms_protocol::normalize;

    #[test]
    fn test_client_cannot_pick_mapfile() {
        let request = normalize(
            vec![
                ("REQUEST".to_string(), "GetMap".to_string()),
                ("MAP".to_string(), "/etc/other.map".to_string()),
            ],
            None,
        );
        let query = forwarded_query(&request, "/tmp/pg-wms-1.map");
        assert_eq!(
            query,
            vec![
                ("REQUEST".to_string(), "GetMap".to_string()),
                ("map".to_string(), "/tmp/pg-wms-1.map".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_temp_mapfile_written_off_the_runtime() {
        let text = "MAP\n  NAME \"pgwms\"\nEND\n".to_string();
        let expected = text.clone();
        let mapfile = tokio::task::spawn_blocking(move || write_temp_mapfile(&text))
            .await
            .unwrap()
            .unwrap();

        let path = mapfile.path().to_path_buf();
        assert!(path.to_string_lossy().ends_with(".map"));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), expected);

        drop(mapfile);
        assert!(!path.exists());
    }
}
