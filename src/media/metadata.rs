//! Client for the external media metadata proxy.

use crate::watchlist::{MediaKind, Platform};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQuery {
    pub media_id: String,
    pub kind: MediaKind,
    pub locale: String,
    pub region: String,
}

/// What the proxy knows about a movie or series.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MediaMetadata {
    pub title: String,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub season_count: Option<u32>,
    #[serde(default)]
    pub episode_count: Option<u32>,
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Media {0} not found")]
    NotFound(String),

    #[error("Metadata service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid response from metadata service: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn lookup(&self, query: &MediaQuery) -> Result<MediaMetadata, MetadataError>;
}

/// HTTP client for the metadata proxy.
pub struct MetadataClient {
    client: reqwest::Client,
    base_url: String,
}

impl MetadataClient {
    pub fn new(base_url: String, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// The media id is a single path segment, whatever characters it carries.
    fn lookup_url(&self, query: &MediaQuery) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            query.kind.as_str(),
            urlencoding::encode(&query.media_id)
        )
    }
}

#[async_trait]
impl MetadataProvider for MetadataClient {
    async fn lookup(&self, query: &MediaQuery) -> Result<MediaMetadata, MetadataError> {
        let url = self.lookup_url(query);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("locale", query.locale.as_str()),
                ("region", query.region.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MetadataError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound(query.media_id.clone()));
        }
        if !status.is_success() {
            return Err(MetadataError::Unavailable(format!("status {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| MetadataError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_defaults_optional_fields() {
        let metadata: MediaMetadata = serde_json::from_str(r#"{"title": "Alien"}"#).unwrap();
        assert_eq!(metadata.title, "Alien");
        assert!(metadata.platforms.is_empty());
        assert!(metadata.runtime.is_none());
    }

    #[test]
    fn trims_trailing_slash() {
        let client = MetadataClient::new("http://localhost:9000/".to_string(), 5).unwrap();
        assert_eq!(client.base_url, "http://localhost:9000");
    }

    fn movie_query(media_id: &str) -> MediaQuery {
        MediaQuery {
            media_id: media_id.to_string(),
            kind: MediaKind::Movie,
            locale: "en-US".to_string(),
            region: "US".to_string(),
        }
    }

    #[test]
    fn lookup_url_encodes_media_id() {
        let client = MetadataClient::new("http://localhost:9000".to_string(), 5).unwrap();
        assert_eq!(
            client.lookup_url(&movie_query("../series/42?region=XX#")),
            "http://localhost:9000/movie/..%2Fseries%2F42%3Fregion%3DXX%23"
        );
        assert_eq!(
            client.lookup_url(&movie_query("tt0078748")),
            "http://localhost:9000/movie/tt0078748"
        );
    }

    #[tokio::test]
    async fn lookup_keeps_media_id_in_its_path_segment() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            let request = String::from_utf8_lossy(&received).to_string();
            request.lines().next().unwrap_or_default().to_string()
        });

        let client = MetadataClient::new(format!("http://{}", addr), 5).unwrap();
        let result = client.lookup(&movie_query("../series/42?region=XX#")).await;
        assert!(matches!(result, Err(MetadataError::NotFound(_))));

        let request_line = server.await.unwrap();
        assert_eq!(
            request_line,
            "GET /movie/..%2Fseries%2F42%3Fregion%3DXX%23?locale=en-US&region=US HTTP/1.1"
        );
    }
}
