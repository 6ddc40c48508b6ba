//! Client for the cover composition service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Composes a cover image out of up to four posters and returns its url.
#[async_trait]
pub trait CoverComposer: Send + Sync {
    async fn compose(&self, poster_urls: &[String]) -> Result<String>;
}

#[derive(Serialize)]
struct ComposeRequest<'a> {
    posters: &'a [String],
}

#[derive(Deserialize)]
struct ComposeResponse {
    url: String,
}

pub struct CoverClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoverClient {
    pub fn new(base_url: String, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl CoverComposer for CoverClient {
    async fn compose(&self, poster_urls: &[String]) -> Result<String> {
        let url = format!("{}/compose", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ComposeRequest {
                posters: poster_urls,
            })
            .send()
            .await
            .context("Failed to connect to cover service")?;

        if !response.status().is_success() {
            anyhow::bail!("Cover composition failed with status: {}", response.status());
        }

        let body: ComposeResponse = response
            .json()
            .await
            .context("Failed to parse cover response")?;
        Ok(body.url)
    }
}
