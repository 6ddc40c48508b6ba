//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all watchlist-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use super::server::TestServer;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;

/// How the client presents its session token
#[derive(Clone, Copy, Debug)]
enum TokenTransport {
    BearerHeader,
    Cookie,
}

/// HTTP test client bound to one user session
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    token: Option<String>,
    transport: TokenTransport,
}

impl TestClient {
    /// Creates a new anonymous client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
            transport: TokenTransport::BearerHeader,
        }
    }

    /// Creates a client acting as the seeded user `handle`, sending its token
    /// in the Authorization header.
    pub fn authenticated(server: &TestServer, handle: &str) -> Self {
        let mut client = Self::new(server.base_url.clone());
        client.token = Some(server.user(handle).token.clone());
        client
    }

    /// Same as `authenticated()` but the token travels in the session cookie.
    pub fn authenticated_with_cookie(server: &TestServer, handle: &str) -> Self {
        let mut client = Self::authenticated(server, handle);
        client.transport = TokenTransport::Cookie;
        client
    }

    /// Creates a client presenting an arbitrary token
    pub fn with_token(base_url: String, token: &str) -> Self {
        let mut client = Self::new(base_url);
        client.token = Some(token.to_string());
        client
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match (&self.token, self.transport) {
            (None, _) => builder,
            (Some(token), TokenTransport::BearerHeader) => {
                builder.header("Authorization", format!("Bearer {}", token))
            }
            (Some(token), TokenTransport::Cookie) => {
                builder.header("Cookie", format!("session_token={}", token))
            }
        }
    }

    async fn send(builder: RequestBuilder, what: &str) -> Response {
        builder
            .send()
            .await
            .unwrap_or_else(|e| panic!("{} request failed: {}", what, e))
    }

    // ========================================================================
    // Home
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        Self::send(self.request(Method::GET, "/"), "Home").await
    }

    // ========================================================================
    // My Watchlists
    // ========================================================================

    /// GET /v1/watchlists
    pub async fn get_watchlists(&self) -> Response {
        Self::send(self.request(Method::GET, "/v1/watchlists"), "List watchlists").await
    }

    /// GET /v1/watchlists and returns the ids in display order
    pub async fn get_watchlist_ids(&self) -> Vec<String> {
        let response = self.get_watchlists().await;
        assert!(response.status().is_success());
        let lists: Vec<Value> = response.json().await.expect("Invalid watchlists body");
        lists
            .iter()
            .map(|w| w["id"].as_str().expect("Watchlist without id").to_string())
            .collect()
    }

    /// POST /v1/watchlists
    pub async fn create_watchlist(&self, name: &str, visibility: &str) -> Response {
        self.create_watchlist_with(json!({ "name": name, "visibility": visibility }))
            .await
    }

    /// POST /v1/watchlists with a custom body
    pub async fn create_watchlist_with(&self, body: Value) -> Response {
        Self::send(
            self.request(Method::POST, "/v1/watchlists").json(&body),
            "Create watchlist",
        )
        .await
    }

    /// POST /v1/watchlists and returns the new id
    ///
    /// # Panics
    ///
    /// Panics if creation fails.
    pub async fn create_watchlist_id(&self, name: &str, visibility: &str) -> String {
        let response = self.create_watchlist(name, visibility).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid watchlist body");
        body["id"].as_str().expect("Watchlist without id").to_string()
    }

    /// PUT /v1/watchlists/order
    pub async fn reorder_watchlists(&self, ids: &[&str]) -> Response {
        Self::send(
            self.request(Method::PUT, "/v1/watchlists/order")
                .json(&json!({ "watchlist_ids": ids })),
            "Reorder watchlists",
        )
        .await
    }

    // ========================================================================
    // Single Watchlist
    // ========================================================================

    /// GET /v1/watchlist/{id}
    pub async fn get_watchlist(&self, id: &str) -> Response {
        Self::send(
            self.request(Method::GET, &format!("/v1/watchlist/{}", id)),
            "Get watchlist",
        )
        .await
    }

    /// GET /v1/watchlist/{id} and returns the body
    pub async fn get_watchlist_json(&self, id: &str) -> Value {
        let response = self.get_watchlist(id).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.expect("Invalid watchlist body")
    }

    /// PUT /v1/watchlist/{id}
    pub async fn update_watchlist(&self, id: &str, body: Value) -> Response {
        Self::send(
            self.request(Method::PUT, &format!("/v1/watchlist/{}", id))
                .json(&body),
            "Update watchlist",
        )
        .await
    }

    /// DELETE /v1/watchlist/{id}
    pub async fn delete_watchlist(&self, id: &str) -> Response {
        Self::send(
            self.request(Method::DELETE, &format!("/v1/watchlist/{}", id)),
            "Delete watchlist",
        )
        .await
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// POST /v1/watchlist/{id}/save
    pub async fn save_watchlist(&self, id: &str) -> Response {
        Self::send(
            self.request(Method::POST, &format!("/v1/watchlist/{}/save", id)),
            "Save watchlist",
        )
        .await
    }

    /// DELETE /v1/watchlist/{id}/save
    pub async fn unsave_watchlist(&self, id: &str) -> Response {
        Self::send(
            self.request(Method::DELETE, &format!("/v1/watchlist/{}/save", id)),
            "Unsave watchlist",
        )
        .await
    }

    /// POST /v1/watchlist/{id}/collaborators
    pub async fn add_collaborator(&self, id: &str, user_handle: &str) -> Response {
        Self::send(
            self.request(Method::POST, &format!("/v1/watchlist/{}/collaborators", id))
                .json(&json!({ "user_handle": user_handle })),
            "Add collaborator",
        )
        .await
    }

    /// DELETE /v1/watchlist/{id}/collaborators/{user_id}
    pub async fn remove_collaborator(&self, id: &str, user_id: usize) -> Response {
        Self::send(
            self.request(
                Method::DELETE,
                &format!("/v1/watchlist/{}/collaborators/{}", id, user_id),
            ),
            "Remove collaborator",
        )
        .await
    }

    /// POST /v1/watchlist/{id}/leave
    pub async fn leave_watchlist(&self, id: &str) -> Response {
        Self::send(
            self.request(Method::POST, &format!("/v1/watchlist/{}/leave", id)),
            "Leave watchlist",
        )
        .await
    }

    /// POST /v1/watchlist/{id}/duplicate
    pub async fn duplicate_watchlist(&self, id: &str) -> Response {
        Self::send(
            self.request(Method::POST, &format!("/v1/watchlist/{}/duplicate", id)),
            "Duplicate watchlist",
        )
        .await
    }

    // ========================================================================
    // Cover
    // ========================================================================

    /// PUT /v1/watchlist/{id}/cover
    pub async fn set_cover(&self, id: &str, cover_image: &str) -> Response {
        Self::send(
            self.request(Method::PUT, &format!("/v1/watchlist/{}/cover", id))
                .json(&json!({ "cover_image": cover_image })),
            "Set cover",
        )
        .await
    }

    /// DELETE /v1/watchlist/{id}/cover
    pub async fn clear_cover(&self, id: &str) -> Response {
        Self::send(
            self.request(Method::DELETE, &format!("/v1/watchlist/{}/cover", id)),
            "Clear cover",
        )
        .await
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// GET /v1/watchlist/{id}/items
    pub async fn get_items(&self, id: &str, sort: Option<(&str, &str)>) -> Response {
        let mut builder = self.request(Method::GET, &format!("/v1/watchlist/{}/items", id));
        if let Some((sort, direction)) = sort {
            builder = builder.query(&[("sort", sort), ("direction", direction)]);
        }
        Self::send(builder, "Get items").await
    }

    /// GET /v1/watchlist/{id}/items and returns the media ids in the returned order
    pub async fn get_item_ids(&self, id: &str, sort: Option<(&str, &str)>) -> Vec<String> {
        let response = self.get_items(id, sort).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let items: Vec<Value> = response.json().await.expect("Invalid items body");
        items
            .iter()
            .map(|i| i["media_id"].as_str().expect("Item without id").to_string())
            .collect()
    }

    /// POST /v1/watchlist/{id}/items, metadata resolved by the server
    pub async fn add_item(&self, id: &str, media_id: &str, media_kind: &str) -> Response {
        self.add_item_with(id, json!({ "media_id": media_id, "media_kind": media_kind }))
            .await
    }

    /// POST /v1/watchlist/{id}/items with a custom body
    pub async fn add_item_with(&self, id: &str, body: Value) -> Response {
        Self::send(
            self.request(Method::POST, &format!("/v1/watchlist/{}/items", id))
                .json(&body),
            "Add item",
        )
        .await
    }

    /// DELETE /v1/watchlist/{id}/items/{media_id}
    pub async fn remove_item(&self, id: &str, media_id: &str) -> Response {
        Self::send(
            self.request(
                Method::DELETE,
                &format!("/v1/watchlist/{}/items/{}", id, media_id),
            ),
            "Remove item",
        )
        .await
    }

    /// PUT /v1/watchlist/{id}/items/{media_id}/first
    pub async fn move_item_to_first(&self, id: &str, media_id: &str) -> Response {
        Self::send(
            self.request(
                Method::PUT,
                &format!("/v1/watchlist/{}/items/{}/first", id, media_id),
            ),
            "Move item to first",
        )
        .await
    }

    /// PUT /v1/watchlist/{id}/items/{media_id}/last
    pub async fn move_item_to_last(&self, id: &str, media_id: &str) -> Response {
        Self::send(
            self.request(
                Method::PUT,
                &format!("/v1/watchlist/{}/items/{}/last", id, media_id),
            ),
            "Move item to last",
        )
        .await
    }

    /// PUT /v1/watchlist/{id}/order
    pub async fn reorder_items(
        &self,
        id: &str,
        media_ids: &[&str],
        expected_version: Option<u64>,
    ) -> Response {
        Self::send(
            self.request(Method::PUT, &format!("/v1/watchlist/{}/order", id))
                .json(&json!({
                    "media_ids": media_ids,
                    "expected_version": expected_version,
                })),
            "Reorder items",
        )
        .await
    }
}
