//! Test fixtures: seeded user database and fake boundary services

use super::constants::*;
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use watchlist_server::user::{AuthToken, AuthTokenValue, UserAuthTokenStore};
use watchlist_server::{SqliteUserStore, UserStore};

/// A seeded user: id and a session token issued for it
#[derive(Clone, Debug)]
pub struct SeededUser {
    pub id: usize,
    pub token: String,
}

/// Creates a temporary directory with a user.db holding every test user.
/// Returns (temp_dir, db_dir, users by handle)
pub fn create_test_db_with_users() -> Result<(TempDir, PathBuf, HashMap<String, SeededUser>)> {
    let dir = TempDir::new()?;
    let db_dir = dir.path().to_path_buf();
    let user_store = SqliteUserStore::new(db_dir.join("user.db"))?;

    let mut users = HashMap::new();
    for handle in TEST_USERS {
        let id = user_store.create_user(handle, Some(&format!("{handle}@example.com")))?;
        let token = AuthTokenValue::generate();
        user_store.add_user_auth_token(AuthToken::new(id, token.clone()))?;
        users.insert(handle.to_string(), SeededUser { id, token: token.0 });
    }

    Ok((dir, db_dir, users))
}

async fn fake_metadata(Path((kind, media_id)): Path<(String, String)>) -> Response {
    if media_id == MISSING_MEDIA_ID {
        return StatusCode::NOT_FOUND.into_response();
    }
    let mut body = json!({
        "title": format!("Title {}", media_id),
        "poster_url": format!("https://posters.test/{}.jpg", media_id),
        "runtime": FAKE_RUNTIME_MINUTES,
        "platforms": [{"name": "Netflix", "logo": "https://logos.test/netflix.png"}],
    });
    if kind == "series" {
        body["season_count"] = json!(1);
        body["episode_count"] = json!(FAKE_EPISODE_COUNT);
    }
    Json(body).into_response()
}

async fn fake_compose(
    State(counter): State<Arc<AtomicUsize>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
    let posters = body["posters"].as_array().map(|p| p.len()).unwrap_or(0);
    Json(json!({ "url": format!("https://covers.test/{}-{}.png", n, posters) }))
}

/// Spawns fake metadata and cover services on one random port.
/// Returns the base url; metadata lives at `/{kind}/{id}`, composition at `/compose`.
pub async fn spawn_fake_media_services() -> Result<String> {
    let app = Router::new()
        .route("/{kind}/{media_id}", get(fake_metadata))
        .route("/compose", post(fake_compose))
        .with_state(Arc::new(AtomicUsize::new(0)));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://127.0.0.1:{}", port))
}
