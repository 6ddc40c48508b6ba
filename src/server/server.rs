use anyhow::Result;
use std::time::Duration;

use tower_http::services::ServeDir;
use tracing::info;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::session::Session;
use super::{log_requests, state::*, ServerConfig};
use crate::library::{
    ItemSort, NewItem, SortDirection, WatchlistManager, WatchlistResult, WatchlistView,
};
use crate::watchlist::{Watchlist, WatchlistDetails, WatchlistItem};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct ReorderWatchlistsBody {
    pub watchlist_ids: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct AddCollaboratorBody {
    pub user_handle: String,
}

#[derive(Deserialize, Debug)]
struct SetCoverBody {
    pub cover_image: String,
}

#[derive(Deserialize, Debug)]
struct ReorderItemsBody {
    pub media_ids: Vec<String>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct ItemsQuery {
    pub sort: ItemSort,
    pub direction: SortDirection,
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

async fn get_watchlists(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
) -> WatchlistResult<Json<Vec<WatchlistView>>> {
    Ok(Json(manager.list_watchlists(session.user_id)?))
}

async fn post_watchlist(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Json(body): Json<WatchlistDetails>,
) -> WatchlistResult<impl IntoResponse> {
    let view = manager.create_watchlist(session.user_id, body)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn put_watchlists_order(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Json(body): Json<ReorderWatchlistsBody>,
) -> WatchlistResult<Json<Vec<WatchlistView>>> {
    Ok(Json(
        manager.reorder_watchlists(session.user_id, body.watchlist_ids)?,
    ))
}

async fn get_watchlist(
    session: Option<Session>,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
) -> WatchlistResult<Json<WatchlistView>> {
    let viewer_id = session.map(|s| s.user_id);
    Ok(Json(manager.get_watchlist(viewer_id, &id)?))
}

async fn put_watchlist(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
    Json(body): Json<WatchlistDetails>,
) -> WatchlistResult<Json<WatchlistView>> {
    Ok(Json(manager.update_details(session.user_id, &id, body)?))
}

async fn delete_watchlist(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
) -> WatchlistResult<StatusCode> {
    manager.delete_watchlist(session.user_id, &id)?;
    Ok(StatusCode::OK)
}

async fn save_watchlist(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
) -> WatchlistResult<Json<WatchlistView>> {
    Ok(Json(manager.save_watchlist(session.user_id, &id)?))
}

async fn unsave_watchlist(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
) -> WatchlistResult<StatusCode> {
    manager.unsave_watchlist(session.user_id, &id)?;
    Ok(StatusCode::OK)
}

async fn post_collaborator(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
    Json(body): Json<AddCollaboratorBody>,
) -> WatchlistResult<Json<WatchlistView>> {
    Ok(Json(manager.add_collaborator(
        session.user_id,
        &id,
        &body.user_handle,
    )?))
}

async fn delete_collaborator(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path((id, user_id)): Path<(String, usize)>,
) -> WatchlistResult<StatusCode> {
    manager.remove_collaborator(session.user_id, &id, user_id)?;
    Ok(StatusCode::OK)
}

async fn leave_watchlist(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
) -> WatchlistResult<StatusCode> {
    manager.leave_watchlist(session.user_id, &id)?;
    Ok(StatusCode::OK)
}

async fn duplicate_watchlist(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
) -> WatchlistResult<impl IntoResponse> {
    let view = manager.duplicate_watchlist(session.user_id, &id)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn put_cover(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
    Json(body): Json<SetCoverBody>,
) -> WatchlistResult<Json<WatchlistView>> {
    Ok(Json(manager.set_custom_cover(
        session.user_id,
        &id,
        body.cover_image,
    )?))
}

async fn delete_cover(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
) -> WatchlistResult<Json<WatchlistView>> {
    Ok(Json(manager.clear_custom_cover(session.user_id, &id)?))
}

async fn get_items(
    session: Option<Session>,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
    Query(query): Query<ItemsQuery>,
) -> WatchlistResult<Json<Vec<WatchlistItem>>> {
    let viewer_id = session.map(|s| s.user_id);
    Ok(Json(manager.get_items(
        viewer_id,
        &id,
        query.sort,
        query.direction,
    )?))
}

async fn post_item(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
    Json(body): Json<NewItem>,
) -> WatchlistResult<impl IntoResponse> {
    let watchlist = manager.add_item(session.user_id, &id, body).await?;
    Ok((StatusCode::CREATED, Json(watchlist)))
}

async fn delete_item(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path((id, media_id)): Path<(String, String)>,
) -> WatchlistResult<Json<Watchlist>> {
    Ok(Json(manager.remove_item(session.user_id, &id, &media_id)?))
}

async fn put_item_first(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path((id, media_id)): Path<(String, String)>,
) -> WatchlistResult<Json<Watchlist>> {
    Ok(Json(manager.move_item_to_first(
        session.user_id,
        &id,
        &media_id,
    )?))
}

async fn put_item_last(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path((id, media_id)): Path<(String, String)>,
) -> WatchlistResult<Json<Watchlist>> {
    Ok(Json(manager.move_item_to_last(
        session.user_id,
        &id,
        &media_id,
    )?))
}

async fn put_items_order(
    session: Session,
    State(manager): State<GuardedWatchlistManager>,
    Path(id): Path<String>,
    Json(body): Json<ReorderItemsBody>,
) -> WatchlistResult<Json<Watchlist>> {
    Ok(Json(manager.reorder_items(
        session.user_id,
        &id,
        &body.media_ids,
        body.expected_version,
    )?))
}

pub fn make_app(config: ServerConfig, watchlist_manager: WatchlistManager) -> Result<Router> {
    let state = ServerState::new(config.clone(), watchlist_manager);

    let watchlists_routes: Router = Router::new()
        .route("/", get(get_watchlists))
        .route("/", post(post_watchlist))
        .route("/order", put(put_watchlists_order))
        .with_state(state.clone());

    let watchlist_routes: Router = Router::new()
        .route("/{id}", get(get_watchlist))
        .route("/{id}", put(put_watchlist))
        .route("/{id}", delete(delete_watchlist))
        .route("/{id}/save", post(save_watchlist))
        .route("/{id}/save", delete(unsave_watchlist))
        .route("/{id}/collaborators", post(post_collaborator))
        .route("/{id}/collaborators/{user_id}", delete(delete_collaborator))
        .route("/{id}/leave", post(leave_watchlist))
        .route("/{id}/duplicate", post(duplicate_watchlist))
        .route("/{id}/cover", put(put_cover))
        .route("/{id}/cover", delete(delete_cover))
        .route("/{id}/items", get(get_items))
        .route("/{id}/items", post(post_item))
        .route("/{id}/order", put(put_items_order))
        .route("/{id}/items/{media_id}", delete(delete_item))
        .route("/{id}/items/{media_id}/first", put(put_item_first))
        .route("/{id}/items/{media_id}/last", put(put_item_last))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .nest("/v1/watchlists", watchlists_routes)
        .nest("/v1/watchlist", watchlist_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(config: ServerConfig, watchlist_manager: WatchlistManager) -> Result<()> {
    let port = config.port;
    let app = make_app(config, watchlist_manager)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Listening on port {}", port);

    Ok(axum::serve(listener, app).await?)
}
