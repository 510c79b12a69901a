// 🌐 REST API - Axum router for players and tournament proxy
//
// Routes (mounted under /api):
//   GET    /players               → full roster
//   GET    /players/search?q=     → tag/alias search
//   POST   /players               → insert
//   PUT    /players/:tag          → update (exact tag)
//   DELETE /players/:tag          → delete (exact tag, idempotent)
//   DELETE /players/all           → clear roster
//   POST   /players/import        → multipart upload, field "file"
// PUT on search/import/all and DELETE on search/import address players with
// those literal tags.
//   GET    /tournament/slambana   → start.gg listing (?page=N)
//   GET    /tournament/:slug      → start.gg tournament detail
// Plus GET /health at the root.

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        Multipart, Path, Query, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put, MethodRouter},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::db::RosterStore;
use crate::entities::PlayerRecord;
use crate::error::RosterError;
use crate::parser::decode_upload;
use crate::reconciliation::ReconcileOptions;
use crate::startgg::{StartGgClient, StartGgError};

// ============================================================================
// STATE
// ============================================================================

/// Shared application state
///
/// Store calls run inline on the request task; each mutation holds the roster
/// write lock until its snapshot is fsynced.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RosterStore>,
    pub startgg: Arc<StartGgClient>,
    pub import_options: ReconcileOptions,
}

// ============================================================================
// ERRORS
// ============================================================================

/// Caller-facing error: status code + `{ "error": message }`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<RosterError> for ApiError {
    fn from(err: RosterError) -> Self {
        let status = match &err {
            RosterError::NotFound { .. } => StatusCode::NOT_FOUND,
            RosterError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            RosterError::StorageFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<StartGgError> for ApiError {
    fn from(err: StartGgError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        } else {
            warn!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// RESPONSE TYPES
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub message: String,
    pub before_count: usize,
    pub after_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub message: String,
    pub new_players: usize,
    pub updated_players: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
}

// ============================================================================
// PLAYER HANDLERS
// ============================================================================

/// GET /api/players
async fn list_players(State(state): State<AppState>) -> ApiResult<Vec<PlayerRecord>> {
    Ok(Json(state.store.list_all()))
}

/// GET /api/players/search?q=
async fn search_players(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<PlayerRecord>> {
    Ok(Json(state.store.search(&params.q)))
}

/// Request body for create/update. Rejections become `{ "error": ... }` like every other failure.
type PlayerBody = Result<Json<PlayerRecord>, JsonRejection>;

/// Body → validated record with its alias set deduplicated
fn player_from_body(body: PlayerBody) -> Result<PlayerRecord, ApiError> {
    let Json(mut player) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    player.validate()?;
    player.dedup_aliases();
    Ok(player)
}

fn update_by_tag(state: &AppState, tag: &str, body: PlayerBody) -> ApiResult<PlayerRecord> {
    let player = player_from_body(body)?;
    Ok(Json(state.store.update(tag, player)?))
}

fn delete_by_tag(state: &AppState, tag: &str) -> ApiResult<Value> {
    state.store.delete(tag)?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/players
async fn create_player(State(state): State<AppState>, body: PlayerBody) -> ApiResult<PlayerRecord> {
    let player = player_from_body(body)?;
    Ok(Json(state.store.insert(player)?))
}

/// PUT /api/players/:tag
async fn update_player(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    body: PlayerBody,
) -> ApiResult<PlayerRecord> {
    update_by_tag(&state, &tag, body)
}

/// DELETE /api/players/:tag
async fn delete_player(State(state): State<AppState>, Path(tag): Path<String>) -> ApiResult<Value> {
    delete_by_tag(&state, &tag)
}

/// PUT for a tag that collides with a static route (`search`, `import`, `all`)
fn update_literal_tag(tag: &'static str) -> MethodRouter<AppState> {
    put(move |State(state): State<AppState>, body: PlayerBody| async move {
        update_by_tag(&state, tag, body)
    })
}

/// PUT + DELETE for a tag that collides with a static route
fn literal_tag_routes(tag: &'static str) -> MethodRouter<AppState> {
    update_literal_tag(tag).delete(move |State(state): State<AppState>| async move {
        delete_by_tag(&state, tag)
    })
}

/// DELETE /api/players/all
async fn clear_players(State(state): State<AppState>) -> ApiResult<ClearResponse> {
    let before_count = state.store.clear()?;
    let after_count = state.store.count();

    Ok(Json(ClearResponse {
        message: "Database cleared successfully".to_string(),
        before_count,
        after_count,
    }))
}

/// POST /api/players/import (multipart, field "file")
async fn import_players(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ImportResponse> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid upload: {}", e)))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) = upload.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let (source, rows) = decode_upload(&filename, &bytes)?;
    info!(file = %filename, source = source.name(), rows = rows.len(), "importing players");

    let report = state.store.import(&rows, source, state.import_options)?;

    Ok(Json(ImportResponse {
        message: "Import successful".to_string(),
        new_players: report.new_players,
        updated_players: report.updated_players,
    }))
}

// ============================================================================
// TOURNAMENT HANDLERS
// ============================================================================

/// GET /api/tournament/slambana?page=N
async fn slambana_tournaments(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Value> {
    let page = params
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1);

    let data = state.startgg.slambana_tournaments(page).await?;

    let tournaments = data.get("tournaments").cloned().unwrap_or(Value::Null);
    if !tournaments.get("nodes").is_some_and(Value::is_array) {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Invalid API response structure",
        ));
    }

    Ok(Json(json!({ "data": { "tournaments": tournaments } })))
}

/// GET /api/tournament/:slug
async fn tournament_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Value> {
    Ok(Json(state.startgg.tournament(&slug).await?))
}

/// GET /health
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ============================================================================
// ROUTER
// ============================================================================

/// CORS for the configured frontend origins. Unparseable origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/players", get(list_players).post(create_player))
        // Static segments win over `:tag` for every method, so the colliding
        // tags get their PUT/DELETE here. DELETE /players/all still clears.
        .route("/players/search", literal_tag_routes("search").get(search_players))
        .route("/players/import", literal_tag_routes("import").post(import_players))
        .route("/players/all", update_literal_tag("all").delete(clear_players))
        .route("/players/:tag", put(update_player).delete(delete_player))
        .route("/tournament/slambana", get(slambana_tournaments))
        .route("/tournament/:slug", get(tournament_detail))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
}

// ============================================================================
// TESTS
// ============================================================================
