//! Capmatrix REST API Server
//!
//! Run with: cargo run --features server --bin capmatrix-server
//!
//! Environment:
//!   CAPMATRIX_DB  - database directory (default ./data/capmatrix.mdb)
//!   PORT          - listen port (default 3000)
//!   RUST_LOG      - log filter (default info)
//!
//! Endpoints:
//!   GET  /status                   - Session status
//!   GET  /menus                    - Menu tree nodes with levels
//!   PUT  /menus                    - Replace menu catalog (resets the session)
//!   GET  /permissions              - List permissions
//!   POST /permissions              - Create or rename a permission
//!   GET  /permissions/:id/grants   - Stored leaf grants of a permission
//!   POST /session/select           - Select a permission and load its grants
//!   GET  /session/matrix           - Tri-state matrix of the selected permission
//!   POST /session/toggle           - Set one cell (cascades below internal nodes)
//!   POST /session/column           - Select or clear a whole column
//!   POST /session/save             - Persist the selected permission's leaf grants

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use capmatrix::{
    FetchOutcome, Flag, GrantBackend, GrantDb, LeafGrant, MatrixError, MatrixRow, MatrixSession, MenuNode,
    MenuRecord, MenuTree, NodeKey, Permission, PermissionId, SaveOutcome, SessionState, TriState,
};

// ============================================================================
// Config
// ============================================================================

struct Config {
    db_path: String,
    port: u16,
}

impl Config {
    fn from_env() -> Self {
        let db_path = std::env::var("CAPMATRIX_DB").unwrap_or_else(|_| "./data/capmatrix.mdb".into());
        let port = std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3000);
        Self { db_path, port }
    }
}

// ============================================================================
// State
// ============================================================================

struct AppState {
    db: Arc<GrantDb>,
    session: Mutex<MatrixSession>,
}

impl AppState {
    /// Never held across an await point
    fn session(&self) -> MutexGuard<'_, MatrixSession> {
        self.session.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Run an LMDB call off the async runtime
    async fn blocking<T, F>(&self, f: F) -> capmatrix::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&GrantDb) -> capmatrix::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| MatrixError::Io(std::io::Error::other(e)))?
    }
}

type Shared = Arc<AppState>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
struct CreatePermissionReq {
    id: PermissionId,
    name: String,
}

#[derive(Deserialize)]
struct SelectReq {
    permission_id: PermissionId,
}

#[derive(Deserialize)]
struct ToggleReq {
    key: String,
    flag: Flag,
    value: bool,
}

#[derive(Deserialize)]
struct ColumnReq {
    flag: Flag,
    value: bool,
}

#[derive(Serialize)]
struct StatusRes {
    permission_id: Option<PermissionId>,
    state: SessionState,
    dirty: bool,
    nodes: usize,
}

#[derive(Serialize)]
struct SelectRes {
    permission_id: PermissionId,
    stale: bool,
    applied: usize,
    skipped: usize,
}

#[derive(Serialize)]
struct MatrixRes {
    permission_id: Option<PermissionId>,
    state: SessionState,
    dirty: bool,
    columns: Vec<(Flag, TriState)>,
    rows: Vec<MatrixRow>,
}

#[derive(Serialize)]
struct SaveRes {
    permission_id: PermissionId,
    grants: usize,
    stale: bool,
}

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn reply<T>(r: capmatrix::Result<T>) -> Reply<T> {
    match r {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))),
        Err(e) => (status_of(&e), Json(ApiResponse::err(e.to_string()))),
    }
}

fn status_of(e: &MatrixError) -> StatusCode {
    match e {
        MatrixError::UnknownNode(_) => StatusCode::NOT_FOUND,
        MatrixError::UnknownFlag(_) => StatusCode::BAD_REQUEST,
        MatrixError::NoSelection | MatrixError::InvalidState { .. } => StatusCode::CONFLICT,
        MatrixError::Fetch { .. } | MatrixError::Save { .. } => StatusCode::BAD_GATEWAY,
        MatrixError::Storage(_) | MatrixError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_status(State(app): State<Shared>) -> Reply<StatusRes> {
    let s = app.session();
    reply(Ok(StatusRes {
        permission_id: s.permission_id(),
        state: s.state(),
        dirty: s.is_dirty(),
        nodes: s.tree().len(),
    }))
}

async fn get_menus(State(app): State<Shared>) -> Reply<Vec<MenuNode>> {
    reply(Ok(app.session().tree().nodes().to_vec()))
}

async fn put_menus(State(app): State<Shared>, Json(records): Json<Vec<MenuRecord>>) -> Reply<usize> {
    let tree = MenuTree::build(&records);
    let r = app.blocking(move |db| db.put_menus(&records)).await;
    reply(r.map(|()| {
        let nodes = tree.len();
        app.session().reset_tree(tree);
        nodes
    }))
}

async fn get_permissions(State(app): State<Shared>) -> Reply<Vec<Permission>> {
    reply(app.blocking(|db| db.list_permissions()).await)
}

async fn post_permission(State(app): State<Shared>, Json(req): Json<CreatePermissionReq>) -> Reply<Permission> {
    let r = app
        .blocking(move |db| {
            db.put_permission(req.id, &req.name)?;
            Ok(Permission { id: req.id, name: req.name })
        })
        .await;
    reply(r)
}

async fn get_grants(State(app): State<Shared>, Path(id): Path<PermissionId>) -> Reply<Vec<LeafGrant>> {
    reply(app.blocking(move |db| db.fetch_grants(id)).await)
}

async fn post_select(State(app): State<Shared>, Json(req): Json<SelectReq>) -> Reply<SelectRes> {
    let ticket = app.session().select(req.permission_id);
    let fetched = app.blocking(move |db| db.fetch_grants(req.permission_id)).await;
    let outcome = app.session().complete_fetch(ticket, fetched);
    reply(outcome.map(|o| match o {
        FetchOutcome::Hydrated(report) => SelectRes {
            permission_id: req.permission_id,
            stale: false,
            applied: report.applied,
            skipped: report.skipped,
        },
        FetchOutcome::Stale => SelectRes { permission_id: req.permission_id, stale: true, applied: 0, skipped: 0 },
    }))
}

async fn get_matrix(State(app): State<Shared>) -> Reply<MatrixRes> {
    let s = app.session();
    let r = s.matrix().and_then(|rows| {
        let columns = Flag::ALL
            .into_iter()
            .map(|f| s.column_state(f).map(|t| (f, t)))
            .collect::<capmatrix::Result<Vec<_>>>()?;
        Ok(MatrixRes { permission_id: s.permission_id(), state: s.state(), dirty: s.is_dirty(), columns, rows })
    });
    reply(r)
}

async fn post_toggle(State(app): State<Shared>, Json(req): Json<ToggleReq>) -> Reply<TriState> {
    let key = NodeKey::from(req.key);
    let mut s = app.session();
    reply(s.toggle(&key, req.flag, req.value).and_then(|()| s.aggregated_state(&key, req.flag)))
}

async fn post_column(State(app): State<Shared>, Json(req): Json<ColumnReq>) -> Reply<TriState> {
    let mut s = app.session();
    reply(s.set_column(req.flag, req.value).and_then(|()| s.column_state(req.flag)))
}

async fn post_save(State(app): State<Shared>) -> Reply<SaveRes> {
    let begun = app.session().begin_save();
    let ticket = match begun {
        Ok(t) => t,
        Err(e) => return reply(Err(e)),
    };
    let payload = ticket.payload.clone();
    let (permission_id, grants) = (payload.permission_id, payload.permissions.len());
    let saved = app.blocking(move |db| db.save_grants(&payload)).await;
    let outcome = app.session().complete_save(ticket, saved);
    reply(outcome.map(|o| SaveRes { permission_id, grants, stale: o == SaveOutcome::Stale }))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    info!(path = %config.db_path, "initializing database");
    let db = GrantDb::open(&config.db_path)?;
    let session = MatrixSession::from_source(&db)?;

    // CORS for demo
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let state = Arc::new(AppState { db: Arc::new(db), session: Mutex::new(session) });

    let app = Router::new()
        .route("/status", get(get_status))
        .route("/menus", get(get_menus).put(put_menus))
        .route("/permissions", get(get_permissions).post(post_permission))
        .route("/permissions/:id/grants", get(get_grants))
        .route("/session/select", post(post_select))
        .route("/session/matrix", get(get_matrix))
        .route("/session/toggle", post(post_toggle))
        .route("/session/column", post(post_column))
        .route("/session/save", post(post_save))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!(%addr, "capmatrix server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
