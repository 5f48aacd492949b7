use crate::auth::TokenManager;
use crate::config::Config;
use crate::db::Database;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, patch, post},
};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod errors;
pub mod extract;
pub mod handlers;

use errors::AppError;

/// Shared application state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub tokens: Arc<TokenManager>,
}

impl AppState {
    pub fn new(db: Database, tokens: TokenManager) -> Self {
        AppState {
            db: Arc::new(Mutex::new(db)),
            tokens: Arc::new(tokens),
        }
    }

    /// Lock the database. Never hold the guard across an `.await`.
    pub fn db(&self) -> Result<MutexGuard<'_, Database>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".to_string()))
    }
}

/// Build the axum router with all routes.
///
/// With `static_dir`, unmatched non-API paths are served from that directory,
/// falling back to its `index.html` so client-side routes resolve.
pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    use handlers::{auth, tasks};

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/tasks", get(tasks::list).post(tasks::create))
        .route("/tasks/stats", get(tasks::stats))
        .route("/tasks/overdue", get(tasks::overdue))
        .route("/tasks/category/{category}", get(tasks::by_category))
        .route(
            "/tasks/{id}",
            get(tasks::get_one)
                .put(tasks::update)
                .patch(tasks::update)
                .delete(tasks::delete),
        )
        .route("/tasks/{id}/toggle", patch(tasks::toggle))
        .route("/tasks/{id}/subtasks", post(tasks::add_subtask))
        .route(
            "/tasks/{id}/subtasks/{subtask_id}",
            axum::routing::delete(tasks::remove_subtask),
        )
        .route(
            "/tasks/{id}/subtasks/{subtask_id}/toggle",
            patch(tasks::toggle_subtask),
        )
        .fallback(handlers::not_found);

    let router = Router::new().nest("/api", api);
    let router = match static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => router.fallback(handlers::not_found),
    };
    router.with_state(state)
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, String> {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    Ok(match origin {
        Some(origin) => {
            let value = HeaderValue::from_str(origin)
                .map_err(|e| format!("invalid CORS origin {origin:?}: {e}"))?;
            layer.allow_origin(AllowOrigin::exact(value))
        }
        None => layer.allow_origin(Any),
    })
}

/// Open the database, migrate it, and serve the API until shutdown.
pub async fn serve(config: &Config) -> Result<(), String> {
    let db = Database::open(&config.db_path)?;
    db.migrate()?;
    let state = AppState::new(db, TokenManager::new(&config.jwt_secret, config.token_ttl));

    if let Some(dir) = &config.static_dir {
        if !dir.join("index.html").is_file() {
            warn!("static dir {} has no index.html", dir.display());
        }
    }

    let app = create_router(state, config.static_dir.as_deref())
        .layer(cors_layer(config.cors_origin.as_deref())?)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("failed to bind to {addr}: {e}"))?;
    info!("taskdeck API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("server error: {e}"))?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
