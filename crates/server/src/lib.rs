use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower::util::ServiceExt;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;

use services::{ai::AiService, storage::StorageService, weather::WeatherService};

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
    pub config: config::Config,
    pub storage: StorageService,
    pub weather: WeatherService,
    pub ai: AiService,
}

impl AppState {
    pub fn new(db: db::Database, config: config::Config) -> Self {
        let http = reqwest::Client::new();
        Self {
            storage: StorageService::new(&config.storage_path, &config.public_base_url),
            weather: WeatherService::new(http.clone(), &config.weather_api_url),
            ai: AiService::new(http, config.gemini_api_key.clone(), &config.gemini_model),
            db,
            config,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Build protected routes (require authentication)
    let project_routes = routes::projects::router()
        .merge(routes::tasks::router())
        .merge(routes::progress::router())
        .merge(routes::dashboard::router())
        .merge(routes::logs::router())
        .merge(routes::notes::router())
        .merge(routes::reports::router())
        .merge(routes::supplies::router())
        .merge(routes::media::router());

    let protected_routes = Router::new()
        .nest("/session", routes::session::router())
        .nest("/profile", routes::profile::router())
        .nest("/organizations", routes::organizations::router())
        .nest("/projects", project_routes)
        .nest("/weather", routes::weather::router())
        .nest("/ai", routes::ai::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let api_router = Router::new()
        .nest("/auth", routes::auth::router())
        .merge(protected_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .nest_service("/uploads", ServeDir::new(state.storage.root()))
        .fallback(serve_spa)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}

async fn serve_spa(
    axum::extract::State(state): axum::extract::State<AppState>,
    req: Request<Body>,
) -> Response {
    let static_dir = state.config.static_dir.clone();
    let path = req.uri().path();

    // Try to serve static file first
    let static_path = std::path::Path::new(&static_dir).join(path.trim_start_matches('/'));
    if path != "/" && static_path.is_file() {
        return match ServeDir::new(&static_dir).oneshot(req).await {
            Ok(res) => res.into_response(),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
    }

    // For SPA routes, serve index.html
    match tokio::fs::read(std::path::Path::new(&static_dir).join("index.html")).await {
        Ok(contents) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/html")],
            contents,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}
