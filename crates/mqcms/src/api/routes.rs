//! API route definitions.

use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    routing::{any, delete, get, post, put},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

use crate::config::ServerConfig;
use crate::ws::ws_handler;

use super::handlers::{self, layout, media, realtime, settings};
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let upload_limit = DefaultBodyLimit::max(state.config.server.max_upload_bytes);
    let static_dir = state.config.server.static_dir.clone();

    let router = Router::new()
        .route("/health", get(handlers::health))
        // Realtime
        .route("/ws", get(ws_handler))
        .route("/api/stats", get(realtime::stats))
        .route("/api/message", post(realtime::post_message))
        .route("/api/media_updated", post(realtime::media_updated))
        .route("/api/settings_updated", post(realtime::settings_updated))
        .route("/api/playlist_updated", post(realtime::playlist_updated))
        // Media
        .route(
            "/api/media",
            get(media::list_media)
                .post(media::upload_media)
                .layer(upload_limit),
        )
        .route("/api/media/{key}", delete(media::delete_media))
        .route("/media/{key}", get(media::get_media))
        // Settings
        .route(
            "/api/settings",
            get(settings::get_settings).put(settings::put_settings),
        )
        // Layout
        .route("/api/assignments", get(layout::list_assignments))
        .route(
            "/api/assignments/{key}",
            put(layout::put_assignment).delete(layout::delete_assignment),
        )
        .route("/api/media_with_settings", get(layout::media_with_settings))
        .route("/api/{*rest}", any(handlers::api_fallback))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => {
            info!("Serving static assets from {}", dir);
            router.fallback_service(
                ServeDir::new(dir).not_found_service(handlers::static_not_found.into_service()),
            )
        }
        None => router.fallback(handlers::static_not_found),
    };

    router.layer(cors).layer(trace_layer)
}

/// Build the CORS layer from the configured origins.
///
/// With no origins configured any origin may call the API; displays are
/// often opened from file:// or a different port.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT];

    if config.allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        warn!("CORS: All configured origins are invalid, denying cross-origin requests");
        return CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")));
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
}
