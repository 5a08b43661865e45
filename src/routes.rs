// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{comments, preferences},
    state::AppState,
    utils::jwt::viewer_middleware,
};

/// Assembles the main application router.
///
/// * Every API route resolves the caller to a `Viewer`; mutations reject
///   anonymous viewers themselves.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (comment section, config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let comment_routes = Router::new()
        .route(
            "/{content_type}/{content_id}",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/{content_type}/{content_id}/tree", get(comments::comment_tree))
        .route("/{content_type}/{content_id}/events", get(comments::comment_events))
        .route(
            "/{content_type}/{content_id}/{comment_id}",
            delete(comments::delete_comment),
        );

    let profile_routes = Router::new().route(
        "/{id}/comment-preferences",
        get(preferences::get_preferences).put(preferences::update_preferences),
    );

    Router::new()
        .nest("/api/comments", comment_routes)
        .nest("/api/profiles", profile_routes)
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            viewer_middleware,
        ))
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
