use axum::{
    Json, Router,
    http::{Method, StatusCode, Uri},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::warn;

use iboard_types::api::ErrorBody;

use crate::health;
use crate::ideas;
use crate::rate_limit::{self, RateLimitConfig, RateLimiter};
use crate::state::AppState;

/// Assemble the full HTTP surface: `/` info, everything else under `/api`.
pub fn router(state: AppState, limits: &RateLimitConfig) -> Router {
    let general = RateLimiter::new(
        limits.general,
        "Too many requests from this IP, please try again later.",
    );
    let ideas_api = RateLimiter::new(
        limits.ideas,
        "Too many requests to ideas API, please try again later.",
    );
    let writes = RateLimiter::for_writes(
        limits.writes,
        "Too many write operations from this IP, please try again later.",
    );
    let creates = RateLimiter::for_writes(
        limits.creates,
        "Too many ideas created from this IP, please try again later.",
    );

    let idea_routes = Router::new()
        .route("/ideas", get(ideas::list_ideas))
        .route(
            "/ideas",
            post(ideas::create_idea).layer(from_fn_with_state(creates, rate_limit::enforce)),
        )
        .route("/ideas/stats", get(ideas::idea_stats))
        .route(
            "/ideas/upvote",
            post(ideas::upvote_idea)
                .layer(from_fn_with_state(writes.clone(), rate_limit::enforce)),
        )
        .route(
            "/ideas/downvote",
            post(ideas::downvote_idea).layer(from_fn_with_state(writes, rate_limit::enforce)),
        )
        .route("/ideas/{id}", get(ideas::get_idea))
        .layer(from_fn_with_state(ideas_api, rate_limit::enforce));

    let api = Router::new()
        .route("/", get(health::info))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .merge(idea_routes)
        .layer(from_fn_with_state(general, rate_limit::enforce));

    Router::new()
        .route("/", get(health::info))
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    warn!("404 - Route not found: {} {}", method, uri);
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            success: false,
            error: "Route not found".into(),
            details: Some(format!("{} {}", method, uri)),
            retry_after: None,
        }),
    )
}
