use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use iboard_types::{Idea, VoteDirection};
use iboard_types::api::{ApiResponse, CreateIdeaRequest, VoteRequest};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// GET /ideas: the full board, newest first.
pub async fn list_ideas(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let ideas = run_blocking(&state, |svc| svc.list()).await?;

    info!("Fetched {} ideas", ideas.len());
    let count = ideas.len();
    Ok(Json(ApiResponse::ok(ideas).with_count(count)))
}

/// GET /ideas/{id}
pub async fn get_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let idea = run_blocking(&state, move |svc| svc.get(&id)).await?;
    Ok(Json(ApiResponse::ok(idea)))
}

/// POST /ideas
pub async fn create_idea(
    State(state): State<AppState>,
    payload: Result<Json<CreateIdeaRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(reject_body)?;

    let idea = run_blocking(&state, move |svc| svc.create(&req.text)).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(idea).with_message("Idea created successfully")),
    ))
}

/// POST /ideas/upvote
pub async fn upvote_idea(
    state: State<AppState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    vote(state, payload, VoteDirection::Up).await
}

/// POST /ideas/downvote
pub async fn downvote_idea(
    state: State<AppState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    vote(state, payload, VoteDirection::Down).await
}

async fn vote(
    State(state): State<AppState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
    direction: VoteDirection,
) -> Result<Json<ApiResponse<Idea>>, ApiError> {
    let Json(req) = payload.map_err(reject_body)?;

    let idea = run_blocking(&state, move |svc| svc.vote(&req.id, direction)).await?;

    let message = match direction {
        VoteDirection::Up => "Idea upvoted successfully",
        VoteDirection::Down => "Idea downvoted successfully",
    };
    Ok(Json(ApiResponse::ok(idea).with_message(message)))
}

/// GET /ideas/stats
pub async fn idea_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = run_blocking(&state, |svc| svc.stats()).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

fn reject_body(rejection: JsonRejection) -> ApiError {
    warn!("Rejected request body: {}", rejection.body_text());
    ApiError::validation(format!("Validation failed: {}", rejection.body_text()))
}
