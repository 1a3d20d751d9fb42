use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use lambda_http::tracing::debug;
use shared::models::entity::{Entity, Page, Versioned};
use shared::models::game::{AddMoveRequest, AddRoundRequest, CreateGameRequest, Game};

use crate::{
    error::ApiError,
    middleware::{auth::AuthenticatedUser, preconditions::ConditionalHeaders},
    routes::{created_response, versioned_response, ListParams},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/games", get(list_games).post(create_game))
        .route("/games/{id}", get(get_game).delete(delete_game))
        .route("/games/{id}/rounds", post(add_round))
        .route("/games/{id}/rounds/{round_id}/moves", post(add_move))
        .route("/games/{id}/rounds/{round_id}/finish", post(finish_round))
        .route("/games/{id}/finish", post(finish_game))
}

fn game_response(game: &Versioned<Game>) -> Response {
    versioned_response(StatusCode::OK, game.etag.as_deref(), &game.value)
}

async fn list_games(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Entity>>, ApiError> {
    state
        .game_service
        .list_games(params.limit, params.cursor.as_deref())
        .await
        .map(Json)
        .map_err(ApiError::from)
}

async fn create_game(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(request): Json<CreateGameRequest>,
) -> Result<Response, ApiError> {
    let game = state.game_service.create_game(request).await?;
    debug!("Game {} created by {}", game.value.id, caller.user_id);
    Ok(created_response(
        format!("/games/{}", game.value.id),
        game.etag.as_deref(),
        &game.value,
    ))
}

async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
) -> Result<Response, ApiError> {
    let game = state.game_service.get_game(&id, preconditions).await?;
    Ok(game_response(&game))
}

async fn delete_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
    caller: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state.game_service.delete_game(&id, preconditions).await?;
    debug!("Game {} deleted by {}", id, caller.user_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn add_round(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
    caller: AuthenticatedUser,
    Json(request): Json<AddRoundRequest>,
) -> Result<Response, ApiError> {
    let game = state
        .game_service
        .add_round(&id, request, preconditions.if_match)
        .await?;
    debug!("Round added to game {} by {}", id, caller.user_id);
    Ok(game_response(&game))
}

async fn add_move(
    State(state): State<AppState>,
    Path((id, round_id)): Path<(String, String)>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
    caller: AuthenticatedUser,
    Json(request): Json<AddMoveRequest>,
) -> Result<Response, ApiError> {
    let game = state
        .game_service
        .add_move(&id, &round_id, request, preconditions.if_match)
        .await?;
    debug!("Move added to {}/{} by {}", id, round_id, caller.user_id);
    Ok(game_response(&game))
}

async fn finish_round(
    State(state): State<AppState>,
    Path((id, round_id)): Path<(String, String)>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
    caller: AuthenticatedUser,
) -> Result<Response, ApiError> {
    let game = state
        .game_service
        .finish_round(&id, &round_id, preconditions.if_match)
        .await?;
    debug!("Round {}/{} finished by {}", id, round_id, caller.user_id);
    Ok(game_response(&game))
}

async fn finish_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
    caller: AuthenticatedUser,
) -> Result<Response, ApiError> {
    let game = state
        .game_service
        .finish_game(&id, preconditions.if_match)
        .await?;
    debug!("Game {} finished by {}", id, caller.user_id);
    Ok(game_response(&game))
}
