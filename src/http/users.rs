//! User endpoints: admin edits, wallet connect events, task completions.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::models::Page;
use crate::models::user::{
    CompletionRequest, UserFilter, UserInput, UserPatch, UserView, WalletConnection,
};
use crate::state::AppState;

use super::{HttpError, actor_from_headers};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(upsert_user))
        .route("/connect", post(connect_wallet))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/{id}/disconnect", post(disconnect_wallet))
        .route("/{id}/completions", post(complete_task))
}

#[derive(Debug, Deserialize, Default)]
struct ListQuery {
    connected: Option<bool>,
    min_points: Option<i32>,
    limit: Option<u64>,
    offset: Option<u64>,
}

async fn list_users(
    Query(query): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserView>>, HttpError> {
    let filter = UserFilter {
        connected: query.connected,
        min_points: query.min_points,
    };
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    let users = state
        .store
        .list_users(&filter, &page)
        .await
        .map_err(HttpError::from_store)?;
    Ok(Json(users))
}

async fn get_user(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserView>, HttpError> {
    state
        .store
        .user_by_id(&id)
        .await
        .map_err(HttpError::from_store)?
        .map(Json)
        .ok_or_else(|| HttpError::not_found(format!("User {id} not found")))
}

async fn upsert_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<UserView>), HttpError> {
    let actor = actor_from_headers(&headers, &state);
    state
        .store
        .upsert_user(&actor, &input)
        .await
        .map_err(HttpError::from_store)?;

    let view = state
        .store
        .user_by_id(&input.id)
        .await
        .map_err(HttpError::from_store)?
        .ok_or_else(|| HttpError::not_found(format!("User {} not found", input.id)))?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn update_user(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserView>, HttpError> {
    let actor = actor_from_headers(&headers, &state);
    let matched = state
        .store
        .update_user(&actor, &id, &patch)
        .await
        .map_err(HttpError::from_store)?;
    if !matched {
        return Err(HttpError::not_found(format!("User {id} not found")));
    }

    state
        .store
        .user_by_id(&id)
        .await
        .map_err(HttpError::from_store)?
        .map(Json)
        .ok_or_else(|| HttpError::not_found(format!("User {id} not found")))
}

async fn delete_user(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, HttpError> {
    let actor = actor_from_headers(&headers, &state);
    let matched = state
        .store
        .delete_user(&actor, &id)
        .await
        .map_err(HttpError::from_store)?;
    if !matched {
        return Err(HttpError::not_found(format!("User {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Connect event from the external wallet provider. First connection
/// creates the user record.
async fn connect_wallet(
    State(state): State<AppState>,
    Json(event): Json<WalletConnection>,
) -> Result<Json<UserView>, HttpError> {
    let view = state
        .store
        .connect_wallet(&event)
        .await
        .map_err(HttpError::from_store)?;
    Ok(Json(view))
}

async fn disconnect_wallet(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, HttpError> {
    let matched = state
        .store
        .disconnect_wallet(&id)
        .await
        .map_err(HttpError::from_store)?;
    if !matched {
        return Err(HttpError::not_found(format!("User {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct CompletionResponse {
    user_id: String,
    airdrop_id: String,
    task_id: String,
    total_points: i32,
}

async fn complete_task(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CompletionRequest>,
) -> Result<Json<CompletionResponse>, HttpError> {
    let actor = actor_from_headers(&headers, &state);
    let total_points = state
        .store
        .complete_task(&actor, &id, &request.airdrop_id, &request.task_id)
        .await
        .map_err(HttpError::from_store)?;
    Ok(Json(CompletionResponse {
        user_id: id,
        airdrop_id: request.airdrop_id,
        task_id: request.task_id,
        total_points,
    }))
}
