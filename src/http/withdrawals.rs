//! Withdrawal endpoints.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::models::Page;
use crate::models::withdrawal::{
    WithdrawalFilter, WithdrawalRequest, WithdrawalResolution, WithdrawalStatus, WithdrawalView,
};
use crate::state::AppState;

use super::{HttpError, actor_from_headers};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_withdrawals).post(request_withdrawal))
        .route(
            "/{id}",
            get(get_withdrawal)
                .put(resolve_withdrawal)
                .delete(delete_withdrawal),
        )
}

#[derive(Debug, Deserialize, Default)]
struct ListQuery {
    user_id: Option<String>,
    status: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

fn status_filter(raw: Option<&str>) -> Result<Option<WithdrawalStatus>, HttpError> {
    match raw {
        None | Some("all") => Ok(None),
        Some(value) => WithdrawalStatus::parse(value).map(Some).ok_or_else(|| {
            HttpError::new(StatusCode::BAD_REQUEST, format!("unknown status {value}"))
        }),
    }
}

async fn list_withdrawals(
    Query(query): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<WithdrawalView>>, HttpError> {
    let filter = WithdrawalFilter {
        user_id: query.user_id,
        status: status_filter(query.status.as_deref())?,
    };
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    let withdrawals = state
        .store
        .list_withdrawals(&filter, &page)
        .await
        .map_err(HttpError::from_store)?;
    Ok(Json(withdrawals))
}

async fn get_withdrawal(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<WithdrawalView>, HttpError> {
    state
        .store
        .withdrawal_by_id(&id)
        .await
        .map_err(HttpError::from_store)?
        .map(Json)
        .ok_or_else(|| HttpError::not_found(format!("Withdrawal {id} not found")))
}

async fn request_withdrawal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<WithdrawalRequest>,
) -> Result<(StatusCode, Json<WithdrawalView>), HttpError> {
    let actor = actor_from_headers(&headers, &state);
    let view = state
        .store
        .request_withdrawal(&actor, &request)
        .await
        .map_err(HttpError::from_store)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn resolve_withdrawal(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(resolution): Json<WithdrawalResolution>,
) -> Result<Json<WithdrawalView>, HttpError> {
    let actor = actor_from_headers(&headers, &state);
    let matched = state
        .store
        .resolve_withdrawal(&actor, &id, &resolution)
        .await
        .map_err(HttpError::from_store)?;
    if !matched {
        return Err(HttpError::not_found(format!("Withdrawal {id} not found")));
    }

    state
        .store
        .withdrawal_by_id(&id)
        .await
        .map_err(HttpError::from_store)?
        .map(Json)
        .ok_or_else(|| HttpError::not_found(format!("Withdrawal {id} not found")))
}

async fn delete_withdrawal(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, HttpError> {
    let actor = actor_from_headers(&headers, &state);
    let matched = state
        .store
        .delete_withdrawal(&actor, &id)
        .await
        .map_err(HttpError::from_store)?;
    if !matched {
        return Err(HttpError::not_found(format!("Withdrawal {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
