//! Airdrop campaign endpoints.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::models::Page;
use crate::models::airdrop::{AirdropFilter, AirdropInput, AirdropPatch, AirdropStatus, AirdropView};
use crate::state::AppState;

use super::{HttpError, actor_from_headers};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_airdrops).post(upsert_airdrop))
        .route(
            "/{id}",
            get(get_airdrop).put(update_airdrop).delete(delete_airdrop),
        )
}

#[derive(Debug, Deserialize, Default)]
struct ListQuery {
    status: Option<String>,
    category: Option<String>,
    blockchain: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

/// The front end sends "all" to mean "no filter".
fn text_filter(raw: Option<String>) -> Option<String> {
    raw.filter(|value| value != "all" && !value.is_empty())
}

fn status_filter(raw: Option<&str>) -> Result<Option<AirdropStatus>, HttpError> {
    match raw {
        None | Some("all") => Ok(None),
        Some(value) => AirdropStatus::parse(value).map(Some).ok_or_else(|| {
            HttpError::new(StatusCode::BAD_REQUEST, format!("unknown status {value}"))
        }),
    }
}

async fn list_airdrops(
    Query(query): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AirdropView>>, HttpError> {
    let filter = AirdropFilter {
        status: status_filter(query.status.as_deref())?,
        category: text_filter(query.category),
        blockchain: text_filter(query.blockchain),
    };
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    let airdrops = state
        .store
        .list_airdrops(&filter, &page)
        .await
        .map_err(HttpError::from_store)?;
    Ok(Json(airdrops))
}

async fn get_airdrop(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AirdropView>, HttpError> {
    state
        .store
        .airdrop_by_id(&id)
        .await
        .map_err(HttpError::from_store)?
        .map(Json)
        .ok_or_else(|| HttpError::not_found(format!("Airdrop {id} not found")))
}

async fn upsert_airdrop(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<AirdropInput>,
) -> Result<(StatusCode, Json<AirdropView>), HttpError> {
    let actor = actor_from_headers(&headers, &state);
    state
        .store
        .upsert_airdrop(&actor, &input)
        .await
        .map_err(HttpError::from_store)?;

    let view = state
        .store
        .airdrop_by_id(&input.id)
        .await
        .map_err(HttpError::from_store)?
        .ok_or_else(|| HttpError::not_found(format!("Airdrop {} not found", input.id)))?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn update_airdrop(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(patch): Json<AirdropPatch>,
) -> Result<Json<AirdropView>, HttpError> {
    let actor = actor_from_headers(&headers, &state);
    let matched = state
        .store
        .update_airdrop(&actor, &id, &patch)
        .await
        .map_err(HttpError::from_store)?;
    if !matched {
        return Err(HttpError::not_found(format!("Airdrop {id} not found")));
    }

    state
        .store
        .airdrop_by_id(&id)
        .await
        .map_err(HttpError::from_store)?
        .map(Json)
        .ok_or_else(|| HttpError::not_found(format!("Airdrop {id} not found")))
}

async fn delete_airdrop(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, HttpError> {
    let actor = actor_from_headers(&headers, &state);
    let matched = state
        .store
        .delete_airdrop(&actor, &id)
        .await
        .map_err(HttpError::from_store)?;
    if !matched {
        return Err(HttpError::not_found(format!("Airdrop {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_means_no_filter() {
        assert_eq!(text_filter(Some("all".to_string())), None);
        assert_eq!(text_filter(Some(String::new())), None);
        assert_eq!(
            text_filter(Some("DeFi".to_string())),
            Some("DeFi".to_string())
        );
        assert!(status_filter(Some("all")).unwrap().is_none());
        assert_eq!(
            status_filter(Some("active")).unwrap(),
            Some(AirdropStatus::Active)
        );
        assert!(status_filter(Some("archived")).is_err());
    }
}
