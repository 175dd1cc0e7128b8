//! Operator endpoints: analytics, settings, audit log and the SQL export.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;

use crate::models::Page;
use crate::models::admin::{AnalyticsSnapshot, AuditLogView, SettingUpdate, SettingView};
use crate::state::AppState;

use super::{HttpError, actor_from_headers};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analytics", get(get_analytics))
        .route("/settings", get(get_settings))
        .route("/settings/{key}", put(put_setting))
        .route("/logs", get(get_logs))
        .route("/export", get(export_database))
}

async fn get_analytics(
    State(state): State<AppState>,
) -> Result<Json<AnalyticsSnapshot>, HttpError> {
    let snapshot = state
        .store
        .analytics()
        .await
        .map_err(HttpError::from_store)?;
    Ok(Json(snapshot))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<Vec<SettingView>>, HttpError> {
    let settings = state
        .store
        .all_settings()
        .await
        .map_err(HttpError::from_store)?;
    Ok(Json(settings))
}

async fn put_setting(
    Path(key): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<SettingUpdate>,
) -> Result<Json<SettingView>, HttpError> {
    let actor = actor_from_headers(&headers, &state);
    state
        .store
        .put_setting(&actor, &key, &update.value)
        .await
        .map_err(HttpError::from_store)?;

    let stored = state
        .store
        .all_settings()
        .await
        .map_err(HttpError::from_store)?
        .into_iter()
        .find(|setting| setting.key == key)
        .ok_or_else(|| HttpError::not_found(format!("Setting {key} not found")))?;
    Ok(Json(stored))
}

async fn get_logs(
    Query(page): Query<Page>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AuditLogView>>, HttpError> {
    let entries = state
        .store
        .list_audit_log(&page)
        .await
        .map_err(HttpError::from_store)?;
    Ok(Json(entries))
}

/// Serves the full SQL dump as a downloadable file, the same flow the
/// original admin panel exposed as a backup button.
async fn export_database(State(state): State<AppState>) -> Result<impl IntoResponse, HttpError> {
    let script = state
        .store
        .export_sql()
        .await
        .map_err(HttpError::from_store)?;

    let filename = format!("airdrop_database_{}.sql", Utc::now().format("%Y-%m-%d"));
    let headers = [
        (CONTENT_TYPE, "application/sql; charset=utf-8".to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, script))
}
