//! Log entry HTTP handlers

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::AppError;
use crate::models::{CreateLogEntry, LogEntry};
use crate::repository::SearchParams;

/// Query parameters for `GET /logs/search`
#[derive(Debug, Default, Deserialize)]
pub struct SearchQueryParams {
    pub level: Option<String>,
    pub message_contains: Option<String>,
    /// RFC 3339
    pub since: Option<String>,
    /// RFC 3339
    pub until: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SearchQueryParams {
    pub fn into_search_params(self) -> Result<SearchParams, AppError> {
        Ok(SearchParams {
            level: self.level,
            message_contains: self.message_contains,
            since: parse_time("since", self.since)?,
            until: parse_time("until", self.until)?,
            limit: self.limit.unwrap_or(0),
            offset: self.offset.unwrap_or(0),
        })
    }
}

fn parse_time(name: &str, raw: Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| AppError::InvalidInput(format!("invalid {} timestamp format: {}", name, s))),
    }
}

/// Response for search
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub data: Vec<LogEntry>,
    pub count: usize,
    pub offset: i64,
    pub limit: i64,
}

/// POST /logs - Create a log entry
pub async fn create_log(
    State(state): State<AppState>,
    payload: Result<Json<CreateLogEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<LogEntry>), AppError> {
    let Json(body) =
        payload.map_err(|e| AppError::InvalidInput(format!("invalid body: {}", e.body_text())))?;

    let mut entry = body.into_entry();
    state.repo.save(&state.op_context(), &mut entry).await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /logs/{id} - Fetch one entry, read through the cache
pub async fn get_log(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<LogEntry>, AppError> {
    let id: i64 = raw_id
        .parse()
        .map_err(|_| AppError::InvalidInput("invalid id".to_string()))?;

    let entry = state
        .repo
        .get_by_id(&state.op_context(), id, true, state.read_ttl)
        .await?;

    Ok(Json(entry))
}

/// GET /logs - Every stored entry
pub async fn list_logs(State(state): State<AppState>) -> Result<Json<Vec<LogEntry>>, AppError> {
    let entries = state.repo.all(&state.op_context()).await?;
    Ok(Json(entries))
}

/// GET /logs/search - Filtered search, newest first
///
/// Example: GET /logs/search?level=error&message_contains=disk&limit=10
pub async fn search_logs(
    State(state): State<AppState>,
    query: Result<Query<SearchQueryParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Query(query) =
        query.map_err(|e| AppError::InvalidInput(format!("invalid query: {}", e.body_text())))?;
    let params = query.into_search_params()?;

    let entries = state.repo.search(&state.op_context(), &params).await?;
    if entries.is_empty() {
        return Err(AppError::NotFound("no log entries found".to_string()));
    }

    Ok(Json(SearchResponse {
        count: entries.len(),
        data: entries,
        offset: params.effective_offset(),
        limit: params.effective_limit(),
    }))
}
