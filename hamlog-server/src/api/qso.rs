//! QSO CRUD endpoints
//!
//! All routes operate on the caller's own log only.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use hamlog_common::qso::{Qso, QsoFields, QsoList};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::auth::CurrentUser;
use crate::db::qsos;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

/// Query parameters for GET /qso
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive callsign substring
    pub call: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    /// Resolved `(offset, limit)` with bounds checked
    pub fn page(&self) -> ApiResult<(i64, i64)> {
        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);

        if offset < 0 {
            return Err(ApiError::Unprocessable("offset must be >= 0".to_string()));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ApiError::Unprocessable(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }
        Ok((offset, limit))
    }
}

fn qso_id(path: Result<Path<Uuid>, PathRejection>) -> ApiResult<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|e| ApiError::Unprocessable(e.body_text()))
}

fn validated_body(payload: Result<Json<QsoFields>, JsonRejection>) -> ApiResult<QsoFields> {
    let Json(fields) = payload.map_err(|e| ApiError::Unprocessable(e.body_text()))?;
    Ok(fields.validated()?)
}

/// POST /qso
pub async fn create_qso(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<QsoFields>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Qso>)> {
    let fields = validated_body(payload)?;
    let qso = qsos::insert_qso(&state.db, current.user.id, &fields).await?;

    info!(qso_id = %qso.id, call = %qso.fields.call, "Logged QSO");
    Ok((StatusCode::CREATED, Json(qso)))
}

/// GET /qso
pub async fn list_qsos(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<QsoList>> {
    let Query(query) = query.map_err(|e| ApiError::Unprocessable(e.body_text()))?;
    let (offset, limit) = query.page()?;

    let list = qsos::list_qsos(
        &state.db,
        current.user.id,
        query.call.as_deref(),
        offset,
        Some(limit),
    )
    .await?;

    Ok(Json(list))
}

/// GET /qso/:id
pub async fn get_qso(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Qso>> {
    let id = qso_id(path)?;
    Ok(Json(qsos::get_qso(&state.db, current.user.id, id).await?))
}

/// PUT /qso/:id
pub async fn replace_qso(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<QsoFields>, JsonRejection>,
) -> ApiResult<Json<Qso>> {
    let id = qso_id(path)?;
    let fields = validated_body(payload)?;

    let qso = qsos::replace_qso(&state.db, current.user.id, id, &fields).await?;
    info!(qso_id = %qso.id, "Updated QSO");
    Ok(Json(qso))
}

/// DELETE /qso/:id
pub async fn delete_qso(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let id = qso_id(path)?;
    qsos::delete_qso(&state.db, current.user.id, id).await?;

    info!(qso_id = %id, "Deleted QSO");
    Ok(StatusCode::NO_CONTENT)
}
