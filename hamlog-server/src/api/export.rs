//! ADIF export endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::IntoResponse,
    Extension,
};
use chrono::Utc;
use hamlog_common::adif;
use serde::Deserialize;
use tracing::info;

use super::auth::CurrentUser;
use crate::db::qsos;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const EXPORT_FILENAME: &str = "hamlog.adi";

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    /// Same callsign filter as the list endpoint
    pub call: Option<String>,
}

/// GET /qso/export
///
/// Every matching QSO of the caller, in list order, as an `.adi` attachment.
pub async fn export_adif(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query.map_err(|e| ApiError::Unprocessable(e.body_text()))?;

    let list = qsos::list_qsos(&state.db, current.user.id, query.call.as_deref(), 0, None).await?;
    let document = adif::write_document(
        list.items.iter().map(|qso| &qso.fields),
        env!("CARGO_PKG_VERSION"),
        Utc::now(),
    );

    info!(user_id = %current.user.id, records = list.items.len(), "Exported ADIF");

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        document,
    ))
}
