//! Free-text QSO extraction endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::services::qso_extractor::{ExtractionError, ExtractionResult, MAX_INPUT_CHARS};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub text: String,
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Unavailable => ApiError::ServiceUnavailable(err.to_string()),
            ExtractionError::Upstream(_) | ExtractionError::Malformed(_) => {
                ApiError::BadGateway(err.to_string())
            }
        }
    }
}

/// POST /parse
///
/// The result is a suggestion for the entry form; nothing is stored.
pub async fn parse_text(
    State(state): State<AppState>,
    payload: Result<Json<ParseRequest>, JsonRejection>,
) -> ApiResult<Json<ExtractionResult>> {
    let Json(request) = payload.map_err(|e| ApiError::Unprocessable(e.body_text()))?;

    if request.text.trim().is_empty() {
        return Err(ApiError::Unprocessable("text must not be blank".to_string()));
    }
    if request.text.chars().count() > MAX_INPUT_CHARS {
        return Err(ApiError::Unprocessable(format!(
            "text must be at most {} characters",
            MAX_INPUT_CHARS
        )));
    }

    Ok(Json(state.extractor.extract(&request.text).await?))
}
