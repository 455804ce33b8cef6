//! Callsign lookup endpoint

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::services::CallsignLookup;
use crate::AppState;

/// GET /callsign/:callsign
///
/// Always 200 for a well-formed callsign; `source = "none"` when nothing
/// could be found. Malformed callsigns are rejected before any lookup.
pub async fn lookup_callsign(
    State(state): State<AppState>,
    Path(callsign): Path<String>,
) -> ApiResult<Json<CallsignLookup>> {
    if !hamlog_common::callsign::is_valid(&callsign) {
        return Err(ApiError::Unprocessable(format!(
            "Invalid callsign: {:?}",
            callsign
        )));
    }

    Ok(Json(state.callsigns.lookup(&callsign).await))
}
