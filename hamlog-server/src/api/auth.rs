//! Account endpoints and bearer-token middleware
//!
//! - `POST /auth/register` JSON `{email, password}` → 201 user
//! - `POST /auth/login` form `username`, `password` → `{access_token, token_type}`
//! - `POST /auth/logout` → 204, revokes the presented token
//! - `GET /users/me` → current user

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Form, Json,
};
use chrono::Utc;
use hamlog_common::auth::{
    generate_token, hash_password, is_plausible_email, token_digest, verify_password,
    MIN_PASSWORD_LEN,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::{tokens, users};
use crate::db::users::User;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Authenticated caller, inserted into request extensions by [`require_user`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// Digest of the token the request was authenticated with
    pub token_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// OAuth2 password-flow style login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Reject requests without a valid, unexpired bearer token
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token_hash = bearer_token(request.headers())
        .map(token_digest)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let user = tokens::find_user_by_token(&state.db, &token_hash, Utc::now())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    request
        .extensions_mut()
        .insert(CurrentUser { user, token_hash });

    Ok(next.run(request).await)
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(request) = payload.map_err(|e| ApiError::Unprocessable(e.body_text()))?;

    if !is_plausible_email(&request.email) {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let credential = hash_password(&request.password);
    let user = users::create_user(&state.db, &request.email, &credential)
        .await
        .map_err(|e| match e {
            hamlog_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => other.into(),
        })?;

    info!(user_id = %user.id, "Registered user");
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<TokenResponse>> {
    let bad_credentials = || ApiError::BadRequest("Incorrect email or password".to_string());

    let Some(creds) = users::find_credentials(&state.db, &form.username).await? else {
        debug!("Login for unknown account");
        return Err(bad_credentials());
    };

    if !creds.user.is_active
        || !verify_password(&form.password, &creds.password_hash, &creds.password_salt)
    {
        warn!(user_id = %creds.user.id, "Rejected login");
        return Err(bad_credentials());
    }

    let now = Utc::now();
    let purged = tokens::purge_expired(&state.db, now).await?;
    if purged > 0 {
        debug!(purged, "Removed expired tokens");
    }

    let token = generate_token();
    tokens::insert_token(
        &state.db,
        &token_digest(&token),
        creds.user.id,
        now + state.token_lifetime,
    )
    .await?;

    info!(user_id = %creds.user.id, "User logged in");
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    tokens::revoke_token(&state.db, &current.token_hash).await?;
    info!(user_id = %current.user.id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/me
pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}
