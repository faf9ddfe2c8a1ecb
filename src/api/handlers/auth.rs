//! Authentication handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::jsonapi::{Document, JsonApi};

/// Credentials submitted under the document's `data` member.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Token payload returned under the document's `data` member.
#[derive(Debug, Serialize)]
pub struct TokenData {
    pub token: String,
}

/// Exchange a username/password pair for a bearer token.
///
/// Verifies against stored users first and falls back to configured dev
/// users when dev mode is enabled.
#[instrument(skip(state, body))]
pub async fn authenticate(
    State(state): State<AppState>,
    body: Result<Json<Document<Credentials>>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(document) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let credentials = document.data;

    let token = match state
        .users
        .verify_credentials(&credentials.username, &credentials.password)
        .await?
    {
        Some(user) => {
            info!(user_id = %user.id, "User authenticated");
            state
                .auth
                .generate_token(&user.id, &user.username, &user.group)?
        }
        None => {
            let dev_user = state
                .auth
                .validate_dev_credentials(&credentials.username, &credentials.password)
                .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;
            info!(user_id = %dev_user.id, "Dev user authenticated");
            state.auth.generate_dev_token(dev_user)?
        }
    };

    // Build cookie with security flags.
    // In dev mode, omit Secure flag to allow http://localhost.
    let secure_flag = if state.auth.is_dev_mode() {
        ""
    } else {
        " Secure;"
    };
    let cookie = format!(
        "auth_token={}; Path=/; HttpOnly; SameSite=Lax;{} Max-Age={}",
        token,
        secure_flag,
        state.auth.token_ttl_secs()
    );

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        JsonApi(Document::new(TokenData { token })),
    ))
}
