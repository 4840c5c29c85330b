// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Sign-In exchange and logout.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use validator::Validate;

use super::json_body;
use crate::error::{AppError, Result};
use crate::middleware::auth::{removal_cookie, session_cookie, session_token};
use crate::models::api::{SuccessResponse, UserSummary, VerifyTokenRequest, VerifyTokenResponse};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/verify-token", post(verify_token))
        .route("/logout", post(logout))
}

/// Exchange a Google ID token for a session cookie.
///
/// Provisions the user's counter record on first sign-in and returns the
/// current all-time totals.
async fn verify_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: std::result::Result<Json<VerifyTokenRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<VerifyTokenResponse>)> {
    let request = json_body(payload)?;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let identity = state.identity_verifier.verify(&request.credential).await?;
    let all_time = state.store.provision(&identity).await?;
    let token = state.sessions.issue(&identity.subject)?;

    tracing::info!(user_id = %identity.subject, "User signed in");

    let response = VerifyTokenResponse {
        success: true,
        user: UserSummary {
            display_name: identity.display_name,
            email: identity.email,
        },
        all_time,
    };

    Ok((
        jar.add(session_cookie(token, &state.config)),
        Json(response),
    ))
}

/// Revoke the current session, if any, and clear the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: axum::http::HeaderMap,
) -> (CookieJar, Json<SuccessResponse>) {
    if let Some(token) = session_token(&jar, &headers) {
        if state.sessions.revoke(&token) {
            tracing::info!("Session revoked");
        }
    }

    (jar.add(removal_cookie(&state.config)), Json(SuccessResponse::ok()))
}
