// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rep counter routes for the signed-in user.
//!
//! The acting user always comes from the session; any user identifier in the
//! request body is ignored.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::api::{parse_delta, AddRepRequest, AddRepResponse, AllRepsResponse, SuccessResponse};
use crate::models::ExerciseKind;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Extension, Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use super::json_body;

/// Rep routes (require a session).
/// The session middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/add-rep", post(add_rep))
        .route("/get-all-reps", post(get_all_reps))
        .route("/reset-reps", post(reset_reps))
}

/// Apply a signed delta to one exercise total.
async fn add_rep(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<AddRepRequest>, JsonRejection>,
) -> Result<Json<AddRepResponse>> {
    let request = json_body(payload)?;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let delta = parse_delta(&request.delta).map_err(AppError::Validation)?;
    let kind: ExerciseKind = request
        .kind
        .parse()
        .map_err(|e: crate::models::UnknownKind| AppError::Validation(e.to_string()))?;

    let outcome = state
        .store
        .increment(&user.user_id, kind, delta, request.op_id.as_deref())
        .await?;

    if outcome.duplicate {
        tracing::info!(user_id = %user.user_id, op_id = ?request.op_id, "Replayed increment ignored");
    } else {
        tracing::debug!(user_id = %user.user_id, %kind, delta, total = outcome.total, "Reps added");
    }

    Ok(Json(AddRepResponse {
        success: true,
        total: outcome.total,
        duplicate: outcome.duplicate,
    }))
}

/// All-time totals for every exercise kind.
async fn get_all_reps(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AllRepsResponse>> {
    let all_time = state.store.totals(&user.user_id).await?;
    Ok(Json(AllRepsResponse {
        success: true,
        all_time,
    }))
}

/// Zero every counter and clear history for the user.
async fn reset_reps(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SuccessResponse>> {
    state.store.reset(&user.user_id).await?;
    tracing::info!(user_id = %user.user_id, "Reps reset");
    Ok(Json(SuccessResponse::ok()))
}
