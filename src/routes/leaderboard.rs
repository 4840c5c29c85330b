// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public leaderboard.

use crate::models::api::LeaderboardResponse;
use crate::services::build_leaderboard;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/leaderboard", get(get_leaderboard))
}

async fn get_leaderboard(State(state): State<Arc<AppState>>) -> Json<LeaderboardResponse> {
    let users = state.store.list_all().await;
    Json(LeaderboardResponse {
        success: true,
        leaderboard: build_leaderboard(users, state.config.leaderboard_limit),
    })
}
