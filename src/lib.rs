// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rep-Tracker: per-user push/pull exercise counters
//!
//! This crate provides the backend API (Google Sign-In sessions, durable
//! counters, a public leaderboard) and a client library that queues rep
//! submissions while offline and delivers them when the server is reachable.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod util;

use config::Config;
use db::CounterStore;
use middleware::RateLimiter;
use services::{GoogleIdTokenVerifier, SessionStore};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: CounterStore,
    pub sessions: SessionStore,
    pub identity_verifier: Arc<GoogleIdTokenVerifier>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Assemble state from an opened store and a verifier; sessions and the
    /// rate limiter are sized from `config`.
    pub fn new(
        config: Config,
        store: CounterStore,
        identity_verifier: Arc<GoogleIdTokenVerifier>,
    ) -> Self {
        Self {
            sessions: SessionStore::new(config.session_ttl),
            rate_limiter: RateLimiter::new(config.rate_limit_max, config.rate_limit_window),
            config,
            store,
            identity_verifier,
        }
    }
}
