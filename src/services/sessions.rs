// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Opaque server-side sessions.
//!
//! A session token is 32 random bytes, hex encoded, mapping to the user id it
//! was issued for. Sessions live in memory only; a restart signs everyone out.

use crate::util::random_hex;
use dashmap::DashMap;
use std::time::{Duration, Instant};

const SESSION_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone)]
struct Session {
    user_id: String,
    expires_at: Instant,
}

/// In-memory session table.
pub struct SessionStore {
    ttl: Duration,
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: DashMap::new(),
        }
    }

    /// Issue a new session for `user_id` and return its token.
    pub fn issue(&self, user_id: &str) -> anyhow::Result<String> {
        let token = random_hex(SESSION_TOKEN_BYTES)
            .map_err(|_| anyhow::anyhow!("system RNG failed while issuing session"))?;

        self.sessions.insert(
            token.clone(),
            Session {
                user_id: user_id.to_string(),
                expires_at: Instant::now() + self.ttl,
            },
        );

        tracing::debug!(user_id, active = self.active_count(), "Session issued");
        Ok(token)
    }

    /// Map a session token to its user id. Expired sessions are evicted.
    pub fn resolve(&self, token: &str) -> Option<String> {
        self.resolve_at(token, Instant::now())
    }

    fn resolve_at(&self, token: &str, now: Instant) -> Option<String> {
        let session = self.sessions.get(token)?.clone();
        if session.expires_at <= now {
            self.sessions.remove(token);
            return None;
        }
        Some(session.user_id)
    }

    /// Invalidate a session. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop all expired sessions; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at > now);
        before.saturating_sub(self.sessions.len())
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}
