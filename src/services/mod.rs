// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod google_identity;
pub mod leaderboard;
pub mod sessions;

pub use google_identity::{GoogleIdTokenVerifier, IdentityError};
pub use leaderboard::build_leaderboard;
pub use sessions::SessionStore;
