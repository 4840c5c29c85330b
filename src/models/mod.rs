// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod api;
pub mod exercise;
pub mod user;

pub use exercise::{ExerciseKind, Totals, UnknownKind};
pub use user::{HistoryEntry, IncrementOutcome, UserCounts, UserRecord, VerifiedIdentity};
