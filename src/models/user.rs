// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User counter record stored in the snapshot file.

use crate::models::exercise::{clamp_add, zero_totals, ExerciseKind, Totals};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Identity asserted by the identity provider after credential verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Stable subject identifier (Google `sub`)
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
}

/// One applied increment, kept for audit only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub kind: ExerciseKind,
    pub delta: i64,
    /// When the server applied the increment (RFC 3339)
    pub applied_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_id: Option<String>,
}

/// Authoritative per-user counters.
///
/// Totals are stored, not derived from `history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "zero_totals")]
    pub counts: Totals,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Most recently applied client operation ids, oldest first
    #[serde(default)]
    pub recent_op_ids: VecDeque<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_active: String,
}

/// Display name and counts for one user, as consumed by the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCounts {
    pub display_name: String,
    pub counts: Totals,
}

/// Result of applying (or skipping) an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncrementOutcome {
    /// Total for the kind after the call
    pub total: u64,
    /// The op id was already applied; nothing changed
    pub duplicate: bool,
}

impl UserRecord {
    /// Fresh record with every kind at zero.
    pub fn new(identity: &VerifiedIdentity, now: &str) -> Self {
        Self {
            user_id: identity.subject.clone(),
            display_name: identity.display_name.clone(),
            email: identity.email.clone(),
            counts: zero_totals(),
            history: Vec::new(),
            recent_op_ids: VecDeque::new(),
            created_at: now.to_string(),
            last_active: now.to_string(),
        }
    }

    /// Update descriptive fields after a new sign-in.
    pub fn refresh_profile(&mut self, identity: &VerifiedIdentity, now: &str) {
        self.display_name = identity.display_name.clone();
        if identity.email.is_some() {
            self.email = identity.email.clone();
        }
        for kind in ExerciseKind::ALL {
            self.counts.entry(kind).or_insert(0);
        }
        self.last_active = now.to_string();
    }

    pub fn total(&self, kind: ExerciseKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Apply `delta` to `kind`, clamping at zero.
    ///
    /// If `op_id` is among the last `dedup_window` applied ids the increment
    /// is skipped and reported as a duplicate.
    pub fn apply_increment(
        &mut self,
        kind: ExerciseKind,
        delta: i64,
        op_id: Option<&str>,
        now: &str,
        dedup_window: usize,
    ) -> IncrementOutcome {
        if let Some(op_id) = op_id {
            if self.recent_op_ids.iter().any(|seen| seen == op_id) {
                return IncrementOutcome {
                    total: self.total(kind),
                    duplicate: true,
                };
            }
        }

        let total = clamp_add(self.total(kind), delta);
        self.counts.insert(kind, total);
        self.history.push(HistoryEntry {
            kind,
            delta,
            applied_at: now.to_string(),
            op_id: op_id.map(str::to_string),
        });
        self.last_active = now.to_string();

        if let Some(op_id) = op_id {
            if dedup_window > 0 {
                self.recent_op_ids.push_back(op_id.to_string());
                while self.recent_op_ids.len() > dedup_window {
                    self.recent_op_ids.pop_front();
                }
            }
        }

        IncrementOutcome {
            total,
            duplicate: false,
        }
    }

    /// Zero every counter and drop history and the dedup window.
    pub fn reset(&mut self, now: &str) {
        self.counts = zero_totals();
        self.history.clear();
        self.recent_op_ids.clear();
        self.last_active = now.to_string();
    }
}
