// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard projection over all users' counters.

use crate::models::api::LeaderboardEntry;
use crate::models::exercise::zero_totals;
use crate::models::UserCounts;
use std::cmp::Reverse;

/// Rank users by the sum of their counts, highest first, keeping `limit` rows.
///
/// Ties are broken by display name so the output is stable between requests.
pub fn build_leaderboard(users: Vec<UserCounts>, limit: usize) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = users
        .into_iter()
        .map(|user| {
            let mut counts = zero_totals();
            counts.extend(user.counts);
            LeaderboardEntry {
                display_name: user.display_name,
                total: counts.values().fold(0u64, |acc, v| acc.saturating_add(*v)),
                counts,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        Reverse(a.total)
            .cmp(&Reverse(b.total))
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
    entries.truncate(limit);
    entries
}
