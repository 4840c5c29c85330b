// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise kinds and per-kind totals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Exercise category a rep count applies to.
///
/// Serialized as its lowercase wire name so it can be used as a JSON map key.
/// Older clients send `pushup`/`pullup` or the `PushUp`/`PullUp` storage keys;
/// those are accepted on input and normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExerciseKind {
    Push,
    Pull,
}

impl ExerciseKind {
    /// Every known kind, in display order.
    pub const ALL: [ExerciseKind; 2] = [ExerciseKind::Push, ExerciseKind::Pull];

    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseKind::Push => "push",
            ExerciseKind::Pull => "pull",
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a rep type string does not name a known exercise.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid rep type: {0:?}")]
pub struct UnknownKind(pub String);

impl FromStr for ExerciseKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" | "pushup" | "push-up" => Ok(ExerciseKind::Push),
            "pull" | "pullup" | "pull-up" => Ok(ExerciseKind::Pull),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

impl TryFrom<String> for ExerciseKind {
    type Error = UnknownKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExerciseKind> for String {
    fn from(kind: ExerciseKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Per-kind rep totals, e.g. `{"push": 12, "pull": 3}`.
pub type Totals = BTreeMap<ExerciseKind, u64>;

/// Totals with every known kind present at zero.
pub fn zero_totals() -> Totals {
    ExerciseKind::ALL.iter().map(|kind| (*kind, 0)).collect()
}

/// Apply a signed delta to a running total, clamping at zero.
///
/// Clamping happens per increment: `clamp_add(clamp_add(5, -10), 3) == 3`,
/// not `max(0, 5 - 10 + 3) == 0`.
pub fn clamp_add(total: u64, delta: i64) -> u64 {
    let next = i128::from(total) + i128::from(delta);
    next.clamp(0, i128::from(u64::MAX)) as u64
}
