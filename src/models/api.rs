// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request and response bodies shared by the HTTP routes and the client.

use crate::models::exercise::Totals;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Largest accepted magnitude for a single rep delta.
pub const MAX_ABS_DELTA: i64 = 10_000;

/// Google Sign-In credential exchange.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyTokenRequest {
    /// Google ID token (JWT)
    #[serde(alias = "id_token")]
    #[validate(length(min = 1, max = 8192))]
    pub credential: String,
}

/// Public profile fields returned to the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub display_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenResponse {
    pub success: bool,
    pub user: UserSummary,
    pub all_time: Totals,
}

/// Rep increment submitted by the client.
///
/// `delta` is kept as raw JSON so that non-integer input is reported as a
/// validation error rather than a deserialization failure. Any caller-supplied
/// user identifier is ignored; identity comes from the session.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddRepRequest {
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(alias = "reps")]
    pub delta: serde_json::Value,
    /// Client-generated operation id used to drop replays
    #[serde(default, alias = "id")]
    #[validate(length(min = 1, max = 128))]
    pub op_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRepResponse {
    pub success: bool,
    pub total: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllRepsResponse {
    pub success: bool,
    pub all_time: Totals,
}

/// Bare `{"success": true}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// One leaderboard row; per-kind totals are flattened next to `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub display_name: String,
    pub total: u64,
    #[serde(flatten)]
    pub counts: Totals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub success: bool,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Parse and range-check a rep delta.
///
/// Accepts JSON integers, integral floats (`5.0`) and numeric strings, the
/// same values older browser clients coerce with `Number()`.
pub fn parse_delta(value: &serde_json::Value) -> Result<i64, String> {
    let delta = match value {
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(v) => Some(v),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() <= MAX_ABS_DELTA as f64)
                .map(|f| f as i64),
        },
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| "Invalid reps (must be integer)".to_string())?;

    if delta.abs() > MAX_ABS_DELTA {
        return Err(format!("Reps out of range (|delta| <= {MAX_ABS_DELTA})"));
    }

    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exercise::{zero_totals, ExerciseKind};
    use serde_json::json;

    #[test]
    fn parse_delta_accepts_integers() {
        assert_eq!(parse_delta(&json!(5)), Ok(5));
        assert_eq!(parse_delta(&json!(-10)), Ok(-10));
        assert_eq!(parse_delta(&json!(10000)), Ok(10000));
        assert_eq!(parse_delta(&json!(-10000)), Ok(-10000));
        assert_eq!(parse_delta(&json!(3.0)), Ok(3));
        assert_eq!(parse_delta(&json!("7")), Ok(7));
    }

    #[test]
    fn parse_delta_rejects_out_of_range() {
        assert!(parse_delta(&json!(10001)).is_err());
        assert!(parse_delta(&json!(-10001)).is_err());
        assert!(parse_delta(&json!(1e12)).is_err());
    }

    #[test]
    fn parse_delta_rejects_non_integers() {
        assert!(parse_delta(&json!(1.5)).is_err());
        assert!(parse_delta(&json!("abc")).is_err());
        assert!(parse_delta(&json!(null)).is_err());
        assert!(parse_delta(&json!(true)).is_err());
        assert!(parse_delta(&json!([1])).is_err());
    }

    #[test]
    fn add_rep_request_accepts_legacy_field_names() {
        let req: AddRepRequest =
            serde_json::from_value(json!({ "type": "pushup", "reps": 5, "userid": "spoofed" }))
                .unwrap();
        assert_eq!(req.kind, "pushup");
        assert_eq!(req.delta, json!(5));
        assert!(req.op_id.is_none());
    }

    #[test]
    fn leaderboard_entry_flattens_counts() {
        let mut counts = zero_totals();
        counts.insert(ExerciseKind::Push, 4);
        let entry = LeaderboardEntry {
            display_name: "Ada".to_string(),
            total: 4,
            counts,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({ "displayName": "Ada", "total": 4, "push": 4, "pull": 0 })
        );

        let back: LeaderboardEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn duplicate_flag_is_omitted_when_false() {
        let response = AddRepResponse {
            success: true,
            total: 3,
            duplicate: false,
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "success": true, "total": 3 })
        );
    }
}
