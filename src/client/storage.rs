// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable client state: the pending queue and the cached totals.

use crate::client::queue::PendingIncrement;
use crate::db::snapshot::{self, SnapshotError};
use crate::models::exercise::{zero_totals, Totals};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything the client keeps across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientState {
    #[serde(default)]
    pub pending: Vec<PendingIncrement>,
    #[serde(default = "zero_totals")]
    pub totals: Totals,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            totals: zero_totals(),
        }
    }
}

/// Where client state is kept. `None` keeps state in memory only.
#[derive(Debug, Clone, Default)]
pub struct StateFile {
    path: Option<PathBuf>,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load saved state. An unreadable file is logged and replaced by empty state.
    pub fn load(&self) -> ClientState {
        let Some(path) = &self.path else {
            return ClientState::default();
        };

        match snapshot::read_blocking(path) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable client state");
                ClientState::default()
            }
        }
    }

    pub fn save(&self, state: &ClientState) -> Result<(), SnapshotError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(state)?;
        snapshot::write_blocking(path, &bytes)
    }
}
