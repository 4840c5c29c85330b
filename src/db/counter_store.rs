// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Counter store: the authoritative per-user rep totals.
//!
//! The full user map lives in memory and is written through to a JSON
//! snapshot after every mutation. Mutations are serialized by a single
//! writer gate that is held until the snapshot write completes; readers take
//! a read lock on the map and always see whole records.

use crate::db::snapshot::{self, SnapshotError};
use crate::models::{
    ExerciseKind, IncrementOutcome, Totals, UserCounts, UserRecord, VerifiedIdentity,
};
use crate::util::now_rfc3339;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

type Users = BTreeMap<String, UserRecord>;

/// Counter store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Owned counter store; construct with [`CounterStore::open`] at startup and
/// call [`CounterStore::flush`] on shutdown.
pub struct CounterStore {
    path: PathBuf,
    dedup_window: usize,
    users: RwLock<Users>,
    writer: Mutex<()>,
}

impl CounterStore {
    /// Load the snapshot at `path`. A missing file starts an empty store.
    pub async fn open(path: impl Into<PathBuf>, dedup_window: usize) -> Result<Self, StoreError> {
        let path = path.into();
        let users: Users = snapshot::read(&path).await?;

        tracing::info!(
            path = %path.display(),
            users = users.len(),
            "Loaded counter snapshot"
        );

        Ok(Self {
            path,
            dedup_window,
            users: RwLock::new(users),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the user's record on first sign-in, otherwise refresh profile
    /// fields. Returns the user's current totals.
    pub async fn provision(&self, identity: &VerifiedIdentity) -> Result<Totals, StoreError> {
        self.mutate(|users| {
            let now = now_rfc3339();
            match users.get_mut(&identity.subject) {
                Some(record) => {
                    record.refresh_profile(identity, &now);
                    Ok(record.counts.clone())
                }
                None => {
                    tracing::info!(user_id = %identity.subject, "Provisioning new user");
                    let record = UserRecord::new(identity, &now);
                    let totals = record.counts.clone();
                    users.insert(identity.subject.clone(), record);
                    Ok(totals)
                }
            }
        })
        .await
    }

    /// Add `delta` to the user's `kind` total, clamping at zero, and persist.
    ///
    /// A replayed `op_id` returns the current total without applying.
    pub async fn increment(
        &self,
        user_id: &str,
        kind: ExerciseKind,
        delta: i64,
        op_id: Option<&str>,
    ) -> Result<IncrementOutcome, StoreError> {
        let dedup_window = self.dedup_window;
        self.mutate(|users| {
            let record = users
                .get_mut(user_id)
                .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;
            Ok(record.apply_increment(kind, delta, op_id, &now_rfc3339(), dedup_window))
        })
        .await
    }

    /// Zero all counters and clear history for the user.
    pub async fn reset(&self, user_id: &str) -> Result<(), StoreError> {
        self.mutate(|users| {
            let record = users
                .get_mut(user_id)
                .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;
            record.reset(&now_rfc3339());
            Ok(())
        })
        .await
    }

    /// Read-only snapshot of one user's totals.
    pub async fn totals(&self, user_id: &str) -> Result<Totals, StoreError> {
        self.users
            .read()
            .await
            .get(user_id)
            .map(|record| record.counts.clone())
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }

    /// Full record for one user, if present.
    pub async fn get_user(&self, user_id: &str) -> Option<UserRecord> {
        self.users.read().await.get(user_id).cloned()
    }

    /// Display name and counts for every user, in no particular order.
    pub async fn list_all(&self) -> Vec<UserCounts> {
        self.users
            .read()
            .await
            .values()
            .map(|record| UserCounts {
                display_name: record.display_name.clone(),
                counts: record.counts.clone(),
            })
            .collect()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Write the current state to disk, returning any error.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;
        let bytes = serde_json::to_vec_pretty(&*self.users.read().await)
            .map_err(SnapshotError::from)?;
        snapshot::write(&self.path, bytes).await?;
        tracing::info!(path = %self.path.display(), "Counter snapshot flushed");
        Ok(())
    }

    /// Run one mutation under the writer gate and write the result through.
    ///
    /// A failed snapshot write is logged and the mutation still succeeds: the
    /// in-memory state has changed and the next successful write catches up.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Users) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _writer = self.writer.lock().await;

        let (result, bytes) = {
            let mut users = self.users.write().await;
            let result = f(&mut users)?;
            (result, serde_json::to_vec_pretty(&*users))
        };

        let persisted = match bytes {
            Ok(bytes) => snapshot::write(&self.path, bytes).await,
            Err(e) => Err(SnapshotError::from(e)),
        };
        if let Err(e) = persisted {
            tracing::error!(
                error = %e,
                path = %self.path.display(),
                "Failed to persist counter snapshot"
            );
        }

        Ok(result)
    }
}
