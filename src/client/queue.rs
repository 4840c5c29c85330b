// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rep submission queue.
//!
//! Increments are recorded locally first and delivered to the server later.
//! An entry leaves the queue only when the server acknowledges it; failed
//! deliveries go back to pending and are retried on the next drain. Each
//! entry carries an op id so a delivery that reached the server but whose
//! response was lost is not applied twice.
//!
//! Only one drain runs at a time. Entries are sent one by one in enqueue
//! order, and a failure does not stop later entries from being attempted.

use crate::client::storage::{ClientState, StateFile};
use crate::client::transport::RepTransport;
use crate::models::api::{AddRepRequest, MAX_ABS_DELTA};
use crate::models::exercise::{clamp_add, zero_totals};
use crate::models::{ExerciseKind, Totals};
use crate::util::{now_rfc3339, random_hex};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const OP_ID_BYTES: usize = 16;

/// Largest |delta| one call to [`RepQueue::enqueue`] records; larger values
/// are clamped, so a single call queues at most 100 entries.
pub const MAX_ENQUEUE_DELTA: i64 = 100 * MAX_ABS_DELTA;

/// An increment waiting for server acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingIncrement {
    pub op_id: String,
    pub kind: ExerciseKind,
    pub delta: i64,
    pub client_timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryStatus {
    Pending,
    InFlight,
}

#[derive(Debug)]
struct Entry {
    item: PendingIncrement,
    status: EntryStatus,
}

#[derive(Debug)]
struct QueueState {
    entries: Vec<Entry>,
    totals: Totals,
}

impl QueueState {
    fn snapshot(&self) -> ClientState {
        ClientState {
            pending: self.entries.iter().map(|e| e.item.clone()).collect(),
            totals: self.totals.clone(),
        }
    }
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub attempted: usize,
    pub acknowledged: usize,
    pub failed: usize,
    /// Another drain was already running; nothing was attempted.
    pub already_running: bool,
}

pub struct RepQueue<T> {
    transport: Arc<T>,
    storage: StateFile,
    state: Arc<Mutex<QueueState>>,
    drain_gate: tokio::sync::Mutex<()>,
    op_seq: AtomicU64,
}

impl<T: RepTransport> RepQueue<T> {
    /// Create a queue, restoring any state saved in `storage`.
    pub fn new(transport: Arc<T>, storage: StateFile) -> Self {
        let saved = storage.load();
        if !saved.pending.is_empty() {
            tracing::info!(pending = saved.pending.len(), "Restored pending reps");
        }

        let entries = saved
            .pending
            .into_iter()
            .map(|item| Entry {
                item,
                status: EntryStatus::Pending,
            })
            .collect();

        Self {
            transport,
            storage,
            state: Arc::new(Mutex::new(QueueState {
                entries,
                totals: saved.totals,
            })),
            drain_gate: tokio::sync::Mutex::new(()),
            op_seq: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        lock_state(&self.state)
    }

    fn persist(&self, state: &QueueState) {
        persist_state(&self.storage, state);
    }

    /// Persist from a blocking thread. The snapshot is taken under the state
    /// lock so it cannot overwrite a newer save from `enqueue`.
    async fn persist_in_background(&self) {
        let state = self.state.clone();
        let storage = self.storage.clone();
        let saved = tokio::task::spawn_blocking(move || {
            persist_state(&storage, &lock_state(&state));
        })
        .await;
        if let Err(e) = saved {
            tracing::warn!(error = %e, "Client state save task failed");
        }
    }

    fn next_op_id(&self) -> String {
        random_hex(OP_ID_BYTES).unwrap_or_else(|_| {
            let seq = self.op_seq.fetch_add(1, Ordering::Relaxed);
            let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
            format!("{nanos:x}-{seq:x}")
        })
    }

    /// Record an increment locally and queue it for delivery.
    ///
    /// The cached total is updated optimistically. Deltas are clamped to
    /// [`MAX_ENQUEUE_DELTA`], and those larger than the server accepts in one
    /// request are split; a zero delta queues nothing. Returns the queued
    /// entries.
    pub fn enqueue(&self, kind: ExerciseKind, delta: i64) -> Vec<PendingIncrement> {
        let bounded = delta.clamp(-MAX_ENQUEUE_DELTA, MAX_ENQUEUE_DELTA);
        if bounded != delta {
            tracing::warn!(%kind, delta, clamped = bounded, "Delta too large, clamping");
        }

        let mut chunks = Vec::new();
        let mut rest = bounded;
        while rest != 0 {
            let chunk = rest.clamp(-MAX_ABS_DELTA, MAX_ABS_DELTA);
            chunks.push(chunk);
            rest -= chunk;
        }

        let timestamp = now_rfc3339();
        let items: Vec<PendingIncrement> = chunks
            .into_iter()
            .map(|delta| PendingIncrement {
                op_id: self.next_op_id(),
                kind,
                delta,
                client_timestamp: timestamp.clone(),
            })
            .collect();

        if items.is_empty() {
            return items;
        }

        let mut state = self.lock();
        for item in &items {
            let total = state.totals.get(&kind).copied().unwrap_or(0);
            state.totals.insert(kind, clamp_add(total, item.delta));
            state.entries.push(Entry {
                item: item.clone(),
                status: EntryStatus::Pending,
            });
        }
        self.persist(&state);

        tracing::debug!(%kind, delta = bounded, pending = state.entries.len(), "Reps queued");
        items
    }

    /// Deliver pending entries to the server.
    ///
    /// Returns immediately with `already_running` if another drain holds the
    /// queue. Entries enqueued while a drain is running wait for the next one.
    pub async fn drain(&self) -> DrainReport {
        let Ok(_gate) = self.drain_gate.try_lock() else {
            return DrainReport {
                already_running: true,
                ..DrainReport::default()
            };
        };

        let batch: Vec<PendingIncrement> = {
            let mut state = self.lock();
            let mut batch = Vec::new();
            for entry in state.entries.iter_mut() {
                if entry.status == EntryStatus::Pending {
                    entry.status = EntryStatus::InFlight;
                    batch.push(entry.item.clone());
                }
            }
            batch
        };

        let mut report = DrainReport {
            attempted: batch.len(),
            ..DrainReport::default()
        };

        for item in batch {
            let request = AddRepRequest {
                kind: item.kind.to_string(),
                delta: serde_json::Value::from(item.delta),
                op_id: Some(item.op_id.clone()),
            };

            let result = self.transport.add_rep(&request).await;

            let mut state = self.lock();
            match result {
                Ok(response) => {
                    state.entries.retain(|e| e.item.op_id != item.op_id);
                    state.totals.insert(item.kind, response.total);
                    report.acknowledged += 1;
                    if response.duplicate {
                        tracing::debug!(op_id = %item.op_id, "Server had already applied increment");
                    }
                }
                Err(e) => {
                    if let Some(entry) = state
                        .entries
                        .iter_mut()
                        .find(|entry| entry.item.op_id == item.op_id)
                    {
                        entry.status = EntryStatus::Pending;
                    }
                    report.failed += 1;
                    tracing::debug!(op_id = %item.op_id, error = %e, "Delivery failed, will retry");
                }
            }
        }

        // Acknowledged entries replayed after a crash are deduplicated by op id.
        if report.attempted > 0 {
            self.persist_in_background().await;

            tracing::info!(
                attempted = report.attempted,
                acknowledged = report.acknowledged,
                failed = report.failed,
                "Drain finished"
            );
        }
        report
    }

    /// Entries not yet acknowledged, in enqueue order.
    pub fn pending(&self) -> Vec<PendingIncrement> {
        self.lock().entries.iter().map(|e| e.item.clone()).collect()
    }

    /// Cached all-time totals.
    pub fn totals(&self) -> Totals {
        self.lock().totals.clone()
    }

    /// Replace cached totals with authoritative server values.
    pub fn set_totals(&self, totals: Totals) {
        let mut state = self.lock();
        let mut merged = zero_totals();
        merged.extend(totals);
        state.totals = merged;
        self.persist(&state);
    }

    /// Zero the cached totals. Pending entries are kept.
    pub fn clear_totals(&self) {
        self.set_totals(zero_totals());
    }
}

fn lock_state(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Persist the current state. Failures are logged; the in-memory queue
/// remains authoritative.
fn persist_state(storage: &StateFile, state: &QueueState) {
    if let Err(e) = storage.save(&state.snapshot()) {
        tracing::warn!(error = %e, "Failed to save client state");
    }
}
