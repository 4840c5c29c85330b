// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer (JSON snapshot file).

pub mod counter_store;
pub mod snapshot;

pub use counter_store::{CounterStore, StoreError};
pub use snapshot::SnapshotError;
