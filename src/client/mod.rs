// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Offline-tolerant client for the rep-tracker API.
//!
//! [`RepClient`] records reps locally through a [`RepQueue`] and delivers
//! them in the background. Delivery is triggered by a timer, by
//! [`RepClient::notify_reconnect`], after each recorded rep, and right after
//! a successful sign-in.

pub mod queue;
pub mod retry;
pub mod storage;
pub mod transport;

pub use queue::{DrainReport, PendingIncrement, RepQueue};
pub use retry::RetryPolicy;
pub use storage::{ClientState, StateFile};
pub use transport::{HttpTransport, RepTransport, TransportError, DEFAULT_REQUEST_TIMEOUT};

use crate::models::api::UserSummary;
use crate::models::{ExerciseKind, Totals};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, e.g. `http://localhost:3000`
    pub base_url: String,
    /// Where the pending queue and cached totals are saved; `None` keeps them in memory
    pub state_file: Option<PathBuf>,
    pub retry: RetryPolicy,
    /// Per-request limit; a hung request otherwise blocks every later drain
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state_file: None,
            retry: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Sign-in failed: {0}")]
    SignIn(#[source] TransportError),

    #[error("Server request failed: {0}")]
    Transport(#[from] TransportError),
}

/// High-level client combining the queue with sign-in and totals refresh.
pub struct RepClient<T> {
    transport: Arc<T>,
    queue: Arc<RepQueue<T>>,
    wake: Arc<Notify>,
    user: Mutex<Option<UserSummary>>,
}

impl RepClient<HttpTransport> {
    /// HTTP client from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let storage = config
            .state_file
            .clone()
            .map(StateFile::new)
            .unwrap_or_default();
        let transport =
            HttpTransport::with_timeout(config.base_url.clone(), config.request_timeout)?;
        Ok(Self::new(Arc::new(transport), storage))
    }
}

impl<T: RepTransport> RepClient<T> {
    pub fn new(transport: Arc<T>, storage: StateFile) -> Self {
        Self {
            queue: Arc::new(RepQueue::new(transport.clone(), storage)),
            transport,
            wake: Arc::new(Notify::new()),
            user: Mutex::new(None),
        }
    }

    pub fn queue(&self) -> &Arc<RepQueue<T>> {
        &self.queue
    }

    pub fn user(&self) -> Option<UserSummary> {
        self.user.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_user(&self, user: Option<UserSummary>) {
        *self.user.lock().unwrap_or_else(|e| e.into_inner()) = user;
    }

    /// Record reps locally and wake the background drain.
    pub fn record(&self, kind: ExerciseKind, delta: i64) -> Vec<PendingIncrement> {
        let queued = self.queue.enqueue(kind, delta);
        if !queued.is_empty() {
            self.wake.notify_one();
        }
        queued
    }

    /// Cached totals, including optimistic local changes.
    pub fn totals(&self) -> Totals {
        self.queue.totals()
    }

    /// Exchange a Google credential for a session, adopt the server totals,
    /// then deliver anything queued while signed out.
    pub async fn sign_in(&self, credential: &str) -> Result<UserSummary, ClientError> {
        let response = self
            .transport
            .verify_token(credential)
            .await
            .map_err(ClientError::SignIn)?;

        self.queue.set_totals(response.all_time);
        self.set_user(Some(response.user.clone()));
        tracing::info!(display_name = %response.user.display_name, "Signed in");

        self.queue.drain().await;
        Ok(response.user)
    }

    /// End the server session. The local queue is kept for the next sign-in.
    pub async fn sign_out(&self) {
        if let Err(e) = self.transport.logout().await {
            tracing::warn!(error = %e, "Logout request failed");
        }
        self.set_user(None);
    }

    /// Clear totals locally, then on the server. Pending entries are kept.
    pub async fn reset(&self) -> Result<(), ClientError> {
        self.queue.clear_totals();
        self.transport.reset_reps().await?;
        Ok(())
    }

    /// Adopt the server's totals. Returns false when the server is unreachable
    /// or the session is missing; cached totals are then left unchanged.
    pub async fn refresh_totals(&self) -> bool {
        match self.transport.get_all_reps().await {
            Ok(response) => {
                self.queue.set_totals(response.all_time);
                true
            }
            Err(e) if e.is_unauthenticated() => {
                tracing::debug!("Not signed in; keeping cached totals");
                false
            }
            Err(e) => {
                tracing::debug!(error = %e, "Could not refresh totals");
                false
            }
        }
    }

    /// Trigger a drain now, e.g. when connectivity returns.
    pub fn notify_reconnect(&self) {
        self.wake.notify_one();
    }

    /// Run [`run_drain_loop`] on a background task until `shutdown` turns true.
    pub fn spawn_sync(&self, policy: RetryPolicy, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(run_drain_loop(
            self.queue.clone(),
            policy,
            self.wake.clone(),
            shutdown,
        ))
    }
}

/// Drain `queue` on a timer and whenever `wake` is notified.
///
/// After a cycle with failed deliveries the wait grows according to
/// `policy`; a clean cycle resets it.
pub async fn run_drain_loop<T: RepTransport>(
    queue: Arc<RepQueue<T>>,
    policy: RetryPolicy,
    wake: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut failures: u32 = 0;
    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(policy.delay_after(failures)) => {}
            _ = wake.notified() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        let report = queue.drain().await;
        if report.already_running {
            continue;
        }
        if report.failed > 0 {
            failures = failures.saturating_add(1);
            tracing::debug!(
                failures,
                next_in_secs = policy.delay_after(failures).as_secs(),
                "Drain cycle had failures"
            );
        } else {
            failures = 0;
        }
    }
    tracing::debug!("Drain loop stopped");
}
