// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end tests of the client queue against a live server.

use rep_tracker::client::{
    HttpTransport, RepClient, RepQueue, RepTransport, StateFile, TransportError,
};
use rep_tracker::models::api::{AddRepRequest, AddRepResponse, AllRepsResponse, VerifyTokenResponse};
use rep_tracker::models::ExerciseKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::*;

/// HTTP transport that can be switched offline.
struct FlakyTransport {
    inner: HttpTransport,
    online: AtomicBool,
}

impl FlakyTransport {
    fn new(base_url: String) -> Self {
        Self {
            inner: HttpTransport::new(base_url).unwrap(),
            online: AtomicBool::new(true),
        }
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), TransportError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Network("offline".to_string()))
        }
    }
}

impl RepTransport for FlakyTransport {
    async fn verify_token(&self, credential: &str) -> Result<VerifyTokenResponse, TransportError> {
        self.check()?;
        self.inner.verify_token(credential).await
    }

    async fn add_rep(&self, request: &AddRepRequest) -> Result<AddRepResponse, TransportError> {
        self.check()?;
        self.inner.add_rep(request).await
    }

    async fn get_all_reps(&self) -> Result<AllRepsResponse, TransportError> {
        self.check()?;
        self.inner.get_all_reps().await
    }

    async fn reset_reps(&self) -> Result<(), TransportError> {
        self.check()?;
        self.inner.reset_reps().await
    }

    async fn logout(&self) -> Result<(), TransportError> {
        self.check()?;
        self.inner.logout().await
    }
}

/// Serve the test app on an ephemeral port.
async fn spawn_server() -> (TestApp, String) {
    let app = create_test_app().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (app, format!("http://{addr}"))
}

#[tokio::test]
async fn test_offline_reps_are_delivered_after_sign_in() {
    let (app, base_url) = spawn_server().await;
    let transport = Arc::new(FlakyTransport::new(base_url));
    let client = RepClient::new(transport.clone(), StateFile::in_memory());

    transport.set_online(false);
    client.record(ExerciseKind::Push, 5);
    client.record(ExerciseKind::Pull, 2);
    let report = client.queue().drain().await;
    assert_eq!(report.failed, 2);
    assert_eq!(client.queue().pending().len(), 2);

    transport.set_online(true);
    let token = mint_id_token(&claims_for("client-user", "Client User"));
    let user = client.sign_in(&token).await.unwrap();
    assert_eq!(user.display_name, "Client User");

    assert!(client.queue().pending().is_empty());
    let totals = app.state.store.totals("client-user").await.unwrap();
    assert_eq!(totals[&ExerciseKind::Push], 5);
    assert_eq!(totals[&ExerciseKind::Pull], 2);
    assert_eq!(client.totals(), totals);
}

#[tokio::test]
async fn test_unauthenticated_deliveries_stay_queued() {
    let (app, base_url) = spawn_server().await;
    let transport = Arc::new(FlakyTransport::new(base_url));
    let client = RepClient::new(transport.clone(), StateFile::in_memory());

    client.record(ExerciseKind::Push, 1);
    let report = client.queue().drain().await;
    assert_eq!(report.failed, 1);
    assert_eq!(client.queue().pending().len(), 1);
    assert_eq!(app.state.store.user_count().await, 0);
}

#[tokio::test]
async fn test_sign_out_then_reset_requires_session() {
    let (_app, base_url) = spawn_server().await;
    let transport = Arc::new(FlakyTransport::new(base_url));
    let client = RepClient::new(transport.clone(), StateFile::in_memory());

    let token = mint_id_token(&claims_for("short-session", "Short"));
    client.sign_in(&token).await.unwrap();
    client.record(ExerciseKind::Pull, 4);
    client.queue().drain().await;
    assert!(client.refresh_totals().await);
    assert_eq!(client.totals()[&ExerciseKind::Pull], 4);

    client.sign_out().await;
    assert!(client.user().is_none());
    assert!(client.reset().await.is_err());
    assert!(!client.refresh_totals().await);
}

#[tokio::test]
async fn test_reset_clears_server_totals() {
    let (app, base_url) = spawn_server().await;
    let transport = Arc::new(FlakyTransport::new(base_url));
    let client = RepClient::new(transport.clone(), StateFile::in_memory());

    let token = mint_id_token(&claims_for("reset-client", "Reset"));
    client.sign_in(&token).await.unwrap();
    client.record(ExerciseKind::Push, 9);
    client.queue().drain().await;

    client.reset().await.unwrap();
    assert_eq!(client.totals()[&ExerciseKind::Push], 0);
    let totals = app.state.store.totals("reset-client").await.unwrap();
    assert_eq!(totals[&ExerciseKind::Push], 0);
}

#[tokio::test]
async fn test_queue_persists_across_client_restart() {
    let (app, base_url) = spawn_server().await;
    let state_path = app.dir.path().join("client-state.json");

    {
        let transport = Arc::new(FlakyTransport::new(base_url.clone()));
        transport.set_online(false);
        let client = RepClient::new(transport, StateFile::new(&state_path));
        client.record(ExerciseKind::Push, 11);
    }

    let transport = Arc::new(FlakyTransport::new(base_url));
    let client = RepClient::new(transport, StateFile::new(&state_path));
    assert_eq!(client.queue().pending().len(), 1);
    assert_eq!(client.totals()[&ExerciseKind::Push], 11);

    let token = mint_id_token(&claims_for("restarted", "Restarted"));
    client.sign_in(&token).await.unwrap();
    assert!(client.queue().pending().is_empty());
    assert_eq!(
        app.state.store.totals("restarted").await.unwrap()[&ExerciseKind::Push],
        11
    );
}

#[tokio::test]
async fn test_unanswered_delivery_does_not_wedge_queue() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept connections and never answer.
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    let transport = Arc::new(
        HttpTransport::with_timeout(format!("http://{addr}"), Duration::from_millis(200)).unwrap(),
    );
    let queue = RepQueue::new(transport, StateFile::in_memory());
    queue.enqueue(ExerciseKind::Push, 1);

    let first = tokio::time::timeout(Duration::from_secs(5), queue.drain())
        .await
        .expect("drain should finish once the request times out");
    assert_eq!(first.failed, 1);
    assert_eq!(queue.pending().len(), 1);

    let second = tokio::time::timeout(Duration::from_secs(5), queue.drain())
        .await
        .unwrap();
    assert!(!second.already_running);
    assert_eq!(second.attempted, 1);
}
