// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side access to the rep-tracker HTTP API.

use crate::middleware::auth::SESSION_COOKIE;
use crate::models::api::{
    AddRepRequest, AddRepResponse, AllRepsResponse, SuccessResponse, VerifyTokenRequest,
    VerifyTokenResponse,
};
use axum_extra::extract::cookie::Cookie;
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

/// Upper bound on one request, including reading the response body.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {error}")]
    Status { status: u16, error: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, TransportError::Status { status: 401, .. })
    }
}

/// Operations the client needs from the server.
///
/// The session established by `verify_token` is carried by the transport and
/// sent with every later call.
pub trait RepTransport: Send + Sync + 'static {
    fn verify_token(
        &self,
        credential: &str,
    ) -> impl Future<Output = Result<VerifyTokenResponse, TransportError>> + Send;

    fn add_rep(
        &self,
        request: &AddRepRequest,
    ) -> impl Future<Output = Result<AddRepResponse, TransportError>> + Send;

    fn get_all_reps(&self) -> impl Future<Output = Result<AllRepsResponse, TransportError>> + Send;

    fn reset_reps(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn logout(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct EmptyBody {}

/// [`RepTransport`] over HTTP with `reqwest`.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    session: Mutex<Option<String>>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// A request that has not completed within `timeout` fails with
    /// [`TransportError::Network`].
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("failed building HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: Mutex::new(None),
        })
    }

    pub fn has_session(&self) -> bool {
        self.session_token().is_some()
    }

    fn session_token(&self) -> Option<String> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_session(&self, token: Option<String>) {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = token;
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<(R, HeaderMap), TransportError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(token) = self.session_token() {
            request = request.header(COOKIE, format!("{SESSION_COOKIE}={token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let error = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(TransportError::Status {
                status: status.as_u16(),
                error,
            });
        }

        let headers = response.headers().clone();
        let body = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok((body, headers))
    }
}

/// Extract the session token from `Set-Cookie` response headers.
fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v.to_string()).ok())
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

impl RepTransport for HttpTransport {
    async fn verify_token(&self, credential: &str) -> Result<VerifyTokenResponse, TransportError> {
        let body = VerifyTokenRequest {
            credential: credential.to_string(),
        };
        let (response, headers) = self.post("/verify-token", &body).await?;
        let token = session_from_headers(&headers)
            .ok_or_else(|| TransportError::Decode("missing session cookie".to_string()))?;
        self.set_session(Some(token));
        Ok(response)
    }

    async fn add_rep(&self, request: &AddRepRequest) -> Result<AddRepResponse, TransportError> {
        let (response, _) = self.post("/add-rep", request).await?;
        Ok(response)
    }

    async fn get_all_reps(&self) -> Result<AllRepsResponse, TransportError> {
        let (response, _) = self.post("/get-all-reps", &EmptyBody {}).await?;
        Ok(response)
    }

    async fn reset_reps(&self) -> Result<(), TransportError> {
        let (_, _): (SuccessResponse, _) = self.post("/reset-reps", &EmptyBody {}).await?;
        Ok(())
    }

    async fn logout(&self) -> Result<(), TransportError> {
        let result: Result<(SuccessResponse, _), _> = self.post("/logout", &EmptyBody {}).await;
        self.set_session(None);
        result.map(|_| ())
    }
}
