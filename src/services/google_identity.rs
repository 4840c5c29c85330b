// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Sign-In ID token verification.
//!
//! Tokens are RS256 JWTs signed by one of Google's rotating keys. Keys are
//! fetched from the JWKS endpoint advertised by Google's OpenID discovery
//! document and cached for the `max-age` Google returns. An unknown `kid`
//! forces one refresh before the token is rejected.

use crate::config::Config;
use crate::models::VerifiedIdentity;
use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const DISCOVERY_URL: &str = "https://accounts.google.com/.well-known/openid-configuration";
const DEFAULT_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;
const FALLBACK_DISPLAY_NAME: &str = "Unknown";

/// Identity verification failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    /// The credential is malformed, expired, or not issued for this app.
    #[error("invalid credential: {0}")]
    Invalid(String),
    /// Google's keys could not be fetched; the credential was not judged.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone)]
enum KeySource {
    Google,
    Static {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

struct CachedJwks {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

struct CachedDiscovery {
    jwks_uri: String,
    expires_at: Instant,
}

/// Verifier for Google Sign-In ID tokens issued to one OAuth client.
pub struct GoogleIdTokenVerifier {
    http_client: reqwest::Client,
    client_id: String,
    keys: KeySource,
    discovery: RwLock<Option<CachedDiscovery>>,
    jwks: RwLock<Option<CachedJwks>>,
    refresh_lock: Mutex<()>,
}

impl GoogleIdTokenVerifier {
    /// Production verifier backed by Google's published keys.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        tracing::info!(
            client_id = %config.google_client_id,
            "Initialized Google ID token verifier"
        );
        Self::build(&config.google_client_id, KeySource::Google)
    }

    /// Verifier that trusts a single RSA public key under `kid`.
    ///
    /// Used by tests and local development to mint tokens without Google.
    pub fn with_static_key(
        client_id: &str,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static key id must not be empty");
        }
        Self::build(
            client_id,
            KeySource::Static {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
        )
    }

    fn build(client_id: &str, keys: KeySource) -> anyhow::Result<Self> {
        if client_id.trim().is_empty() {
            anyhow::bail!("Google client id must not be empty");
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building JWKS HTTP client")?;

        Ok(Self {
            http_client,
            client_id: client_id.to_string(),
            keys,
            discovery: RwLock::new(None),
            jwks: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify a Google ID token and return the identity it asserts.
    pub async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(IdentityError::Invalid("credential is empty".to_string()));
        }

        let header = decode_header(credential)
            .map_err(|e| IdentityError::Invalid(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::Invalid(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| IdentityError::Invalid("missing JWT kid".to_string()))?;
        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<IdTokenClaims>(credential, decoding_key.as_ref(), &validation)
            .map_err(|e| IdentityError::Invalid(format!("JWT validation failed: {e}")))?
            .claims;

        validate_iat(claims.iat)?;

        if claims.sub.trim().is_empty() {
            return Err(IdentityError::Invalid("empty sub claim".to_string()));
        }

        tracing::debug!(
            subject = %claims.sub,
            email_verified = ?claims.email_verified,
            "Google ID token verified"
        );

        Ok(VerifiedIdentity {
            subject: claims.sub,
            display_name: claims
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_string()),
            email: claims.email,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdentityError> {
        if let KeySource::Static {
            kid: static_kid,
            decoding_key,
        } = &self.keys
        {
            if kid == static_kid.as_str() {
                return Ok(decoding_key.clone());
            }
            return Err(IdentityError::Invalid(format!("unknown JWT kid: {kid}")));
        }

        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }

        // Keys rotate; an unknown kid gets one forced refresh before rejection.
        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdentityError::Invalid(format!(
            "JWT kid not found in Google JWKS: {kid}"
        )))
    }

    async fn cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let now = Instant::now();
        let jwks = self.jwks.read().await;
        jwks.as_ref()
            .filter(|cached| cached.expires_at > now)
            .and_then(|cached| cached.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), IdentityError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh
            && self
                .jwks
                .read()
                .await
                .as_ref()
                .is_some_and(|cached| cached.expires_at > Instant::now())
        {
            return Ok(());
        }

        let jwks_uri = self.resolve_jwks_uri(force_refresh).await?;
        tracing::debug!(jwks_uri = %jwks_uri, "Refreshing Google JWKS cache");

        let response = self
            .http_client
            .get(&jwks_uri)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdentityError::Unavailable(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);
        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_keys(jwks);
        if keys_by_kid.is_empty() {
            return Err(IdentityError::Unavailable(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks.write().await = Some(CachedJwks {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Google JWKS cache refreshed");
        Ok(())
    }

    async fn resolve_jwks_uri(&self, force_refresh: bool) -> Result<String, IdentityError> {
        let cached = self
            .discovery
            .read()
            .await
            .as_ref()
            .map(|entry| (entry.jwks_uri.clone(), entry.expires_at > Instant::now()));

        if let Some((uri, true)) = &cached {
            if !force_refresh {
                return Ok(uri.clone());
            }
        }
        let fallback = cached
            .map(|(uri, _)| uri)
            .unwrap_or_else(|| DEFAULT_JWKS_URL.to_string());

        match self.http_client.get(DISCOVERY_URL).send().await {
            Ok(resp) if resp.status().is_success() => {
                let ttl = cache_ttl_from_headers(resp.headers(), DEFAULT_CACHE_TTL);
                let discovery: OpenIdConfig = resp.json().await.map_err(|e| {
                    IdentityError::Unavailable(format!("invalid discovery JSON: {e}"))
                })?;

                *self.discovery.write().await = Some(CachedDiscovery {
                    jwks_uri: discovery.jwks_uri.clone(),
                    expires_at: Instant::now() + ttl,
                });
                Ok(discovery.jwks_uri)
            }
            Ok(resp) => {
                tracing::warn!(
                    status = %resp.status(),
                    "OpenID discovery returned non-success status; using fallback JWKS URI"
                );
                Ok(fallback)
            }
            Err(e) => {
                tracing::warn!(error = %e, "OpenID discovery failed; using fallback JWKS URI");
                Ok(fallback)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenIdConfig {
    jwks_uri: String,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

/// Claims of a Google Sign-In ID token that this service reads.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    iat: Option<u64>,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

/// RS256 signing keys from a JWKS document, by `kid`.
fn usable_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    jwks.keys
        .into_iter()
        .filter(|jwk| jwk.kty == "RSA" && !jwk.kid.trim().is_empty())
        .filter(|jwk| jwk.alg.as_deref().map_or(true, |alg| alg == "RS256"))
        .filter(|jwk| jwk.use_.as_deref().map_or(true, |u| u == "sig"))
        .filter_map(|jwk| match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => Some((jwk.kid, Arc::new(key))),
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                None
            }
        })
        .collect()
}

fn validate_iat(iat: Option<u64>) -> Result<(), IdentityError> {
    let Some(iat) = iat else {
        return Err(IdentityError::Invalid("missing iat claim".to_string()));
    };

    if iat > now_unix_secs() + CLOCK_SKEW_SECS {
        return Err(IdentityError::Invalid("iat claim is in the future".to_string()));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|raw| raw.trim_matches('"').parse::<u64>().ok())
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
