// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware and session cookie helpers.

use crate::config::Config;
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

/// Name of the HttpOnly session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Authenticated user resolved from the session.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Middleware that requires a valid session.
///
/// The user id placed in the request extensions comes only from the session
/// table, never from the request body.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(&jar, request.headers()).ok_or(AppError::Unauthenticated)?;
    let user_id = state
        .sessions
        .resolve(&token)
        .ok_or(AppError::Unauthenticated)?;

    request.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(request).await)
}

/// Session token from the cookie, or from a bearer header for non-browser clients.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string()).filter(|v| !v.is_empty());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Cookie carrying a freshly issued session token.
pub fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    let max_age = time::Duration::seconds(config.session_ttl.as_secs() as i64);
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.cookie_secure)
        .max_age(max_age)
        .build()
}

/// Cookie used to clear the session cookie; attributes match [`session_cookie`].
pub fn removal_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.cookie_secure)
        .max_age(time::Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_from_cookie_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=abc"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        let jar = CookieJar::from_headers(&headers);

        assert_eq!(session_token(&jar, &headers).as_deref(), Some("abc"));
    }

    #[test]
    fn token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        let jar = CookieJar::from_headers(&headers);

        assert_eq!(session_token(&jar, &headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_or_malformed_token() {
        let mut headers = HeaderMap::new();
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(session_token(&jar, &headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(session_token(&jar, &headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(session_token(&jar, &headers), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let config = Config::test_default();
        let cookie = session_cookie("tok".to_string(), &config).to_string();

        assert!(cookie.starts_with("session=tok"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn secure_flag_follows_config() {
        let config = Config {
            cookie_secure: true,
            ..Config::test_default()
        };
        assert!(session_cookie("tok".to_string(), &config)
            .to_string()
            .contains("Secure"));
        assert!(removal_cookie(&config).to_string().contains("Secure"));
    }
}
