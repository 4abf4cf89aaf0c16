//! Stateless session tokens.
//!
//! A successful login issues a token sealing `{username, expiry}` under the
//! server's [`SessionKey`]. Requests to protected endpoints present it either
//! as `Authorization: Bearer <token>` or in the `tweetapp_session` cookie, and
//! the [`AuthSession`] extractor opens and checks it before the handler runs.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{TimeDelta, Utc};
use cookie::{Cookie, SameSite};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::crypto::SessionKey;
use crate::error::AppError;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "tweetapp_session";

/// Payload sealed inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Authenticated username
    pub sub: String,
    /// Expiry as a unix timestamp (seconds)
    pub exp: i64,
}

/// A freshly issued token and its lifetime in seconds.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_in: u64,
}

/// Shortest session lifetime, in hours.
pub const MIN_TTL_HOURS: u64 = 1;

/// Longest session lifetime, in hours (one year).
pub const MAX_TTL_HOURS: u64 = 24 * 365;

/// Issues and validates session tokens.
#[derive(Debug, Clone)]
pub struct SessionManager {
    key: SessionKey,
    ttl: TimeDelta,
    secure_cookie: bool,
}

impl SessionManager {
    /// `ttl_hours` is clamped to `MIN_TTL_HOURS..=MAX_TTL_HOURS`.
    pub fn new(key: SessionKey, ttl_hours: u64) -> Self {
        let clamped = ttl_hours.clamp(MIN_TTL_HOURS, MAX_TTL_HOURS);
        if clamped != ttl_hours {
            warn!(
                "Session lifetime of {}h is out of range, using {}h",
                ttl_hours, clamped
            );
        }
        let ttl = TimeDelta::try_hours(clamped as i64).unwrap_or(TimeDelta::hours(24));
        SessionManager {
            key,
            ttl,
            secure_cookie: true,
        }
    }

    /// Whether the session cookie carries the `Secure` attribute (default on).
    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }

    /// Seals a new token for `username`.
    pub fn issue(&self, username: &str) -> Result<IssuedSession, AppError> {
        let claims = SessionClaims {
            sub: username.to_string(),
            exp: Utc::now()
                .checked_add_signed(self.ttl)
                .ok_or_else(|| AppError::Internal("session expiry overflow".into()))?
                .timestamp(),
        };
        self.issue_claims(&claims)
    }

    fn issue_claims(&self, claims: &SessionClaims) -> Result<IssuedSession, AppError> {
        let payload =
            serde_json::to_vec(claims).map_err(|e| AppError::Internal(e.to_string()))?;
        let token = self
            .key
            .seal(&payload)
            .map_err(|e| AppError::Internal(format!("failed to seal session: {}", e)))?;
        Ok(IssuedSession {
            token,
            expires_in: self.ttl.num_seconds().max(0) as u64,
        })
    }

    /// Opens `token` and checks its expiry.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, AppError> {
        let payload = self.key.open(token).map_err(|e| {
            debug!("Rejected session token: {}", e);
            AppError::Unauthorized("invalid session token".into())
        })?;
        let claims: SessionClaims = serde_json::from_slice(&payload)
            .map_err(|_| AppError::Unauthorized("invalid session token".into()))?;

        if claims.exp <= Utc::now().timestamp() {
            debug!("Session for {} expired at {}", claims.sub, claims.exp);
            return Err(AppError::Unauthorized("session expired".into()));
        }
        Ok(claims)
    }

    /// `Set-Cookie` value carrying `session`.
    pub fn cookie_for(&self, session: &IssuedSession) -> String {
        Cookie::build((SESSION_COOKIE, session.token.clone()))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .max_age(cookie::time::Duration::seconds(session.expires_in as i64))
            .build()
            .to_string()
    }

    /// `Set-Cookie` value that clears the session cookie.
    pub fn clearing_cookie(&self) -> String {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .max_age(cookie::time::Duration::ZERO)
            .build()
            .to_string()
    }
}

/// The authenticated caller of a protected endpoint.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub username: String,
}

impl AuthSession {
    /// Fails with `Forbidden` unless the session belongs to `username`.
    pub fn require_user(&self, username: &str) -> Result<(), AppError> {
        if self.username == username {
            Ok(())
        } else {
            warn!(
                "Session user {} attempted to act as {}",
                self.username, username
            );
            Err(AppError::Forbidden(format!(
                "session does not belong to {}",
                username
            )))
        }
    }
}

fn token_from_parts(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    if bearer.is_some() {
        return bearer;
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| Cookie::split_parse(h.to_string()))
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
        .map(|c| c.value().to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    Arc<SessionManager>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = Arc::<SessionManager>::from_ref(state);
        let token = token_from_parts(parts)
            .ok_or_else(|| AppError::Unauthorized("missing session token".into()))?;
        let claims = sessions.validate(&token)?;
        Ok(AuthSession {
            username: claims.sub,
        })
    }
}
