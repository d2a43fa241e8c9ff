//! Stateless session cookies.
//!
//! The cookie value is `base64url(principal) . expires . digest`. Nothing is
//! kept server side; every request re-verifies the digest and the expiry.

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use authz::Principal;

use crate::error::{AuthError, Result};
use crate::signer::UrlSigner;

/// Session cookie name
pub const SESSION_COOKIE_NAME: &str = "teleview_session";

const PURPOSE: &str = "session";

/// Cookie attributes shared by every session cookie this process sets.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// How long a session stays valid after login.
    pub ttl: Duration,
    /// Send the cookie over HTTPS only.
    pub secure: bool,
}

impl SessionConfig {
    pub fn new(ttl: Duration, allow_unencrypted_traffic: bool) -> Self {
        Self {
            cookie_name: SESSION_COOKIE_NAME.to_string(),
            ttl,
            secure: !allow_unencrypted_traffic,
        }
    }
}

/// Issues and verifies session cookies with the process signer.
#[derive(Debug, Clone)]
pub struct SessionManager {
    signer: UrlSigner,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(signer: UrlSigner, config: SessionConfig) -> Self {
        Self { signer, config }
    }

    /// Signed cookie value for `principal`, valid until `now + ttl`.
    pub fn issue(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String> {
        let expires = now + self.config.ttl;
        let digest = self.signer.sign(&[PURPOSE, &principal.id], expires)?;
        Ok(format!(
            "{}.{}.{}",
            BASE64.encode(principal.id.as_bytes()),
            expires.timestamp(),
            digest
        ))
    }

    /// Decodes and verifies a cookie value. Every malformed shape is reported
    /// as `SessionInvalid`; a well-formed but stale one as `Expired`.
    pub fn verify(&self, value: &str, now: DateTime<Utc>) -> Result<Principal> {
        let mut parts = value.splitn(3, '.');
        let (Some(encoded), Some(expires), Some(digest)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::SessionInvalid);
        };

        let id = BASE64
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(AuthError::SessionInvalid)?;
        let expires = expires
            .parse::<i64>()
            .ok()
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .ok_or(AuthError::SessionInvalid)?;

        match self.signer.verify(&[PURPOSE, &id], expires, digest, now) {
            Ok(()) => Ok(Principal::new(id)),
            Err(AuthError::SignatureInvalid) => Err(AuthError::SessionInvalid),
            Err(e) => Err(e),
        }
    }

    /// Reads and verifies the session cookie from request headers.
    pub fn from_headers(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Result<Principal> {
        let value = find_cookie(headers, &self.config.cookie_name).ok_or_else(|| {
            debug!("No session cookie on request");
            AuthError::SessionInvalid
        })?;
        self.verify(&value, now)
    }

    /// `Set-Cookie` header value establishing a session.
    pub fn set_cookie(&self, value: &str) -> String {
        self.cookie_header(value, self.config.ttl.num_seconds())
    }

    /// `Set-Cookie` header value removing the session.
    pub fn clear_cookie(&self) -> String {
        self.cookie_header("", 0)
    }

    fn cookie_header(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.config.cookie_name, value, max_age
        );
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Returns the value of the named cookie from any `Cookie` header.
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
