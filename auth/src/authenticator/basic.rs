//! HTTP Basic authentication against a static username/password map.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use authz::Principal;

use super::{AuthScheme, Authenticator, Challenge};
use crate::error::{AuthError, Result};

pub struct BasicAuthenticator {
    realm: String,
    users: HashMap<String, String>,
}

impl BasicAuthenticator {
    pub fn new(realm: impl Into<String>, users: HashMap<String, String>) -> Self {
        Self {
            realm: realm.into(),
            users,
        }
    }

    /// Decodes `Authorization: Basic <base64(user:password)>`.
    fn credentials(headers: &HeaderMap) -> Result<(String, String)> {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;
        let (scheme, encoded) = value
            .trim()
            .split_once(' ')
            .ok_or(AuthError::MissingCredentials)?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(AuthError::MissingCredentials);
        }
        let decoded = BASE64
            .decode(encoded.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(AuthError::MissingCredentials)?;
        let (user, password) = decoded
            .split_once(':')
            .ok_or(AuthError::MissingCredentials)?;
        Ok((user.to_string(), password.to_string()))
    }
}

impl std::fmt::Debug for BasicAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthenticator")
            .field("realm", &self.realm)
            .field("users", &self.users.len())
            .finish()
    }
}

#[async_trait]
impl Authenticator for BasicAuthenticator {
    fn scheme(&self) -> AuthScheme {
        AuthScheme::Basic
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal> {
        let (user, password) = Self::credentials(headers).map_err(|e| {
            debug!("Basic auth header missing or malformed");
            e
        })?;

        let matches = match self.users.get(&user) {
            Some(expected) => bool::from(expected.as_bytes().ct_eq(password.as_bytes())),
            None => false,
        };
        if !matches {
            warn!("Basic auth failed for user {}", user);
            return Err(AuthError::InvalidCredentials);
        }
        Ok(Principal::new(user))
    }

    fn challenge(&self) -> Challenge {
        Challenge::Basic {
            realm: self.realm.clone(),
        }
    }
}
