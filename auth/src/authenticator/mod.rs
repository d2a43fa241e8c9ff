//! Request authentication.
//!
//! One [`Authenticator`] is chosen at startup from [`AuthConfig`] and shared
//! by every request. It turns request headers into a [`Principal`]; what the
//! principal may see is decided afterwards by the policy engine.
//!
//! - [`NoopAuthenticator`]: no authentication, everyone is `anonymous`
//! - [`BasicAuthenticator`]: HTTP Basic against a username/password map
//! - [`GoogleAuthenticator`]: Google OAuth with a signed session cookie

pub mod basic;
pub mod google;
pub mod noop;
pub mod provider;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::Duration;
use tracing::{info, warn};

use authz::Principal;

pub use basic::BasicAuthenticator;
pub use google::{GoogleAuthenticator, GoogleConfig};
pub use noop::NoopAuthenticator;
pub use provider::{GoogleIdentityProvider, Identity, IdentityProvider};

use crate::error::{AuthError, Result};
use crate::signer::UrlSigner;

/// The configured authentication scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    None,
    Basic,
    Google,
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScheme::None => write!(f, "none"),
            AuthScheme::Basic => write!(f, "basic"),
            AuthScheme::Google => write!(f, "google"),
        }
    }
}

/// How the web layer should react when authentication fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    /// Reply 401 with a `WWW-Authenticate: Basic` header for this realm.
    Basic { realm: String },
    /// Redirect the browser to this path to start a new login.
    Redirect(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    fn scheme(&self) -> AuthScheme;

    /// Resolves the request's principal or fails. Never returns a principal
    /// for a request whose credentials did not verify.
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal>;

    /// Response to send when [`Authenticator::authenticate`] fails.
    fn challenge(&self) -> Challenge;

    /// `Set-Cookie` value that ends the session, if the scheme has one.
    fn logout_cookie(&self) -> Option<String> {
        None
    }

    /// The OAuth flow endpoints, for schemes that have them.
    fn oauth(&self) -> Option<&GoogleAuthenticator> {
        None
    }
}

/// Startup configuration selecting one authenticator.
#[derive(Debug, Clone)]
pub enum AuthConfig {
    None,
    Basic {
        realm: String,
        users: HashMap<String, String>,
    },
    Google(GoogleConfig),
}

impl AuthConfig {
    pub fn scheme(&self) -> AuthScheme {
        match self {
            AuthConfig::None => AuthScheme::None,
            AuthConfig::Basic { .. } => AuthScheme::Basic,
            AuthConfig::Google(_) => AuthScheme::Google,
        }
    }
}

/// Builds the authenticator for `config`, validating it first.
pub fn build_authenticator(config: AuthConfig, signer: UrlSigner) -> Result<Arc<dyn Authenticator>> {
    let authenticator: Arc<dyn Authenticator> = match config {
        AuthConfig::None => {
            warn!("Disabling authentication, every request is served as anonymous");
            Arc::new(NoopAuthenticator)
        }
        AuthConfig::Basic { realm, users } => {
            if users.is_empty() || users.iter().any(|(u, p)| u.is_empty() || p.is_empty()) {
                return Err(AuthError::Configuration(
                    "Cannot run without Basic Auth, set a basic_auth_user and basic_auth_password"
                        .to_string(),
                ));
            }
            Arc::new(BasicAuthenticator::new(realm, users))
        }
        AuthConfig::Google(google) => {
            let provider = GoogleIdentityProvider::new(
                google.client_id.clone(),
                google.client_secret.clone(),
                Duration::seconds(10),
            )?;
            Arc::new(GoogleAuthenticator::new(google, signer, Arc::new(provider))?)
        }
    };
    info!("Authentication scheme: {}", authenticator.scheme());
    Ok(authenticator)
}
