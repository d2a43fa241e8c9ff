//! OAuth identity providers.

use async_trait::async_trait;
use chrono::Duration;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AuthError, Result};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// The identity a provider vouches for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
}

/// Exchanges an authorization code for a verified identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to for consent.
    fn authorization_endpoint(&self) -> &str;

    fn client_id(&self) -> &str;

    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<Identity>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Google's OAuth 2.0 / OpenID Connect endpoints over `reqwest`.
pub struct GoogleIdentityProvider {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleIdentityProvider {
    /// Every call is bounded by `timeout`; a timeout fails the login.
    pub fn new(client_id: String, client_secret: String, timeout: Duration) -> Result<Self> {
        let timeout = timeout
            .to_std()
            .map_err(|e| AuthError::Configuration(format!("invalid provider timeout: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            client_id,
            client_secret,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorization_endpoint(&self) -> &str {
        GOOGLE_AUTH_URL
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<Identity> {
        debug!("Exchanging authorization code with Google");
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            warn!("Google rejected authorization code: {}", response.status());
            return Err(AuthError::Provider(format!(
                "token exchange failed with status {}",
                response.status()
            )));
        }
        let token: TokenResponse = response.json().await?;

        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "userinfo request failed with status {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}
