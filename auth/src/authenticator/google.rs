//! Google OAuth login with stateless, signed session cookies.
//!
//! Flow:
//!
//! 1. `GET /auth/login` redirects to [`GoogleAuthenticator::login_url`]
//! 2. Google redirects back to `/auth/callback?code=..&state=..`
//! 3. [`GoogleAuthenticator::complete`] checks the signed `state`, exchanges
//!    the code for a verified email and issues the session cookie
//! 4. Every later request is authenticated by re-verifying that cookie

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tracing::{info, warn};

use authz::Principal;

use super::provider::IdentityProvider;
use super::{AuthScheme, Authenticator, Challenge};
use crate::error::{AuthError, Result};
use crate::session::{SessionConfig, SessionManager};
use crate::signer::UrlSigner;

pub const LOGIN_PATH: &str = "/auth/login";
pub const CALLBACK_PATH: &str = "/auth/callback";

const STATE_PURPOSE: &str = "oauth-state";
const STATE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Host name (and optional port) the site is served from.
    pub public_host: String,
    /// When true the callback URL is plain `http://` and the session cookie
    /// is not marked `Secure`.
    pub allow_unencrypted_traffic: bool,
    /// Lifetime of a session cookie after login.
    pub session_ttl: Duration,
}

impl GoogleConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.allow_unencrypted_traffic {
            "http"
        } else {
            "https"
        };
        format!("{}://{}", scheme, self.public_host)
    }
}

pub struct GoogleAuthenticator {
    base_url: String,
    signer: UrlSigner,
    sessions: SessionManager,
    provider: Arc<dyn IdentityProvider>,
}

impl GoogleAuthenticator {
    pub fn new(
        config: GoogleConfig,
        signer: UrlSigner,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(AuthError::Configuration(
                "Google auth requires google_client_id and google_client_secret".to_string(),
            ));
        }
        if config.public_host.is_empty() {
            return Err(AuthError::Configuration(
                "Google auth requires public_host for the callback URL".to_string(),
            ));
        }
        if config.session_ttl <= Duration::zero() {
            return Err(AuthError::Configuration(
                "session_ttl must be positive".to_string(),
            ));
        }
        let sessions = SessionManager::new(
            signer.clone(),
            SessionConfig::new(config.session_ttl, config.allow_unencrypted_traffic),
        );
        Ok(Self {
            base_url: config.base_url(),
            signer,
            sessions,
            provider,
        })
    }

    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.base_url, CALLBACK_PATH)
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    fn issue_state(&self, now: DateTime<Utc>) -> Result<String> {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        let nonce = hex::encode(nonce);
        let expires = now + Duration::minutes(STATE_TTL_MINUTES);
        let digest = self.signer.sign(&[STATE_PURPOSE, &nonce], expires)?;
        Ok(format!("{}.{}.{}", nonce, expires.timestamp(), digest))
    }

    fn verify_state(&self, state: &str, now: DateTime<Utc>) -> Result<()> {
        let mut parts = state.splitn(3, '.');
        let (Some(nonce), Some(expires), Some(digest)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::SignatureInvalid);
        };
        let expires = expires
            .parse::<i64>()
            .ok()
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .ok_or(AuthError::SignatureInvalid)?;
        self.signer.verify(&[STATE_PURPOSE, nonce], expires, digest, now)
    }

    /// Provider consent URL carrying a freshly signed `state`.
    pub fn login_url(&self, now: DateTime<Utc>) -> Result<String> {
        let state = self.issue_state(now)?;
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.provider.authorization_endpoint(),
            urlencoding::encode(self.provider.client_id()),
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode("openid email"),
            urlencoding::encode(&state)
        ))
    }

    /// Finishes the callback and returns the `Set-Cookie` value for the new
    /// session. Any failure leaves the browser unauthenticated.
    pub async fn complete(&self, code: &str, state: &str, now: DateTime<Utc>) -> Result<(Principal, String)> {
        self.verify_state(state, now).map_err(|e| {
            warn!("Rejected OAuth callback with bad state: {}", e);
            e
        })?;

        let identity = self.provider.exchange(code, &self.redirect_uri()).await?;
        if identity.email.is_empty() || !identity.email_verified {
            return Err(AuthError::Provider(
                "identity provider did not return a verified email".to_string(),
            ));
        }

        let principal = Principal::new(identity.email);
        let value = self.sessions.issue(&principal, now)?;
        info!("Started session for {}", principal);
        Ok((principal, self.sessions.set_cookie(&value)))
    }

    /// Verifies the session cookie against `now`.
    pub fn authenticate_at(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Result<Principal> {
        self.sessions.from_headers(headers, now)
    }
}

#[async_trait]
impl Authenticator for GoogleAuthenticator {
    fn scheme(&self) -> AuthScheme {
        AuthScheme::Google
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal> {
        self.authenticate_at(headers, Utc::now())
    }

    fn challenge(&self) -> Challenge {
        Challenge::Redirect(LOGIN_PATH.to_string())
    }

    fn logout_cookie(&self) -> Option<String> {
        Some(self.sessions.clear_cookie())
    }

    fn oauth(&self) -> Option<&GoogleAuthenticator> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authenticator::provider::Identity;
    use crate::key::SecretKey;
    use crate::session::SESSION_COOKIE_NAME;
    use axum::http::{header, HeaderValue};

    struct FakeProvider {
        result: std::result::Result<Identity, String>,
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        fn authorization_endpoint(&self) -> &str {
            "https://provider.test/auth"
        }

        fn client_id(&self) -> &str {
            "client-123"
        }

        async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<Identity> {
            assert_eq!(code, "good-code");
            assert!(redirect_uri.ends_with(CALLBACK_PATH));
            self.result.clone().map_err(AuthError::Provider)
        }
    }

    fn config(allow_unencrypted: bool) -> GoogleConfig {
        GoogleConfig {
            client_id: "client-123".to_string(),
            client_secret: "shh".to_string(),
            public_host: "logs.example.com".to_string(),
            allow_unencrypted_traffic: allow_unencrypted,
            session_ttl: Duration::days(14),
        }
    }

    fn authenticator(
        allow_unencrypted: bool,
        result: std::result::Result<Identity, String>,
    ) -> GoogleAuthenticator {
        let signer = UrlSigner::new(Arc::new(SecretKey::from_bytes([5u8; 32]))).unwrap();
        GoogleAuthenticator::new(
            config(allow_unencrypted),
            signer,
            Arc::new(FakeProvider { result }),
        )
        .unwrap()
    }

    fn verified(email: &str) -> std::result::Result<Identity, String> {
        Ok(Identity {
            email: email.to_string(),
            email_verified: true,
        })
    }

    fn state_from(url: &str) -> String {
        let encoded = url.split("state=").nth(1).unwrap();
        urlencoding::decode(encoded).unwrap().into_owned()
    }

    fn cookie_headers(set_cookie: &str) -> HeaderMap {
        let pair = set_cookie.split(';').next().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(pair).unwrap());
        headers
    }

    #[test]
    fn test_base_url_scheme() {
        assert_eq!(config(false).base_url(), "https://logs.example.com");
        assert_eq!(config(true).base_url(), "http://logs.example.com");
        assert_eq!(
            authenticator(true, verified("a@b.c")).redirect_uri(),
            "http://logs.example.com/auth/callback"
        );
    }

    #[test]
    fn test_login_url() {
        let auth = authenticator(false, verified("a@b.c"));
        let url = auth.login_url(Utc::now()).unwrap();
        assert!(url.starts_with("https://provider.test/auth?client_id=client-123"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Flogs.example.com%2Fauth%2Fcallback"));
        assert!(url.contains("response_type=code"));
    }

    #[tokio::test]
    async fn test_complete_and_authenticate() {
        let auth = authenticator(false, verified("alice@example.com"));
        let now = Utc::now();
        let state = state_from(&auth.login_url(now).unwrap());

        let (principal, set_cookie) = auth.complete("good-code", &state, now).await.unwrap();
        assert_eq!(principal.id, "alice@example.com");
        assert!(set_cookie.starts_with(SESSION_COOKIE_NAME));
        assert!(set_cookie.contains("Secure"));

        let headers = cookie_headers(&set_cookie);
        let resolved = auth.authenticate(&headers).await.unwrap();
        assert_eq!(resolved.id, "alice@example.com");

        let later = now + Duration::days(15);
        assert!(auth.authenticate_at(&headers, later).is_err());
    }

    #[tokio::test]
    async fn test_insecure_cookie_when_unencrypted_allowed() {
        let auth = authenticator(true, verified("alice@example.com"));
        let now = Utc::now();
        let state = state_from(&auth.login_url(now).unwrap());
        let (_, set_cookie) = auth.complete("good-code", &state, now).await.unwrap();
        assert!(!set_cookie.contains("Secure"));
    }

    #[tokio::test]
    async fn test_bad_state_rejected() {
        let auth = authenticator(false, verified("alice@example.com"));
        let now = Utc::now();
        assert!(auth.complete("good-code", "forged.1.00", now).await.is_err());
        assert!(auth.complete("good-code", "", now).await.is_err());

        let state = state_from(&auth.login_url(now).unwrap());
        let later = now + Duration::minutes(STATE_TTL_MINUTES + 1);
        assert!(matches!(
            auth.complete("good-code", &state, later).await,
            Err(AuthError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_provider_failure_never_authenticates() {
        let auth = authenticator(false, Err("timed out".to_string()));
        let now = Utc::now();
        let state = state_from(&auth.login_url(now).unwrap());
        assert!(matches!(
            auth.complete("good-code", &state, now).await,
            Err(AuthError::Provider(_))
        ));

        let unverified = authenticator(
            false,
            Ok(Identity {
                email: "eve@example.com".to_string(),
                email_verified: false,
            }),
        );
        let state = state_from(&unverified.login_url(now).unwrap());
        assert!(matches!(
            unverified.complete("good-code", &state, now).await,
            Err(AuthError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_cookie_challenges() {
        let auth = authenticator(false, verified("a@b.c"));
        assert!(matches!(
            auth.authenticate(&HeaderMap::new()).await,
            Err(AuthError::SessionInvalid)
        ));
        assert_eq!(auth.challenge(), Challenge::Redirect(LOGIN_PATH.to_string()));
        assert!(auth.logout_cookie().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn test_config_validation() {
        let signer = UrlSigner::new(Arc::new(SecretKey::random())).unwrap();
        let mut bad = config(false);
        bad.client_secret.clear();
        let provider = Arc::new(FakeProvider {
            result: verified("a@b.c"),
        });
        assert!(GoogleAuthenticator::new(bad, signer.clone(), provider.clone()).is_err());

        let mut bad = config(false);
        bad.session_ttl = Duration::zero();
        assert!(GoogleAuthenticator::new(bad, signer, provider).is_err());
    }
}
