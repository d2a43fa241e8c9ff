use async_trait::async_trait;
use axum::http::HeaderMap;

use authz::Principal;

use super::{AuthScheme, Authenticator, Challenge};
use crate::error::Result;

/// Accepts every request as the anonymous principal. Local use only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuthenticator;

#[async_trait]
impl Authenticator for NoopAuthenticator {
    fn scheme(&self) -> AuthScheme {
        AuthScheme::None
    }

    async fn authenticate(&self, _headers: &HeaderMap) -> Result<Principal> {
        Ok(Principal::anonymous())
    }

    fn challenge(&self) -> Challenge {
        Challenge::Redirect("/".to_string())
    }
}
