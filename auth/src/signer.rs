//! Keyed digests binding a resource reference to an expiry.
//!
//! Tokens are never stored. Each one is issued while building a response and
//! verified statelessly when the client presents it again.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::{AuthError, Result, SecretKeyError};
use crate::key::SecretKey;

type HmacSha256 = Hmac<Sha256>;

const DOMAIN: &[u8] = b"teleview.v1";

/// Produces and verifies HMAC-SHA256 digests with the process secret key.
#[derive(Clone, Debug)]
pub struct UrlSigner {
    key: Arc<SecretKey>,
}

impl UrlSigner {
    /// Refuses an all-zero key regardless of where it came from.
    pub fn new(key: Arc<SecretKey>) -> Result<Self> {
        if key.is_zero() {
            return Err(SecretKeyError::AllZero.into());
        }
        Ok(Self { key })
    }

    /// Each field is length-prefixed so `["ab", "c"]` and `["a", "bc"]`
    /// never collide.
    fn digest(&self, payload: &[&str], expiry: i64) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.key.as_bytes())
            .map_err(|e| AuthError::Configuration(format!("invalid signing key: {}", e)))?;
        mac.update(DOMAIN);
        mac.update(&(payload.len() as u64).to_be_bytes());
        for field in payload {
            mac.update(&(field.len() as u64).to_be_bytes());
            mac.update(field.as_bytes());
        }
        mac.update(&expiry.to_be_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Hex digest over the payload fields and the expiry (unix seconds).
    pub fn sign(&self, payload: &[&str], expiry: DateTime<Utc>) -> Result<String> {
        Ok(hex::encode(self.digest(payload, expiry.timestamp())?))
    }

    /// Recomputes the digest and compares in constant time, then checks the
    /// expiry. Any malformed input is a denial.
    pub fn verify(
        &self,
        payload: &[&str],
        expiry: DateTime<Utc>,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let presented = hex::decode(digest).map_err(|_| AuthError::SignatureInvalid)?;
        let expected = self.digest(payload, expiry.timestamp())?;
        if presented.len() != expected.len() || !bool::from(presented.ct_eq(expected.as_slice())) {
            debug!("Rejected signed value with mismatched digest");
            return Err(AuthError::SignatureInvalid);
        }
        if now > expiry {
            debug!("Rejected signed value that expired at {}", expiry);
            return Err(AuthError::Expired);
        }
        Ok(())
    }
}

fn as_fields(payload: &[String]) -> Vec<&str> {
    payload.iter().map(String::as_str).collect()
}

/// A signed grant to fetch one protected resource.
///
/// Travels as query parameters: `resource`, `requester`, `expires`, optional
/// `created`, and `token` (the digest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedToken {
    pub resource: String,
    pub requester: String,
    /// Expiry in unix seconds.
    pub expires: i64,
    /// Creation time of the underlying resource in unix seconds, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    pub token: String,
}

impl SignedToken {
    const PURPOSE: &'static str = "resource";

    pub fn issue(
        signer: &UrlSigner,
        resource: impl Into<String>,
        requester: impl Into<String>,
        created: Option<DateTime<Utc>>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut token = Self {
            resource: resource.into(),
            requester: requester.into(),
            expires: (now + ttl).timestamp(),
            created: created.map(|c| c.timestamp()),
            token: String::new(),
        };
        let payload = token.payload();
        token.token = signer.sign(&as_fields(&payload), token.expires_at()?)?;
        Ok(token)
    }

    fn payload(&self) -> [String; 4] {
        [
            Self::PURPOSE.to_string(),
            self.resource.clone(),
            self.requester.clone(),
            self.created.map(|c| c.to_string()).unwrap_or_default(),
        ]
    }

    pub fn expires_at(&self) -> Result<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires, 0).ok_or(AuthError::SignatureInvalid)
    }

    pub fn created_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.created
            .map(|c| DateTime::from_timestamp(c, 0).ok_or(AuthError::SignatureInvalid))
            .transpose()
    }

    pub fn verify(&self, signer: &UrlSigner, now: DateTime<Utc>) -> Result<()> {
        let payload = self.payload();
        signer.verify(&as_fields(&payload), self.expires_at()?, &self.token, now)
    }

    /// Query string form, without the leading `?`.
    pub fn to_query(&self) -> String {
        let mut query = format!(
            "resource={}&requester={}&expires={}",
            urlencoding::encode(&self.resource),
            urlencoding::encode(&self.requester),
            self.expires
        );
        if let Some(created) = self.created {
            query.push_str(&format!("&created={}", created));
        }
        query.push_str(&format!("&token={}", self.token));
        query
    }
}
