//! Media relay: signed links to upstream images and recordings.
//!
//! The browser never talks to the telephony provider directly. Pages hand out
//! short-lived signed links to `/media/images` or `/media/recordings`; when a
//! link is followed the proxy verifies it and streams the bytes from the
//! upstream API with the account credentials.

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use auth::{SignedToken, UrlSigner};
use authz::Capability;

pub const IMAGES_PATH: &str = "/media/images";
pub const RECORDINGS_PATH: &str = "/media/recordings";

/// Version prefix of every upstream REST path.
pub const API_VERSION: &str = "2010-04-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Recording,
}

impl MediaKind {
    /// Capability the viewer needs for this kind of media.
    pub fn capability(&self) -> Capability {
        match self {
            MediaKind::Image => Capability::ViewMedia,
            MediaKind::Recording => Capability::PlayRecordings,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            MediaKind::Image => IMAGES_PATH,
            MediaKind::Recording => RECORDINGS_PATH,
        }
    }

    fn default_content_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "application/octet-stream",
            MediaKind::Recording => "audio/mpeg",
        }
    }
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("media not found upstream")]
    NotFound,

    #[error("{0}")]
    Upstream(String),
}

impl From<reqwest::Error> for MediaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MediaError::Upstream("timed out fetching media".to_string())
        } else {
            MediaError::Upstream(err.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamMedia {
    pub content_type: String,
    pub body: Bytes,
}

/// Fetches media bytes, and the metadata needed to gate them, from wherever
/// the telephony provider keeps them.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch(&self, kind: MediaKind, resource: &str) -> Result<UpstreamMedia, MediaError>;

    /// When the provider created `resource`.
    async fn date_created(
        &self,
        kind: MediaKind,
        resource: &str,
    ) -> Result<DateTime<Utc>, MediaError>;
}

fn is_sid(segment: &str, prefix: &str) -> bool {
    segment
        .strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphanumeric()))
}

/// True when `resource` is the API path of a single item of `kind`:
///
/// - images: `/2010-04-01/Accounts/AC../Messages/MM../Media/ME..`
/// - recordings: `/2010-04-01/Accounts/AC../Recordings/RE..`
pub fn is_valid_resource(kind: MediaKind, resource: &str) -> bool {
    let Some(path) = resource.strip_prefix('/') else {
        return false;
    };
    let segments: Vec<&str> = path.split('/').collect();
    match (kind, segments.as_slice()) {
        (MediaKind::Image, [version, "Accounts", account, "Messages", message, "Media", media]) => {
            *version == API_VERSION
                && is_sid(account, "AC")
                && is_sid(message, "MM")
                && is_sid(media, "ME")
        }
        (MediaKind::Recording, [version, "Accounts", account, "Recordings", recording]) => {
            *version == API_VERSION && is_sid(account, "AC") && is_sid(recording, "RE")
        }
        _ => false,
    }
}

/// Builds a signed link for `requester` to fetch `resource`.
pub fn media_url(
    signer: &UrlSigner,
    kind: MediaKind,
    resource: &str,
    requester: &str,
    created: Option<DateTime<Utc>>,
    ttl: Duration,
    now: DateTime<Utc>,
) -> auth::Result<(String, SignedToken)> {
    let token = SignedToken::issue(signer, resource, requester, created, ttl, now)?;
    Ok((format!("{}?{}", kind.path(), token.to_query()), token))
}

#[derive(Debug, Deserialize)]
struct ResourceMetadata {
    date_created: String,
}

/// The API reports timestamps in RFC 2822 form, e.g. `Tue, 10 Aug 2010 08:02:17 +0000`.
fn parse_date_created(value: &str) -> Result<DateTime<Utc>, MediaError> {
    DateTime::parse_from_rfc2822(value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| MediaError::Upstream(format!("invalid date_created {:?}: {}", value, e)))
}

/// Telephony REST API over `reqwest`, authenticated with the account
/// credentials.
pub struct HttpMediaSource {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl HttpMediaSource {
    pub fn new(
        base_url: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MediaError> {
        let timeout = timeout
            .to_std()
            .map_err(|e| MediaError::Upstream(format!("invalid upstream timeout: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::Upstream(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        })
    }

    fn url_for(&self, kind: MediaKind, resource: &str) -> String {
        match kind {
            MediaKind::Image => format!("{}{}", self.base_url, resource),
            MediaKind::Recording => format!("{}{}.mp3", self.base_url, resource),
        }
    }

    fn metadata_url_for(&self, resource: &str) -> String {
        format!("{}{}.json", self.base_url, resource)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, MediaError> {
        debug!("Fetching upstream {}", url);
        let response = self
            .client
            .get(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MediaError::NotFound);
        }
        if !status.is_success() {
            warn!("Upstream returned {} for {}", status, url);
            return Err(MediaError::Upstream(format!(
                "upstream returned status {}",
                status
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl MediaSource for HttpMediaSource {
    async fn fetch(&self, kind: MediaKind, resource: &str) -> Result<UpstreamMedia, MediaError> {
        let response = self.get(&self.url_for(kind, resource)).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(kind.default_content_type())
            .to_string();
        let body = response.bytes().await?;
        Ok(UpstreamMedia { content_type, body })
    }

    async fn date_created(
        &self,
        _kind: MediaKind,
        resource: &str,
    ) -> Result<DateTime<Utc>, MediaError> {
        let metadata: ResourceMetadata = self
            .get(&self.metadata_url_for(resource))
            .await?
            .json()
            .await?;
        parse_date_created(&metadata.date_created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::SecretKey;
    use chrono::TimeZone;
    use std::sync::Arc;

    const IMAGE: &str = "/2010-04-01/Accounts/AC1f/Messages/MM2e/Media/ME3d";
    const RECORDING: &str = "/2010-04-01/Accounts/AC1f/Recordings/RE4c";

    #[test]
    fn test_resource_validation() {
        assert!(is_valid_resource(MediaKind::Image, IMAGE));
        assert!(is_valid_resource(MediaKind::Recording, RECORDING));

        assert!(!is_valid_resource(MediaKind::Image, RECORDING));
        assert!(!is_valid_resource(MediaKind::Recording, IMAGE));
        assert!(!is_valid_resource(MediaKind::Image, ""));
        assert!(!is_valid_resource(MediaKind::Image, "2010-04-01/Accounts/AC1f/Messages/MM2e/Media/ME3d"));
        assert!(!is_valid_resource(MediaKind::Image, "//evil.example.com/x"));
        assert!(!is_valid_resource(MediaKind::Image, "/a/../../etc/passwd"));
    }

    #[test]
    fn test_non_media_api_paths_are_rejected() {
        for kind in [MediaKind::Image, MediaKind::Recording] {
            assert!(!is_valid_resource(kind, "/2010-04-01/Accounts/AC1f/Messages.json"));
            assert!(!is_valid_resource(kind, "/2010-04-01/Accounts/AC1f/Calls/CA1"));
            assert!(!is_valid_resource(kind, "/2010-04-01/Accounts/AC1f/Messages/MM2e"));
            assert!(!is_valid_resource(kind, "/2010-04-01/Accounts/AC1f/Recordings"));
        }
        assert!(!is_valid_resource(MediaKind::Image, "/2010-04-01/Accounts/AC1f/Messages/MM2e/Media/ME3d.json"));
        assert!(!is_valid_resource(MediaKind::Image, "/2010-04-01/Accounts/AC1f/Messages/MM2e/Media/ME"));
        assert!(!is_valid_resource(MediaKind::Image, "/2010-04-01/Accounts/AC1f/Messages/MM2e/Media/ME3d?x=1"));
        assert!(!is_valid_resource(MediaKind::Recording, "/2010-04-01/Accounts/AC1f/Recordings/RE4c/Transcriptions"));
        assert!(!is_valid_resource(MediaKind::Recording, "/2008-08-01/Accounts/AC1f/Recordings/RE4c"));
        assert!(!is_valid_resource(MediaKind::Recording, "/2010-04-01/Accounts/AC1f/Recordings/CA4c"));
    }

    #[test]
    fn test_kind_capabilities() {
        assert_eq!(MediaKind::Image.capability(), Capability::ViewMedia);
        assert_eq!(MediaKind::Recording.capability(), Capability::PlayRecordings);
        assert_eq!(MediaKind::Recording.path(), RECORDINGS_PATH);
    }

    #[test]
    fn test_media_url_carries_token() {
        let signer = UrlSigner::new(Arc::new(SecretKey::from_bytes([3u8; 32]))).unwrap();
        let now = Utc::now();
        let (url, token) = media_url(
            &signer,
            MediaKind::Image,
            IMAGE,
            "alice",
            None,
            Duration::hours(1),
            now,
        )
        .unwrap();
        assert!(url.starts_with("/media/images?resource=%2F2010-04-01%2FAccounts%2FAC1f"));
        assert!(url.ends_with(&token.token));
        assert!(token.verify(&signer, now).is_ok());
    }

    #[test]
    fn test_upstream_urls() {
        let source = HttpMediaSource::new(
            "https://api.example.com/",
            "AC1f",
            "token",
            Duration::seconds(5),
        )
        .unwrap();
        assert_eq!(
            source.url_for(MediaKind::Recording, RECORDING),
            format!("https://api.example.com{}.mp3", RECORDING)
        );
        assert_eq!(
            source.url_for(MediaKind::Image, IMAGE),
            format!("https://api.example.com{}", IMAGE)
        );
        assert_eq!(
            source.metadata_url_for(IMAGE),
            format!("https://api.example.com{}.json", IMAGE)
        );
    }

    #[test]
    fn test_parse_date_created() {
        let parsed = parse_date_created("Tue, 10 Aug 2010 08:02:17 +0000").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2010, 8, 10, 8, 2, 17).unwrap());

        let parsed = parse_date_created("Tue, 10 Aug 2010 10:02:17 +0200").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2010, 8, 10, 8, 2, 17).unwrap());

        assert!(matches!(
            parse_date_created("yesterday"),
            Err(MediaError::Upstream(_))
        ));
    }
}
