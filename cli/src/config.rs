//! YAML file configuration and startup validation.
//!
//! Everything is checked here, before the listener is bound. A bad secret
//! key, an invalid policy or an incomplete auth scheme stops the process.

use anyhow::{anyhow, bail, Context, Result};
use chrono::Duration;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use auth::{build_authenticator, AuthConfig, GoogleConfig, SecretKey, UrlSigner};
use authz::{PermissionEvaluator, Policy, DEFAULT_MAX_RESOURCE_AGE_SECS};
use web::settings::{DEFAULT_PAGE_SIZE, PAGE_SIZE_MAXIMUM};
use web::{get_reporter, AppState, HttpMediaSource, ServerConfig, Settings};

pub const DEFAULT_CONFIG_PATH: &str = "config.yml";
pub const DEFAULT_PORT: u16 = 4114;
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.twilio.com";

const BASIC_REALM: &str = "teleview";
const DEFAULT_MEDIA_TOKEN_TTL_SECS: i64 = 60 * 60;
const DEFAULT_SESSION_TTL_SECS: i64 = 14 * 24 * 60 * 60;
const UPSTREAM_TIMEOUT_SECS: i64 = 30;
// Roughly a century; keeps chrono well inside its range.
const MAX_DURATION_SECS: i64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Realm {
    /// Development: plain HTTP is served and cookies are not `Secure`.
    Local,
    Prod,
}

/// The config file as written on disk. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub realm: Option<Realm>,
    pub public_host: String,
    pub page_size: u32,
    pub secret_key: String,
    pub max_resource_age_secs: i64,
    pub show_media_by_default: Option<bool>,
    pub media_token_ttl_secs: i64,
    pub session_ttl_secs: i64,

    pub error_reporter: String,

    pub auth_scheme: String,
    pub basic_auth_user: String,
    pub basic_auth_password: String,
    pub google_client_id: String,
    pub google_client_secret: String,

    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub upstream_base_url: String,

    pub log_dir: Option<PathBuf>,

    /// Inline policy, either a list of groups or `{policy: [...]}`.
    pub policy: Option<serde_yaml::Value>,
    pub policy_file: Option<PathBuf>,

    /// Set when the default config file was missing and local defaults are
    /// in use.
    #[serde(skip)]
    pub from_defaults: bool,
}

/// Everything the server needs, fully validated.
pub struct Runtime {
    pub state: AppState,
    pub server: ServerConfig,
}

/// Reads the config file at `path`.
///
/// A missing `config.yml` (the default path) falls back to local defaults;
/// any other missing file is an error.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    match std::fs::read_to_string(path) {
        Ok(data) => {
            if data.trim().is_empty() {
                return Ok(FileConfig::default());
            }
            serde_yaml::from_str(&data)
                .with_context(|| format!("Couldn't parse config file {}", path.display()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound && path == Path::new(DEFAULT_CONFIG_PATH) => {
            Ok(FileConfig::local_defaults())
        }
        Err(e) => {
            Err(e).with_context(|| format!("Couldn't find config file {}", path.display()))
        }
    }
}

fn seconds_or(value: i64, default_secs: i64, field: &str) -> Result<Duration> {
    match value {
        0 => Ok(Duration::seconds(default_secs)),
        v if v < 0 => bail!("{} must not be negative", field),
        v if v > MAX_DURATION_SECS => bail!("{} is too large", field),
        v => Ok(Duration::seconds(v)),
    }
}

impl FileConfig {
    pub fn local_defaults() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            realm: Some(Realm::Local),
            from_defaults: true,
            ..Self::default()
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn allow_unencrypted_traffic(&self) -> bool {
        self.realm == Some(Realm::Local)
    }

    pub fn max_resource_age(&self) -> Result<Duration> {
        seconds_or(
            self.max_resource_age_secs,
            DEFAULT_MAX_RESOURCE_AGE_SECS,
            "max_resource_age_secs",
        )
    }

    pub fn settings(&self) -> Result<Settings> {
        let page_size = match self.page_size {
            0 => DEFAULT_PAGE_SIZE,
            n if n > PAGE_SIZE_MAXIMUM => {
                bail!("Maximum allowable page size is {}", PAGE_SIZE_MAXIMUM)
            }
            n => n,
        };
        Ok(Settings {
            allow_unencrypted_traffic: self.allow_unencrypted_traffic(),
            public_host: self.public_host.clone(),
            page_size,
            show_media_by_default: self.show_media_by_default.unwrap_or(true),
            media_token_ttl: seconds_or(
                self.media_token_ttl_secs,
                DEFAULT_MEDIA_TOKEN_TTL_SECS,
                "media_token_ttl_secs",
            )?,
        })
    }

    /// The configured policy, or `None` when neither `policy` nor
    /// `policy_file` is set.
    pub fn policy(&self) -> Result<Option<Policy>> {
        match (&self.policy, &self.policy_file) {
            (Some(_), Some(_)) => bail!("Set either policy or policy_file, not both"),
            (Some(value), None) => {
                let policy = Policy::from_value(value.clone()).context("Invalid policy")?;
                policy.validate().context("Invalid policy")?;
                Ok(Some(policy))
            }
            (None, Some(path)) => Policy::load(path)
                .map(Some)
                .with_context(|| format!("Invalid policy file {}", path.display())),
            (None, None) => Ok(None),
        }
    }

    pub fn evaluator(&self) -> Result<PermissionEvaluator> {
        let max_age = self.max_resource_age()?;
        match self.policy()? {
            Some(policy) => {
                if policy.is_empty() {
                    warn!("Policy has no groups, every request will be denied");
                }
                Ok(PermissionEvaluator::new(Arc::new(policy), max_age))
            }
            None => {
                warn!("No policy configured, every authenticated user can see everything");
                Ok(PermissionEvaluator::open(max_age))
            }
        }
    }

    pub fn auth_config(&self) -> Result<AuthConfig> {
        match self.auth_scheme.as_str() {
            "" | "none" => Ok(AuthConfig::None),
            "basic" => {
                if self.basic_auth_user.is_empty() || self.basic_auth_password.is_empty() {
                    bail!("Cannot run without Basic Auth, set a basic_auth_user and basic_auth_password");
                }
                let users = HashMap::from([(
                    self.basic_auth_user.clone(),
                    self.basic_auth_password.clone(),
                )]);
                Ok(AuthConfig::Basic {
                    realm: BASIC_REALM.to_string(),
                    users,
                })
            }
            "google" => Ok(AuthConfig::Google(GoogleConfig {
                client_id: self.google_client_id.clone(),
                client_secret: self.google_client_secret.clone(),
                public_host: self.public_host.clone(),
                allow_unencrypted_traffic: self.allow_unencrypted_traffic(),
                session_ttl: seconds_or(
                    self.session_ttl_secs,
                    DEFAULT_SESSION_TTL_SECS,
                    "session_ttl_secs",
                )?,
            })),
            other => bail!("Unknown auth scheme {}", other),
        }
    }

    fn media_source(&self) -> Result<HttpMediaSource> {
        if self.twilio_account_sid.is_empty() || self.twilio_auth_token.is_empty() {
            warn!("No twilio_account_sid or twilio_auth_token configured, media requests will fail");
        }
        let base_url = if self.upstream_base_url.is_empty() {
            DEFAULT_UPSTREAM_BASE_URL
        } else {
            self.upstream_base_url.as_str()
        };
        HttpMediaSource::new(
            base_url,
            self.twilio_account_sid.clone(),
            self.twilio_auth_token.clone(),
            Duration::seconds(UPSTREAM_TIMEOUT_SECS),
        )
        .map_err(|e| anyhow!("Couldn't create the upstream media client: {}", e))
    }

    /// Validates every setting and assembles the application state.
    pub fn build(&self) -> Result<Runtime> {
        let key = SecretKey::provision(&self.secret_key).context("Invalid secret_key")?;
        let signer = UrlSigner::new(Arc::new(key))?;

        let evaluator = self.evaluator()?;
        let authenticator = build_authenticator(self.auth_config()?, signer.clone())?;
        let settings = self.settings()?;
        let media = self.media_source()?;
        let reporter = get_reporter(&self.error_reporter);

        info!(
            "Configuration loaded: port {}, unencrypted traffic {}, error reporter {}",
            self.port(),
            settings.allow_unencrypted_traffic,
            reporter.name()
        );

        Ok(Runtime {
            state: AppState {
                evaluator: Arc::new(evaluator),
                signer,
                authenticator,
                media: Arc::new(media),
                reporter,
                settings: Arc::new(settings),
            },
            server: ServerConfig::new().with_port(self.port()),
        })
    }
}
