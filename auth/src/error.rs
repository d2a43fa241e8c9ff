use thiserror::Error;

/// Secret key provisioning failures. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum SecretKeyError {
    #[error("Secret key has wrong length. Should be a 64-byte hex string, got {0} characters")]
    WrongLength(usize),

    #[error("Secret key is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid secret key (must initialize some bytes)")]
    AllZero,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Secret key error: {0}")]
    SecretKey(#[from] SecretKeyError),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Signed token has expired")]
    Expired,

    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Session is missing or invalid")]
    SessionInvalid,

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// True when a signed value was presented but did not verify.
    pub fn is_signature_failure(&self) -> bool {
        matches!(self, AuthError::SignatureInvalid | AuthError::Expired)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::Provider("identity provider timed out".to_string())
        } else {
            AuthError::Provider(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
