//! Authentication and signed-URL support for teleview.
//!
//! - [`key`]: provisioning of the process-wide 32-byte secret key
//! - [`signer`]: HMAC-SHA256 signing of resource references and expiries
//! - [`session`]: stateless session cookies built on the signer
//! - [`authenticator`]: the Noop / Basic / Google authenticators

pub mod authenticator;
pub mod error;
pub mod key;
pub mod session;
pub mod signer;

pub use authenticator::{
    build_authenticator, AuthConfig, AuthScheme, Authenticator, BasicAuthenticator, Challenge,
    GoogleAuthenticator, GoogleConfig, NoopAuthenticator,
};
pub use error::{AuthError, Result, SecretKeyError};
pub use key::{KeySource, SecretKey};
pub use session::{SessionConfig, SessionManager, SESSION_COOKIE_NAME};
pub use signer::{SignedToken, UrlSigner};
