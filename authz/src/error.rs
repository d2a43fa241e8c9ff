//! Error types for the policy engine.
//!
//! # Security Note
//! `LookupNotFound` and `PermissionDenied` both end up as "forbidden" at the
//! HTTP layer. `ResourceTooOld` must stay a separate variant so the front end
//! can explain why an otherwise visible record is hidden.

use thiserror::Error;

/// Errors raised while loading a policy or evaluating a request against it.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The policy document is structurally invalid.
    ///
    /// Raised at startup only. The service must not begin serving.
    #[error("Invalid policy configuration: {0}")]
    Configuration(String),

    /// The policy document could not be decoded at all.
    #[error("Policy parsing failed: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The policy file could not be read.
    #[error("Policy file error: {0}")]
    Io(#[from] std::io::Error),

    /// No group lists the principal and no default group is configured.
    #[error("User {0} not found in the policy, and no default configured")]
    LookupNotFound(String),

    /// The resource is older than the caller's viewable ceiling.
    #[error("Cannot access this resource because its age exceeds the viewable limit")]
    ResourceTooOld,

    /// The caller's capability set does not include the required flag.
    #[error("You do not have permission to access that information")]
    PermissionDenied,
}

/// A specialized Result type for policy operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthzError::Configuration("Group name A appears twice in the list".into());
        assert_eq!(
            err.to_string(),
            "Invalid policy configuration: Group name A appears twice in the list"
        );

        let err = AuthzError::LookupNotFound("carol".into());
        assert_eq!(
            err.to_string(),
            "User carol not found in the policy, and no default configured"
        );

        assert_ne!(
            AuthzError::ResourceTooOld.to_string(),
            AuthzError::PermissionDenied.to_string()
        );
    }
}
