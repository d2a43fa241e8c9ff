//! Policy engine for teleview.
//!
//! This crate decides what an authenticated principal may see. It owns:
//!
//! - the static access-control [`Policy`]: an ordered list of groups, parsed
//!   from YAML and validated once at startup,
//! - the [`PermissionEvaluator`], which turns a principal id into a [`User`]
//!   carrying a capability set and a resource-age ceiling,
//! - the [`ResourceAgeGate`], which hides records older than that ceiling.
//!
//! # Authorization Flow
//!
//! 1. An authenticator resolves the request to a principal id
//! 2. [`PermissionEvaluator::lookup`] resolves the id to a [`User`]
//! 3. Handlers call [`Permission::require`] for the capability they expose
//! 4. Handlers run [`ResourceAgeGate::check`] on the record's timestamp
//!
//! Steps 3 and 4 fail with different errors so the caller can tell a missing
//! capability from a record that is simply too old.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use authz::{Capability, Policy, PermissionEvaluator};
//! use chrono::Duration;
//!
//! let policy = Policy::parse_and_validate(r#"
//! - name: admins
//!   users: [alice]
//!   permissions:
//!     view_media: true
//! - name: guests
//!   default: true
//!   permissions:
//!     view_media: false
//! "#).unwrap();
//!
//! let evaluator = PermissionEvaluator::new(Arc::new(policy), Duration::days(30));
//! let alice = evaluator.lookup("alice").unwrap();
//! assert!(alice.found && alice.can(Capability::ViewMedia));
//!
//! let carol = evaluator.lookup("carol").unwrap();
//! assert!(!carol.found && !carol.can(Capability::ViewMedia));
//! ```

pub mod age;
pub mod error;
pub mod evaluator;
pub mod policy;
pub mod types;

pub use age::ResourceAgeGate;
pub use error::{AuthzError, Result};
pub use evaluator::PermissionEvaluator;
pub use policy::{Group, Policy};
pub use types::{Capabilities, Capability, Permission, Principal, User};

/// Viewable age ceiling when the configuration does not set one: 30 days.
pub const DEFAULT_MAX_RESOURCE_AGE_SECS: i64 = 30 * 24 * 60 * 60;
