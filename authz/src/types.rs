//! Core authorization types: principals, capabilities and resolved permissions.
//!
//! # Security Considerations
//!
//! - Principals must come from an authenticator, never from request input.
//! - A capability set that is present in configuration but silent about a
//!   flag denies that flag. Only a wholly omitted set grants everything.
//! - A zero age ceiling means "use the process default", never "unlimited".

use std::collections::BTreeMap;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, Result};

/// The authenticated identity making a request.
///
/// For Basic auth this is the username, for Google OAuth the verified email
/// address, and for unauthenticated deployments the fixed anonymous id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// The identifier policy groups list as members.
    pub id: String,
}

impl Principal {
    pub const ANONYMOUS_ID: &'static str = "anonymous";

    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The principal used when authentication is disabled.
    pub fn anonymous() -> Self {
        Self::new(Self::ANONYMOUS_ID)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// A named flag gating visibility of one piece of call or message data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewNumMedia,
    ViewMessages,
    ViewMessageFrom,
    ViewMessageTo,
    ViewMessageBody,
    ViewMessagePrice,
    ViewMedia,
    ViewCalls,
    ViewCallFrom,
    ViewCallTo,
    ViewCallPrice,
    ViewNumRecordings,
    PlayRecordings,
    ViewConferences,
}

impl Capability {
    pub const ALL: [Capability; 14] = [
        Capability::ViewNumMedia,
        Capability::ViewMessages,
        Capability::ViewMessageFrom,
        Capability::ViewMessageTo,
        Capability::ViewMessageBody,
        Capability::ViewMessagePrice,
        Capability::ViewMedia,
        Capability::ViewCalls,
        Capability::ViewCallFrom,
        Capability::ViewCallTo,
        Capability::ViewCallPrice,
        Capability::ViewNumRecordings,
        Capability::PlayRecordings,
        Capability::ViewConferences,
    ];

    /// The configuration name of the flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewNumMedia => "view_num_media",
            Capability::ViewMessages => "view_messages",
            Capability::ViewMessageFrom => "view_message_from",
            Capability::ViewMessageTo => "view_message_to",
            Capability::ViewMessageBody => "view_message_body",
            Capability::ViewMessagePrice => "view_message_price",
            Capability::ViewMedia => "view_media",
            Capability::ViewCalls => "view_calls",
            Capability::ViewCallFrom => "view_call_from",
            Capability::ViewCallTo => "view_call_to",
            Capability::ViewCallPrice => "view_call_price",
            Capability::ViewNumRecordings => "view_num_recordings",
            Capability::PlayRecordings => "play_recordings",
            Capability::ViewConferences => "view_conferences",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capability set as configured on a policy group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(BTreeMap<Capability, bool>);

impl Capabilities {
    /// Every capability granted. Used for groups that omit `permissions`.
    pub fn all() -> Self {
        Capability::ALL.iter().map(|c| (*c, true)).collect()
    }

    /// Every capability explicitly denied.
    pub fn none() -> Self {
        Capability::ALL.iter().map(|c| (*c, false)).collect()
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.0.get(&capability).copied().unwrap_or(false)
    }

    pub fn with(mut self, capability: Capability, value: bool) -> Self {
        self.0.insert(capability, value);
        self
    }

    /// Every known capability with its effective value, unset flags as false.
    pub fn resolved(&self) -> BTreeMap<Capability, bool> {
        Capability::ALL
            .iter()
            .map(|c| (*c, self.allows(*c)))
            .collect()
    }
}

impl FromIterator<(Capability, bool)> for Capabilities {
    fn from_iter<I: IntoIterator<Item = (Capability, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A resolved capability set plus the maximum age of viewable resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    capabilities: Capabilities,
    max_resource_age: Duration,
}

impl Permission {
    /// Builds a permission. A zero or negative `max_resource_age` falls back
    /// to `default_age`.
    pub fn new(capabilities: Capabilities, max_resource_age: Duration, default_age: Duration) -> Self {
        let max_resource_age = if max_resource_age <= Duration::zero() {
            default_age
        } else {
            max_resource_age
        };
        Self {
            capabilities,
            max_resource_age,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn max_resource_age(&self) -> Duration {
        self.max_resource_age
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.capabilities.allows(capability)
    }

    /// Fails with `PermissionDenied` unless the capability is granted.
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.allows(capability) {
            Ok(())
        } else {
            Err(AuthzError::PermissionDenied)
        }
    }
}

/// An immutable view of a principal resolved against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub permission: Permission,
    /// True when a group lists the id directly, false when the default group
    /// granted access.
    pub found: bool,
}

impl User {
    pub fn can(&self, capability: Capability) -> bool {
        self.permission.allows(capability)
    }
}
