//! Resolves principal ids to users against a validated policy.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use crate::error::{AuthzError, Result};
use crate::policy::{Group, Policy};
use crate::types::{Capabilities, Permission, User};

/// Maps principal ids to their effective permission.
///
/// The policy is shared read-only; the evaluator holds no other state, so a
/// single instance serves every request.
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    policy: Arc<Policy>,
    default_max_age: Duration,
}

impl PermissionEvaluator {
    /// Creates an evaluator over a policy that has already passed
    /// [`Policy::validate`].
    pub fn new(policy: Arc<Policy>, default_max_age: Duration) -> Self {
        Self {
            policy,
            default_max_age,
        }
    }

    /// Evaluator for deployments without a configured policy: every principal
    /// falls into a single default group holding every capability.
    pub fn open(default_max_age: Duration) -> Self {
        let group = Group::new("default", Capabilities::all()).as_default();
        Self::new(Arc::new(Policy::new(vec![group])), default_max_age)
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    fn user_from(&self, id: &str, group: &Group, found: bool) -> User {
        let ceiling = Duration::seconds(group.max_resource_age_secs.min(u64::from(u32::MAX)) as i64);
        User {
            id: id.to_string(),
            permission: Permission::new(group.permissions.clone(), ceiling, self.default_max_age),
            found,
        }
    }

    /// Finds the user with the given id.
    ///
    /// Groups are scanned in declared order and the first one listing `id`
    /// wins (`found == true`). Otherwise the default group, if any, grants
    /// access with `found == false`. Assumes the policy is valid.
    pub fn lookup(&self, id: &str) -> Result<User> {
        let mut default_group = None;
        for group in self.policy.groups() {
            if group.contains(id) {
                debug!("Principal {} matched group {}", id, group.name);
                return Ok(self.user_from(id, group, true));
            }
            if group.default && default_group.is_none() {
                default_group = Some(group);
            }
        }

        match default_group {
            Some(group) => {
                debug!("Principal {} resolved via default group {}", id, group.name);
                Ok(self.user_from(id, group, false))
            }
            None => Err(AuthzError::LookupNotFound(id.to_string())),
        }
    }

    /// Every directly listed user, keyed by id. Assumes the policy is valid.
    pub fn users(&self) -> HashMap<String, User> {
        let mut users = HashMap::new();
        for group in self.policy.groups() {
            for id in &group.users {
                users.insert(id.clone(), self.user_from(id, group, true));
            }
        }
        users
    }
}
