//! Age ceiling enforcement, applied on top of capability checks.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{AuthzError, Result};
use crate::types::Permission;

/// Rejects resources created before `now - permission.max_resource_age()`.
pub struct ResourceAgeGate;

impl ResourceAgeGate {
    pub fn check(created: DateTime<Utc>, permission: &Permission, now: DateTime<Utc>) -> Result<()> {
        let oldest_viewable = now - permission.max_resource_age();
        if created < oldest_viewable {
            debug!(
                "Resource created at {} is older than the viewable limit {}",
                created, oldest_viewable
            );
            return Err(AuthzError::ResourceTooOld);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Capabilities, Capability};
    use chrono::Duration;

    fn permission(days: i64) -> Permission {
        Permission::new(Capabilities::all(), Duration::days(days), Duration::days(365))
    }

    #[test]
    fn test_recent_resource_allowed() {
        let now = Utc::now();
        assert!(ResourceAgeGate::check(now - Duration::days(2), &permission(7), now).is_ok());
        assert!(ResourceAgeGate::check(now, &permission(7), now).is_ok());
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let now = Utc::now();
        assert!(ResourceAgeGate::check(now - Duration::days(7), &permission(7), now).is_ok());
    }

    #[test]
    fn test_old_resource_rejected_despite_capabilities() {
        let now = Utc::now();
        let permission = permission(7);
        assert!(permission.allows(Capability::ViewMedia));

        let result = ResourceAgeGate::check(now - Duration::days(8), &permission, now);
        assert!(matches!(result, Err(AuthzError::ResourceTooOld)));
    }

    #[test]
    fn test_zero_ceiling_is_not_unlimited() {
        let now = Utc::now();
        let permission = Permission::new(Capabilities::all(), Duration::zero(), Duration::days(30));
        let result = ResourceAgeGate::check(now - Duration::days(31), &permission, now);
        assert!(matches!(result, Err(AuthzError::ResourceTooOld)));
    }
}
