//! Static access-control policy: parsing and validation.
//!
//! A policy document is an ordered list of groups, either bare or nested
//! under a single `policy:` key:
//!
//! ```yaml
//! policy:
//!   - name: admins
//!     users: [alice]
//!     permissions:
//!       view_media: true
//!   - name: guests
//!     default: true
//!     permissions:
//!       view_media: false
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, info};

use crate::error::{AuthzError, Result};
use crate::types::Capabilities;

/// A named set of principals sharing one capability profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub default: bool,
    pub users: Vec<String>,
    pub permissions: Capabilities,
    /// Viewable age ceiling for members, in seconds. Zero means the process
    /// default applies.
    pub max_resource_age_secs: u64,
}

impl Group {
    pub fn new(name: impl Into<String>, permissions: Capabilities) -> Self {
        Self {
            name: name.into(),
            default: false,
            users: Vec::new(),
            permissions,
            max_resource_age_secs: 0,
        }
    }

    pub fn with_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users = users.into_iter().map(Into::into).collect();
        self
    }

    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.users.iter().any(|user| user == id)
    }
}

/// Group as it appears on disk, before omitted permissions are filled in.
#[derive(Debug, Deserialize)]
struct GroupEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    default: bool,
    #[serde(default)]
    users: Vec<String>,
    #[serde(default)]
    permissions: Option<Capabilities>,
    #[serde(default)]
    max_resource_age_secs: u64,
}

impl From<GroupEntry> for Group {
    fn from(entry: GroupEntry) -> Self {
        Self {
            name: entry.name,
            default: entry.default,
            users: entry.users,
            permissions: entry.permissions.unwrap_or_else(Capabilities::all),
            max_resource_age_secs: entry.max_resource_age_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PolicyWrapper {
    #[serde(default)]
    policy: Option<Vec<GroupEntry>>,
}

/// An ordered sequence of groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Policy {
    groups: Vec<Group>,
}

impl Policy {
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn default_group(&self) -> Option<&Group> {
        self.groups.iter().find(|group| group.default)
    }

    /// Decodes a policy from a YAML document.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(source)?;
        Self::from_value(value)
    }

    /// Decodes a policy from an already-parsed YAML value.
    ///
    /// The wrapper shape wins when it is present and non-empty; anything else
    /// is decoded as a bare list. Groups without `permissions` get every
    /// capability.
    pub fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }

        if let Ok(PolicyWrapper {
            policy: Some(entries),
        }) = serde_yaml::from_value::<PolicyWrapper>(value.clone())
        {
            if !entries.is_empty() {
                debug!("Decoded policy from wrapper with {} groups", entries.len());
                return Ok(Self::from_entries(entries));
            }
        }

        let entries: Vec<GroupEntry> = serde_yaml::from_value(value)?;
        debug!("Decoded policy from bare list with {} groups", entries.len());
        Ok(Self::from_entries(entries))
    }

    fn from_entries(entries: Vec<GroupEntry>) -> Self {
        Self::new(entries.into_iter().map(Group::from).collect())
    }

    /// Decodes and validates in one step, as startup does.
    pub fn parse_and_validate(source: &str) -> Result<Self> {
        let policy = Self::from_yaml_str(source)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Reads, decodes and validates a standalone policy file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let policy = Self::parse_and_validate(&source)?;
        info!(
            "Loaded policy with {} groups from {}",
            policy.groups.len(),
            path.display()
        );
        Ok(policy)
    }

    /// Checks structural invariants. Never mutates the policy.
    ///
    /// - every group has a name
    /// - group names are unique
    /// - a principal appears in at most one group
    /// - at most one group is the default
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut users = HashSet::new();
        let mut default_count = 0;

        for group in &self.groups {
            if group.name.is_empty() {
                return Err(AuthzError::Configuration(
                    "Group has no name, define a group name".to_string(),
                ));
            }
            if !names.insert(group.name.as_str()) {
                return Err(AuthzError::Configuration(format!(
                    "Group name {} appears twice in the list",
                    group.name
                )));
            }
            if group.default {
                default_count += 1;
                if default_count > 1 {
                    return Err(AuthzError::Configuration(
                        "More than one group marked as default".to_string(),
                    ));
                }
            }
            for user in &group.users {
                if !users.insert(user.as_str()) {
                    return Err(AuthzError::Configuration(format!(
                        "User {} appears twice in the list",
                        user
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Capability;
    use std::io::Write;

    const WRAPPED: &str = r#"
policy:
  - name: admins
    users: [alice]
    permissions:
      view_media: true
  - name: guests
    default: true
    users: []
    permissions:
      view_media: false
"#;

    const BARE: &str = r#"
- name: admins
  users: [alice]
  permissions:
    view_media: true
- name: guests
  default: true
  users: []
  permissions:
    view_media: false
"#;

    fn config_error(result: Result<()>) -> String {
        match result {
            Err(AuthzError::Configuration(msg)) => msg,
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrapper_and_bare_shapes_agree() {
        let wrapped = Policy::from_yaml_str(WRAPPED).unwrap();
        let bare = Policy::from_yaml_str(BARE).unwrap();
        assert_eq!(wrapped, bare);
        assert_eq!(wrapped.groups().len(), 2);
        assert_eq!(wrapped.groups()[0].name, "admins");
        assert_eq!(wrapped.default_group().unwrap().name, "guests");
    }

    #[test]
    fn test_empty_wrapper_is_not_preferred() {
        // An empty wrapper is not preferred, and a mapping is not a bare list.
        let result = Policy::from_yaml_str("policy: []");
        assert!(matches!(result, Err(AuthzError::Parse(_))));

        let policy = Policy::from_yaml_str("").unwrap();
        assert!(policy.is_empty());
    }

    #[test]
    fn test_omitted_permissions_grant_everything() {
        let policy = Policy::from_yaml_str("- name: everyone\n  users: [bob]\n").unwrap();
        assert_eq!(policy.groups()[0].permissions, Capabilities::all());

        let policy = Policy::from_yaml_str("policy:\n  - name: everyone\n    default: true\n").unwrap();
        assert_eq!(policy.groups()[0].permissions, Capabilities::all());
    }

    #[test]
    fn test_explicit_permissions_are_kept() {
        let policy = Policy::from_yaml_str(BARE).unwrap();
        let guests = &policy.groups()[1];
        assert!(!guests.permissions.allows(Capability::ViewMedia));
        assert!(!guests.permissions.allows(Capability::ViewCalls));
    }

    #[test]
    fn test_valid_policy_accepted() {
        assert!(Policy::parse_and_validate(WRAPPED).is_ok());
        assert!(Policy::default().validate().is_ok());

        let no_default = Policy::new(vec![
            Group::new("a", Capabilities::all()).with_users(["alice"]),
            Group::new("b", Capabilities::all()).with_users(["bob"]),
        ]);
        assert!(no_default.validate().is_ok());
    }

    #[test]
    fn test_unnamed_group_rejected() {
        let policy = Policy::from_yaml_str("- users: [alice]\n").unwrap();
        assert!(config_error(policy.validate()).contains("no name"));
    }

    #[test]
    fn test_duplicate_group_name_rejected() {
        let policy = Policy::new(vec![
            Group::new("A", Capabilities::all()),
            Group::new("A", Capabilities::none()),
        ]);
        assert!(config_error(policy.validate()).contains("Group name A"));
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let policy = Policy::new(vec![
            Group::new("A", Capabilities::all()).with_users(["bob"]),
            Group::new("B", Capabilities::all()).with_users(["carol", "bob"]),
        ]);
        assert!(config_error(policy.validate()).contains("User bob"));
    }

    #[test]
    fn test_two_defaults_rejected() {
        let policy = Policy::new(vec![
            Group::new("A", Capabilities::all()).as_default(),
            Group::new("B", Capabilities::all()).as_default(),
        ]);
        assert!(config_error(policy.validate()).contains("default"));
    }

    #[test]
    fn test_validation_does_not_mutate() {
        let policy = Policy::from_yaml_str(WRAPPED).unwrap();
        let before = policy.clone();
        policy.validate().unwrap();
        assert_eq!(policy, before);
    }

    #[test]
    fn test_unknown_capability_is_parse_error() {
        let result = Policy::from_yaml_str("- name: a\n  permissions:\n    view_secrets: true\n");
        assert!(matches!(result, Err(AuthzError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(WRAPPED.as_bytes()).unwrap();

        let policy = Policy::load(file.path()).unwrap();
        assert_eq!(policy.groups().len(), 2);

        let missing = Policy::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(AuthzError::Io(_))));
    }
}
