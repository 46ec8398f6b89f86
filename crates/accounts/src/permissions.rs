use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use signon_core::{ApplicationId, ValueObject};

/// Permission name within one application (e.g. "signin").
///
/// Permissions are opaque strings; only the owning application interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// Granted to every user who may sign in to an application.
    pub const SIGNIN: Permission = Permission(Cow::Borrowed("signin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Permission {}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The permissions one user holds on one application.
///
/// There is at most one grant per (user, application); the owning user keeps
/// its grants, so the user side of the relation is implicit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub application_id: ApplicationId,
    permissions: Vec<Permission>,
}

impl PermissionGrant {
    pub fn new(application_id: ApplicationId) -> Self {
        Self {
            application_id,
            permissions: Vec::new(),
        }
    }

    /// Permissions in the order they were granted.
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Adds a permission. Returns `false` if it was already held.
    pub fn insert(&mut self, permission: Permission) -> bool {
        if self.contains(&permission) {
            return false;
        }
        self.permissions.push(permission);
        true
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut grant = PermissionGrant::new(ApplicationId::new());
        assert!(grant.insert(Permission::SIGNIN));
        assert!(!grant.insert(Permission::new("signin")));
        assert_eq!(grant.permissions(), &[Permission::SIGNIN]);
    }

    #[test]
    fn permissions_keep_grant_order() {
        let mut grant = PermissionGrant::new(ApplicationId::new());
        grant.insert(Permission::new("Delete publications"));
        grant.insert(Permission::new("Create publications"));

        let names: Vec<&str> = grant.permissions().iter().map(Permission::as_str).collect();
        assert_eq!(names, ["Delete publications", "Create publications"]);
    }

    proptest! {
        #[test]
        fn grant_holds_each_name_once_in_first_seen_order(names in prop::collection::vec("[a-c]{1,2}", 0..16)) {
            let mut grant = PermissionGrant::new(ApplicationId::new());
            for name in &names {
                grant.insert(Permission::new(name.clone()));
            }

            let mut expected: Vec<&str> = Vec::new();
            for name in &names {
                if !expected.contains(&name.as_str()) {
                    expected.push(name);
                }
            }
            let held: Vec<&str> = grant.permissions().iter().map(Permission::as_str).collect();
            prop_assert_eq!(held, expected);
        }
    }
}
