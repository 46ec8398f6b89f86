//! Registered external applications.

use serde::{Deserialize, Serialize};

use signon_core::{ApplicationId, DomainError, DomainResult, Entity};

use crate::Permission;

/// How to tell an application to drop a user's access.
///
/// The redirect URI is stored exactly as registered. The application's base
/// URL (scheme, host and port) is derived from it when a revocation call is
/// made; a URI that cannot be parsed surfaces as a failed revocation for that
/// application only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationContract {
    pub redirect_uri: String,
    /// Sent as a bearer token on revocation calls, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl RevocationContract {
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

/// An external application users may be granted access to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub name: String,
    pub contract: RevocationContract,
    #[serde(default)]
    pub supported_permissions: Vec<Permission>,
}

impl Application {
    pub fn new(
        id: ApplicationId,
        name: impl Into<String>,
        contract: RevocationContract,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("application name cannot be empty"));
        }

        Ok(Self {
            id,
            name: name.trim().to_string(),
            contract,
            supported_permissions: Vec::new(),
        })
    }

    pub fn with_supported_permission(mut self, permission: Permission) -> Self {
        if !self.supported_permissions.contains(&permission) {
            self.supported_permissions.push(permission);
        }
        self
    }

    /// Permissions every application supports.
    pub fn default_permission_strings() -> &'static [&'static str] {
        &["signin"]
    }

    /// The defaults followed by this application's own permissions, sorted by name.
    pub fn supported_permission_strings(&self) -> Vec<String> {
        let mut own: Vec<&str> = self
            .supported_permissions
            .iter()
            .map(Permission::as_str)
            .collect();
        own.sort_unstable();

        Self::default_permission_strings()
            .iter()
            .copied()
            .chain(own)
            .map(str::to_string)
            .collect()
    }
}

impl Entity for Application {
    type Id = ApplicationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl core::fmt::Display for Application {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}
