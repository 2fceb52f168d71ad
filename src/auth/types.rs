//! Identity, role and permission types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Action a route or handler can demand of the principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read one's own profile
    ViewProfile,
    /// List every account (admin dashboard)
    ListUsers,
}

/// Role attached to an identity. Closed set; role names are unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::User, Role::Admin];

    /// Role given to self-registered accounts that do not ask for one.
    pub const DEFAULT: Role = Role::User;

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Admin => "ROLE_ADMIN",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == name)
    }

    /// Actions this role is allowed to perform.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::User => &[Permission::ViewProfile],
            Role::Admin => &[Permission::ViewProfile, Permission::ListUsers],
        }
    }

    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user record as resolved by the directory. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Directory row ID
    pub id: i64,
    /// Stable subject key (email); the token `sub`
    pub subject: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: BTreeSet<Role>,
    pub enabled: bool,
    /// Lock state reported by the directory
    pub locked: bool,
}

impl Identity {
    /// Whether this identity may be bound to a request at all.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.locked
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.roles.iter().any(|role| role.grants(permission))
    }
}

/// Public view of an identity, as returned by the profile, admin and
/// introspection endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub enabled: bool,
}

impl From<&Identity> for UserProfile {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            username: identity.username.clone(),
            email: identity.subject.clone(),
            roles: identity.roles.iter().copied().collect(),
            enabled: identity.enabled,
        }
    }
}
