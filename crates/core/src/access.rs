//! Role-based access policy.
//!
//! Every service operation names the [`Permission`] it needs and asks the
//! caller's [`Actor`] to satisfy it. The identity is always an explicit value
//! handed in by the transport layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ParseEnumError;
use crate::model::UserId;

/// Access tier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Public,
    Junior,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Public => "public",
            Role::Junior => "junior",
            Role::Admin => "admin",
        }
    }

    /// Ordering used for visibility checks: public < junior < admin.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Role::Public => 0,
            Role::Junior => 1,
            Role::Admin => 2,
        }
    }

    /// Returns true when content tagged `visibility` may be shown to this role.
    #[must_use]
    pub fn can_see(self, visibility: Role) -> bool {
        self.rank() >= visibility.rank()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Role::Public),
            "junior" => Ok(Role::Junior),
            "admin" => Ok(Role::Admin),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// Authenticated identity attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub role: Role,
}

impl AuthContext {
    #[must_use]
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// The caller of an operation: either nobody, or a resolved identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Actor {
    #[default]
    Anonymous,
    User(AuthContext),
}

impl Actor {
    #[must_use]
    pub fn user(user_id: UserId, role: Role) -> Self {
        Self::User(AuthContext::new(user_id, role))
    }

    /// Effective role for read filtering. Anonymous callers read as public.
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Actor::Anonymous => Role::Public,
            Actor::User(ctx) => ctx.role,
        }
    }

    #[must_use]
    pub fn auth(&self) -> Option<&AuthContext> {
        match self {
            Actor::Anonymous => None,
            Actor::User(ctx) => Some(ctx),
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin && self.auth().is_some()
    }

    /// Checks `permission` and returns the caller's identity.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::Unauthenticated` for anonymous callers and
    /// `AccessError::Forbidden` when the caller's role is not allowed.
    pub fn require(&self, permission: Permission) -> Result<&AuthContext, AccessError> {
        let ctx = self.auth().ok_or(AccessError::Unauthenticated)?;
        if permission.allows(ctx.role) {
            Ok(ctx)
        } else {
            Err(AccessError::Forbidden(permission))
        }
    }

    /// Like [`Actor::require`] but lets anonymous callers through when the
    /// permission is open to them.
    ///
    /// # Errors
    ///
    /// Same as [`Actor::require`].
    pub fn check(&self, permission: Permission) -> Result<(), AccessError> {
        match self {
            Actor::Anonymous if permission.allows_anonymous() => Ok(()),
            _ => self.require(permission).map(|_| ()),
        }
    }
}

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadCatalog,
    ManageCatalog,
    TrackOwnProgress,
    ViewCohortProgress,
    ManageUsers,
    ViewOwnProfile,
    SubmitQuery,
    ManageQueries,
    ReadPublished,
    ManageContent,
}

impl Permission {
    #[must_use]
    pub fn allows(self, role: Role) -> bool {
        match self {
            Permission::ReadCatalog
            | Permission::ViewOwnProfile
            | Permission::SubmitQuery
            | Permission::ReadPublished => true,
            Permission::TrackOwnProgress => matches!(role, Role::Junior | Role::Admin),
            Permission::ManageCatalog
            | Permission::ViewCohortProgress
            | Permission::ManageUsers
            | Permission::ManageQueries
            | Permission::ManageContent => role == Role::Admin,
        }
    }

    #[must_use]
    pub fn allows_anonymous(self) -> bool {
        matches!(
            self,
            Permission::ReadCatalog | Permission::SubmitQuery | Permission::ReadPublished
        )
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::ReadCatalog => "read catalog",
            Permission::ManageCatalog => "manage catalog",
            Permission::TrackOwnProgress => "track progress",
            Permission::ViewCohortProgress => "view cohort progress",
            Permission::ManageUsers => "manage users",
            Permission::ViewOwnProfile => "view profile",
            Permission::SubmitQuery => "submit query",
            Permission::ManageQueries => "manage queries",
            Permission::ReadPublished => "read content",
            Permission::ManageContent => "manage content",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccessError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("not allowed to {0}")]
    Forbidden(Permission),
}
