use chrono::{DateTime, Utc};
use mercat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{PermissionId, UserId};

/// Unique identifier for a grant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(Uuid);

impl GrantId {
    /// Creates a new random grant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a grant identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for GrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GrantId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// The specific resource instance a scoped grant restricts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(i64);

impl TargetId {
    /// Creates a target identifier from its stored value.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the stored value.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Target restriction of a grant.
///
/// A global scope is stored as a NULL target and applies to every instance
/// of the resource the permission covers; a target scope restricts the
/// grant to one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantScope {
    /// Applies to every target of the permission's resource type.
    Global,
    /// Applies to one specific target instance.
    Target(TargetId),
}

impl GrantScope {
    /// Builds a scope from the stored nullable target column.
    #[must_use]
    pub fn from_target_id(value: Option<i64>) -> Self {
        match value {
            None => Self::Global,
            Some(target) => Self::Target(TargetId::new(target)),
        }
    }

    /// Returns the stored nullable target column value.
    #[must_use]
    pub fn as_target_id(&self) -> Option<i64> {
        match self {
            Self::Global => None,
            Self::Target(target) => Some(target.as_i64()),
        }
    }

    /// Returns whether the scope applies to every target.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    /// Parses the transport form of a target.
    ///
    /// The literal `"all"` selects the global scope; anything else must be
    /// a decimal target id.
    pub fn parse_target(value: &str) -> AppResult<Self> {
        if value == "all" {
            return Ok(Self::Global);
        }

        value
            .parse::<i64>()
            .map(|target| Self::Target(TargetId::new(target)))
            .map_err(|_| AppError::Validation(format!("invalid target '{value}'")))
    }
}

/// One stored rule binding a user to a permission.
///
/// Inactive grants are invisible to evaluation; an active denied grant is an
/// explicit negative override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Stable grant identifier.
    pub id: GrantId,
    /// Owning user.
    pub user_id: UserId,
    /// Granted permission.
    pub permission_id: PermissionId,
    /// Whether the grant participates in evaluation.
    pub is_active: bool,
    /// Whether the grant denies instead of allows.
    pub is_denied: bool,
    /// Target restriction.
    pub scope: GrantScope,
    /// Creation time; evaluation reads grants in creation order.
    pub created_at: DateTime<Utc>,
}

impl PermissionGrant {
    /// Creates an active, non-denied grant with the given scope.
    #[must_use]
    pub fn new(user_id: UserId, permission_id: PermissionId, scope: GrantScope) -> Self {
        Self {
            id: GrantId::new(),
            user_id,
            permission_id,
            is_active: true,
            is_denied: false,
            scope,
            created_at: Utc::now(),
        }
    }

    /// Sets the active and denied flags.
    #[must_use]
    pub fn with_flags(mut self, is_active: bool, is_denied: bool) -> Self {
        self.is_active = is_active;
        self.is_denied = is_denied;
        self
    }
}
