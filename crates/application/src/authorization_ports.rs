use async_trait::async_trait;
use mercat_core::AppResult;
use mercat_domain::{GrantId, GrantScope, PermissionGrant, PermissionId, UserId};

/// User record returned by repository queries.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Unique user identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Contact email address.
    pub email: String,
    /// Whether the account is enabled.
    pub is_active: bool,
}

/// Lookup port for user records owned by the platform.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Point lookup by id; `None` when the id is unknown.
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<UserRecord>>;
}

/// Persistence port for per-user grant rows.
#[async_trait]
pub trait GrantRepository: Send + Sync {
    /// Bulk-inserts grant rows.
    ///
    /// A row colliding with an existing `(user, permission, target)` key
    /// updates that row's flags instead of duplicating it; the key is the
    /// uniqueness backstop for racing assignments.
    async fn insert_many(&self, grants: Vec<PermissionGrant>) -> AppResult<()>;

    /// Persists one changed grant row.
    async fn update_one(&self, grant: &PermissionGrant) -> AppResult<()>;

    /// Bulk-deletes grant rows by id.
    async fn delete_many(&self, ids: Vec<GrantId>) -> AppResult<()>;

    /// Returns every grant row for the user, in creation order.
    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<PermissionGrant>>;

    /// Returns the grant for a `(user, permission)` pair, if one exists.
    async fn find_by_user_and_permission(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<PermissionGrant>>;

    /// Returns every target-scoped variant for a permission name.
    ///
    /// Ordered by creation time ascending with the row id as tie-break;
    /// evaluation depends on this order being stable.
    async fn list_by_user_and_permission_name(
        &self,
        user_id: UserId,
        permission_name: &str,
    ) -> AppResult<Vec<PermissionGrant>>;
}

/// One entry of a bulk grant assignment.
#[derive(Debug, Clone)]
pub struct GrantSpec {
    /// Permission name the entry refers to.
    pub permission: String,
    /// Whether the grant participates in evaluation.
    pub is_active: bool,
    /// Whether the grant denies instead of allows.
    pub is_denied: bool,
    /// Target restriction; `None` means the caller omitted the mandatory
    /// target and fails the batch.
    pub scope: Option<GrantScope>,
}

impl GrantSpec {
    /// Creates an active, non-denied assignment entry.
    #[must_use]
    pub fn new(permission: impl Into<String>, scope: GrantScope) -> Self {
        Self {
            permission: permission.into(),
            is_active: true,
            is_denied: false,
            scope: Some(scope),
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

/// One entry of a bulk grant update; absent flags keep stored values.
#[derive(Debug, Clone)]
pub struct GrantPatch {
    /// Permission name the entry refers to.
    pub permission: String,
    /// New active flag, if changing.
    pub is_active: Option<bool>,
    /// New denied flag, if changing.
    pub is_denied: Option<bool>,
    /// Replacement target restriction; mandatory on every update entry.
    pub scope: Option<GrantScope>,
}

impl GrantPatch {
    /// Creates an update entry that only replaces the scope.
    #[must_use]
    pub fn new(permission: impl Into<String>, scope: GrantScope) -> Self {
        Self {
            permission: permission.into(),
            is_active: None,
            is_denied: None,
            scope: Some(scope),
        }
    }
}

/// Per-entry outcome of a batch grant operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantChange {
    /// Permission name the entry referred to.
    pub permission: String,
    /// What happened to the entry.
    pub status: GrantChangeStatus,
}

/// What happened to one batch entry.
///
/// Skips are reported rather than silently dropped so callers no longer
/// have to diff their input against the result to spot them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantChangeStatus {
    /// The entry was persisted.
    Applied,
    /// The named permission does not exist; the entry was ignored.
    SkippedUnknownPermission,
    /// No grant exists for the `(user, permission)` pair.
    MissingGrant,
}
