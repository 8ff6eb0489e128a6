use async_trait::async_trait;
use mercat_core::{AppResult, NonEmptyString};
use mercat_domain::{Permission, PermissionId};

/// Input payload for creating one permission row.
#[derive(Debug, Clone)]
pub struct NewPermission {
    /// Unique permission name.
    pub name: NonEmptyString,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Whether provisioning flows grant this permission by default.
    pub default_granted: bool,
}

/// Partial update for a permission row; absent fields stay unchanged.
#[derive(Debug, Clone, Default)]
pub struct PermissionUpdate {
    /// New unique name, if renaming.
    pub name: Option<String>,
    /// New description, if replacing.
    pub description: Option<String>,
}

/// Summary of one registry reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Names created because they were missing from storage.
    pub created: Vec<String>,
    /// Names removed because they left the canonical set.
    pub removed: Vec<String>,
}

impl ReconcileOutcome {
    /// Returns whether the run performed no writes.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty()
    }
}

/// Persistence port for permission definitions.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Point lookup by id; `None` when the id is unknown.
    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>>;

    /// Point lookup by unique name; `None` when the name is unknown.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Permission>>;

    /// Returns every persisted permission.
    async fn list_all(&self) -> AppResult<Vec<Permission>>;

    /// Inserts one permission row and returns it.
    async fn insert(&self, permission: NewPermission) -> AppResult<Permission>;

    /// Persists changed fields of an existing permission row.
    async fn update_one(&self, permission: &Permission) -> AppResult<()>;

    /// Deletes one permission row.
    async fn delete(&self, id: PermissionId) -> AppResult<()>;

    /// Applies a reconciliation diff as one logical unit.
    ///
    /// Implementations that can wrap the writes in a transaction must do so;
    /// ones that cannot must surface a mid-diff failure to the caller rather
    /// than swallowing it, since partial application is then possible.
    async fn apply_reconciliation(
        &self,
        additions: Vec<NewPermission>,
        removals: Vec<PermissionId>,
    ) -> AppResult<()>;
}
