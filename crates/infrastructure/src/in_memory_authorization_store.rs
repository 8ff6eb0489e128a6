use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use mercat_application::{
    GrantRepository, NewPermission, PermissionRepository, UserRecord, UserRepository,
};
use mercat_core::{AppError, AppResult};
use mercat_domain::{GrantId, Permission, PermissionGrant, PermissionId, UserId};

/// In-memory implementation of the user, permission and grant ports.
///
/// One struct backs all three because grant listing by permission name
/// joins across stores. Honors the same `(user, permission, target)`
/// uniqueness and creation-order listing contracts as the PostgreSQL
/// adapters; suitable for tests and embedded composition.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
    permissions: RwLock<Vec<Permission>>,
    grants: RwLock<Vec<PermissionGrant>>,
}

impl InMemoryAuthorizationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user record for lookups.
    pub async fn add_user(&self, record: UserRecord) {
        self.users.write().await.insert(record.id, record);
    }
}

#[async_trait]
impl UserRepository for InMemoryAuthorizationStore {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<UserRecord>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl PermissionRepository for InMemoryAuthorizationStore {
    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .read()
            .await
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .read()
            .await
            .iter()
            .find(|row| row.name == name)
            .cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<Permission>> {
        let mut rows = self.permissions.read().await.clone();
        rows.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(rows)
    }

    async fn insert(&self, permission: NewPermission) -> AppResult<Permission> {
        let mut rows = self.permissions.write().await;
        if rows.iter().any(|row| row.name == permission.name.as_str()) {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.name.as_str()
            )));
        }

        let row = Permission {
            id: PermissionId::new(),
            name: permission.name.into(),
            description: permission.description,
            default_granted: permission.default_granted,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update_one(&self, permission: &Permission) -> AppResult<()> {
        let mut rows = self.permissions.write().await;
        if rows
            .iter()
            .any(|row| row.name == permission.name && row.id != permission.id)
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.name
            )));
        }

        let Some(row) = rows.iter_mut().find(|row| row.id == permission.id) else {
            return Err(AppError::NotFound(format!(
                "permission '{}' does not exist",
                permission.id
            )));
        };
        *row = permission.clone();
        Ok(())
    }

    async fn delete(&self, id: PermissionId) -> AppResult<()> {
        let mut rows = self.permissions.write().await;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        if rows.len() == before {
            return Err(AppError::NotFound(format!(
                "permission '{id}' does not exist"
            )));
        }
        Ok(())
    }

    async fn apply_reconciliation(
        &self,
        additions: Vec<NewPermission>,
        removals: Vec<PermissionId>,
    ) -> AppResult<()> {
        let mut rows = self.permissions.write().await;
        rows.retain(|row| !removals.contains(&row.id));
        for addition in additions {
            rows.push(Permission {
                id: PermissionId::new(),
                name: addition.name.into(),
                description: addition.description,
                default_granted: addition.default_granted,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GrantRepository for InMemoryAuthorizationStore {
    async fn insert_many(&self, new_grants: Vec<PermissionGrant>) -> AppResult<()> {
        let mut grants = self.grants.write().await;
        for grant in new_grants {
            if let Some(existing) = grants.iter_mut().find(|row| {
                row.user_id == grant.user_id
                    && row.permission_id == grant.permission_id
                    && row.scope == grant.scope
            }) {
                existing.is_active = grant.is_active;
                existing.is_denied = grant.is_denied;
            } else {
                grants.push(grant);
            }
        }
        Ok(())
    }

    async fn update_one(&self, grant: &PermissionGrant) -> AppResult<()> {
        let mut grants = self.grants.write().await;
        let Some(row) = grants.iter_mut().find(|row| row.id == grant.id) else {
            return Err(AppError::NotFound(format!(
                "grant '{}' does not exist",
                grant.id
            )));
        };
        *row = grant.clone();
        Ok(())
    }

    async fn delete_many(&self, ids: Vec<GrantId>) -> AppResult<()> {
        self.grants
            .write()
            .await
            .retain(|row| !ids.contains(&row.id));
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<PermissionGrant>> {
        // Rows are kept in insertion order, which is creation order.
        Ok(self
            .grants
            .read()
            .await
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_user_and_permission(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<PermissionGrant>> {
        Ok(self
            .grants
            .read()
            .await
            .iter()
            .find(|row| row.user_id == user_id && row.permission_id == permission_id)
            .cloned())
    }

    async fn list_by_user_and_permission_name(
        &self,
        user_id: UserId,
        permission_name: &str,
    ) -> AppResult<Vec<PermissionGrant>> {
        let permission_id = {
            let permissions = self.permissions.read().await;
            match permissions.iter().find(|row| row.name == permission_name) {
                Some(permission) => permission.id,
                None => return Ok(Vec::new()),
            }
        };

        Ok(self
            .grants
            .read()
            .await
            .iter()
            .filter(|row| row.user_id == user_id && row.permission_id == permission_id)
            .cloned()
            .collect())
    }
}
