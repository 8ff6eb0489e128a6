//! Grant management and evaluation: the decision engine for
//! "can user U exercise permission P against target T".

mod assign;
mod evaluate;
#[cfg(test)]
mod tests;
mod update;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use mercat_core::{AppError, AppResult};
use mercat_domain::{PermissionGrant, UserId};

use crate::authorization_ports::{GrantRepository, UserRecord, UserRepository};
use crate::registry_ports::PermissionRepository;

/// Application service for per-user permission grants.
///
/// Stateless between calls; every operation re-reads the stores so
/// decisions are always made against fresh state.
#[derive(Clone)]
pub struct AuthorizationService {
    users: Arc<dyn UserRepository>,
    permissions: Arc<dyn PermissionRepository>,
    grants: Arc<dyn GrantRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service from repository implementations.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        permissions: Arc<dyn PermissionRepository>,
        grants: Arc<dyn GrantRepository>,
    ) -> Self {
        Self {
            users,
            permissions,
            grants,
        }
    }

    /// Returns every grant row for the user, active or not, denied or not.
    ///
    /// A raw dump for administrative inspection; enforcement must use
    /// [`AuthorizationService::evaluate`].
    pub async fn list_grants_for_user(&self, user_id: UserId) -> AppResult<Vec<PermissionGrant>> {
        self.require_user(user_id).await?;
        self.grants.list_for_user(user_id).await
    }

    /// Returns the distinct permission names referenced by the user's
    /// grants, sorted, regardless of active or denied state.
    ///
    /// Grants whose permission row no longer exists are skipped.
    pub async fn list_permission_names_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<String>> {
        self.require_user(user_id).await?;
        let grants = self.grants.list_for_user(user_id).await?;

        let mut seen = HashSet::new();
        let mut names = BTreeSet::new();
        for grant in grants {
            if !seen.insert(grant.permission_id) {
                continue;
            }
            if let Some(permission) = self.permissions.find_by_id(grant.permission_id).await? {
                names.insert(permission.name);
            }
        }

        Ok(names.into_iter().collect())
    }

    async fn require_user(&self, user_id: UserId) -> AppResult<UserRecord> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))
    }
}
