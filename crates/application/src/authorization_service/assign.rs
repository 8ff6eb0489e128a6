use mercat_domain::{GrantScope, Permission};

use crate::authorization_ports::{GrantChange, GrantChangeStatus, GrantSpec};

use super::*;

impl AuthorizationService {
    /// Assigns a batch of grants to a user.
    ///
    /// Entries naming an unknown permission are reported as skipped without
    /// aborting the batch. An entry without a target scope fails the whole
    /// call before anything is written. Valid entries are persisted with one
    /// bulk insert; a row colliding with an existing `(user, permission,
    /// target)` key updates that row's flags instead of duplicating it.
    pub async fn assign(
        &self,
        user_id: UserId,
        entries: Vec<GrantSpec>,
    ) -> AppResult<Vec<GrantChange>> {
        let user = self.require_user(user_id).await?;

        let mut changes = Vec::with_capacity(entries.len());
        let mut grants_to_add = Vec::new();
        for entry in entries {
            let Some(permission) = self.permissions.find_by_name(&entry.permission).await? else {
                changes.push(GrantChange {
                    permission: entry.permission,
                    status: GrantChangeStatus::SkippedUnknownPermission,
                });
                continue;
            };

            let Some(scope) = entry.scope else {
                return Err(AppError::Validation(format!(
                    "target not provided for permission '{}'",
                    entry.permission
                )));
            };

            grants_to_add.push(
                PermissionGrant::new(user.id, permission.id, scope)
                    .with_flags(entry.is_active, entry.is_denied),
            );
            changes.push(GrantChange {
                permission: entry.permission,
                status: GrantChangeStatus::Applied,
            });
        }

        if !grants_to_add.is_empty() {
            self.grants.insert_many(grants_to_add).await?;
        }

        Ok(changes)
    }

    /// Bulk-creates one active, non-denied, global grant per permission.
    ///
    /// Bootstrap provisioning for accounts that start with a fixed
    /// permission set, e.g. a superuser.
    pub async fn set_initial(
        &self,
        user: &UserRecord,
        permissions: &[Permission],
    ) -> AppResult<Vec<PermissionGrant>> {
        let grants: Vec<PermissionGrant> = permissions
            .iter()
            .map(|permission| PermissionGrant::new(user.id, permission.id, GrantScope::Global))
            .collect();

        if !grants.is_empty() {
            self.grants.insert_many(grants.clone()).await?;
        }

        Ok(grants)
    }
}
