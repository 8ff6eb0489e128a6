use crate::authorization_ports::{GrantChange, GrantChangeStatus, GrantPatch};

use super::*;

impl AuthorizationService {
    /// Updates existing grants for a user; never creates new grants.
    ///
    /// The target scope is mandatory on every entry and is validated for the
    /// whole batch before any row is written. Entries naming an unknown
    /// permission are skipped; entries whose `(user, permission)` pair has
    /// no grant are reported as missing and the batch continues. Rows are
    /// persisted one at a time so one failed write cannot take unrelated
    /// entries down with it.
    pub async fn update(
        &self,
        user_id: UserId,
        entries: Vec<GrantPatch>,
    ) -> AppResult<Vec<GrantChange>> {
        let user = self.require_user(user_id).await?;

        for entry in &entries {
            if entry.scope.is_none() {
                return Err(AppError::Validation(format!(
                    "target not provided for permission '{}'",
                    entry.permission
                )));
            }
        }

        let mut changes = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(permission) = self.permissions.find_by_name(&entry.permission).await? else {
                changes.push(GrantChange {
                    permission: entry.permission,
                    status: GrantChangeStatus::SkippedUnknownPermission,
                });
                continue;
            };

            let Some(mut grant) = self
                .grants
                .find_by_user_and_permission(user.id, permission.id)
                .await?
            else {
                changes.push(GrantChange {
                    permission: entry.permission,
                    status: GrantChangeStatus::MissingGrant,
                });
                continue;
            };

            if let Some(is_active) = entry.is_active {
                grant.is_active = is_active;
            }
            if let Some(is_denied) = entry.is_denied {
                grant.is_denied = is_denied;
            }
            if let Some(scope) = entry.scope {
                grant.scope = scope;
            }

            self.grants.update_one(&grant).await?;
            changes.push(GrantChange {
                permission: entry.permission,
                status: GrantChangeStatus::Applied,
            });
        }

        Ok(changes)
    }

    /// Revokes grants by permission name with one bulk delete.
    ///
    /// Unknown permission names and pairs without a grant are reported as
    /// skipped or missing; neither is an error.
    pub async fn revoke(
        &self,
        user_id: UserId,
        permission_names: Vec<String>,
    ) -> AppResult<Vec<GrantChange>> {
        let user = self.require_user(user_id).await?;

        let mut changes = Vec::with_capacity(permission_names.len());
        let mut grant_ids = Vec::new();
        for name in permission_names {
            let Some(permission) = self.permissions.find_by_name(&name).await? else {
                changes.push(GrantChange {
                    permission: name,
                    status: GrantChangeStatus::SkippedUnknownPermission,
                });
                continue;
            };

            let Some(grant) = self
                .grants
                .find_by_user_and_permission(user.id, permission.id)
                .await?
            else {
                changes.push(GrantChange {
                    permission: name,
                    status: GrantChangeStatus::MissingGrant,
                });
                continue;
            };

            grant_ids.push(grant.id);
            changes.push(GrantChange {
                permission: name,
                status: GrantChangeStatus::Applied,
            });
        }

        if !grant_ids.is_empty() {
            self.grants.delete_many(grant_ids).await?;
        }

        Ok(changes)
    }
}
