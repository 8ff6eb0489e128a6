use mercat_domain::{AccessDecision, GrantScope, TargetId};

use super::*;

impl AuthorizationService {
    /// Decides whether a user may exercise a permission, optionally against
    /// one target.
    ///
    /// Inactive grants never participate. An active global grant decides
    /// first, regardless of where it sits relative to target-scoped rows, so
    /// global policy cannot be shadowed by a narrower stale record. Failing
    /// that, the first active grant matching the requested target decides.
    /// With no applicable rule the result is
    /// [`AccessDecision::Indeterminate`] and the caller applies its own
    /// default policy.
    pub async fn evaluate(
        &self,
        user_id: UserId,
        permission_name: &str,
        target: Option<TargetId>,
    ) -> AppResult<AccessDecision> {
        let grants = self
            .grants
            .list_by_user_and_permission_name(user_id, permission_name)
            .await?;

        if let Some(grant) = grants
            .iter()
            .find(|grant| grant.is_active && grant.scope.is_global())
        {
            return Ok(AccessDecision::from_deny_flag(grant.is_denied));
        }

        if let Some(requested) = target
            && let Some(grant) = grants
                .iter()
                .find(|grant| grant.is_active && grant.scope == GrantScope::Target(requested))
        {
            return Ok(AccessDecision::from_deny_flag(grant.is_denied));
        }

        Ok(AccessDecision::Indeterminate)
    }

    /// Ensures the user may exercise the permission.
    ///
    /// Deny and indeterminate outcomes both map to a forbidden error; use
    /// [`AuthorizationService::evaluate`] when the three-valued outcome
    /// matters.
    pub async fn require(
        &self,
        user_id: UserId,
        permission_name: &str,
        target: Option<TargetId>,
    ) -> AppResult<()> {
        match self.evaluate(user_id, permission_name, target).await? {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny | AccessDecision::Indeterminate => {
                Err(AppError::Forbidden(format!(
                    "user '{user_id}' is missing permission '{permission_name}'"
                )))
            }
        }
    }
}
