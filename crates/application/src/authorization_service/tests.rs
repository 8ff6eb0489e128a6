use std::sync::Arc;

use async_trait::async_trait;
use mercat_core::{AppError, AppResult};
use mercat_domain::{
    AccessDecision, GrantId, GrantScope, Permission, PermissionGrant, PermissionId, TargetId,
    UserId,
};
use tokio::sync::Mutex;

use crate::authorization_ports::{
    GrantChange, GrantChangeStatus, GrantPatch, GrantRepository, GrantSpec, UserRecord,
    UserRepository,
};
use crate::registry_ports::{NewPermission, PermissionRepository};

use super::AuthorizationService;

#[derive(Default)]
struct FakeStore {
    users: Mutex<Vec<UserRecord>>,
    permissions: Mutex<Vec<Permission>>,
    grants: Mutex<Vec<PermissionGrant>>,
}

impl FakeStore {
    async fn add_user(&self) -> UserRecord {
        let record = UserRecord {
            id: UserId::new(),
            username: "alice".to_owned(),
            email: "alice@example.com".to_owned(),
            is_active: true,
        };
        self.users.lock().await.push(record.clone());
        record
    }

    async fn add_permission(&self, name: &str) -> Permission {
        let row = Permission {
            id: PermissionId::new(),
            name: name.to_owned(),
            description: None,
            default_granted: false,
        };
        self.permissions.lock().await.push(row.clone());
        row
    }

    async fn grant_rows(&self) -> Vec<PermissionGrant> {
        self.grants.lock().await.clone()
    }
}

#[async_trait]
impl UserRepository for FakeStore {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<UserRecord>> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }
}

#[async_trait]
impl PermissionRepository for FakeStore {
    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .lock()
            .await
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .lock()
            .await
            .iter()
            .find(|row| row.name == name)
            .cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<Permission>> {
        Ok(self.permissions.lock().await.clone())
    }

    async fn insert(&self, permission: NewPermission) -> AppResult<Permission> {
        let row = Permission {
            id: PermissionId::new(),
            name: permission.name.into(),
            description: permission.description,
            default_granted: permission.default_granted,
        };
        self.permissions.lock().await.push(row.clone());
        Ok(row)
    }

    async fn update_one(&self, permission: &Permission) -> AppResult<()> {
        let mut rows = self.permissions.lock().await;
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
        self.permissions.lock().await.retain(|row| row.id != id);
        Ok(())
    }

    async fn apply_reconciliation(
        &self,
        additions: Vec<NewPermission>,
        removals: Vec<PermissionId>,
    ) -> AppResult<()> {
        let mut rows = self.permissions.lock().await;
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
impl GrantRepository for FakeStore {
    async fn insert_many(&self, new_grants: Vec<PermissionGrant>) -> AppResult<()> {
        let mut grants = self.grants.lock().await;
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
        let mut grants = self.grants.lock().await;
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
            .lock()
            .await
            .retain(|row| !ids.contains(&row.id));
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<PermissionGrant>> {
        Ok(self
            .grants
            .lock()
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
            .lock()
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
            let permissions = self.permissions.lock().await;
            match permissions.iter().find(|row| row.name == permission_name) {
                Some(permission) => permission.id,
                None => return Ok(Vec::new()),
            }
        };

        Ok(self
            .grants
            .lock()
            .await
            .iter()
            .filter(|row| row.user_id == user_id && row.permission_id == permission_id)
            .cloned()
            .collect())
    }
}

fn service(store: &Arc<FakeStore>) -> AuthorizationService {
    AuthorizationService::new(store.clone(), store.clone(), store.clone())
}

fn applied(permission: &str) -> GrantChange {
    GrantChange {
        permission: permission.to_owned(),
        status: GrantChangeStatus::Applied,
    }
}

#[tokio::test]
async fn evaluate_without_grants_is_indeterminate() {
    let store = Arc::new(FakeStore::default());
    store.add_permission("view_products").await;
    let service = service(&store);

    let decision = service
        .evaluate(UserId::new(), "view_products", Some(TargetId::new(3)))
        .await;
    assert_eq!(decision.ok(), Some(AccessDecision::Indeterminate));

    let decision = service.evaluate(UserId::new(), "view_products", None).await;
    assert_eq!(decision.ok(), Some(AccessDecision::Indeterminate));
}

#[tokio::test]
async fn global_allow_applies_to_every_target() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("view_products").await;
    let service = service(&store);

    let changes = service
        .assign(
            user.id,
            vec![GrantSpec::new("view_products", GrantScope::Global)],
        )
        .await;
    assert_eq!(changes.ok(), Some(vec![applied("view_products")]));

    for target in [None, Some(TargetId::new(1)), Some(TargetId::new(99))] {
        let decision = service.evaluate(user.id, "view_products", target).await;
        assert_eq!(decision.ok(), Some(AccessDecision::Allow));
    }
}

#[tokio::test]
async fn global_deny_applies_regardless_of_inactive_rows() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("edit_product").await;
    let service = service(&store);

    let result = service
        .assign(
            user.id,
            vec![
                GrantSpec::new("edit_product", GrantScope::Target(TargetId::new(5)))
                    .with_flags(false, false),
                GrantSpec::new("edit_product", GrantScope::Global).with_flags(true, true),
            ],
        )
        .await;
    assert!(result.is_ok());

    for target in [None, Some(TargetId::new(5))] {
        let decision = service.evaluate(user.id, "edit_product", target).await;
        assert_eq!(decision.ok(), Some(AccessDecision::Deny));
    }
}

#[tokio::test]
async fn global_decision_takes_precedence_over_scoped_grant() {
    // Scoped row inserted first; the later global row must still decide.
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("edit_product").await;
    let service = service(&store);

    let result = service
        .assign(
            user.id,
            vec![
                GrantSpec::new("edit_product", GrantScope::Target(TargetId::new(5))),
                GrantSpec::new("edit_product", GrantScope::Global).with_flags(true, true),
            ],
        )
        .await;
    assert!(result.is_ok());

    let decision = service
        .evaluate(user.id, "edit_product", Some(TargetId::new(5)))
        .await;
    assert_eq!(decision.ok(), Some(AccessDecision::Deny));
}

#[tokio::test]
async fn global_decision_takes_precedence_in_reverse_insertion_order() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("edit_product").await;
    let service = service(&store);

    let result = service
        .assign(
            user.id,
            vec![
                GrantSpec::new("edit_product", GrantScope::Global).with_flags(true, true),
                GrantSpec::new("edit_product", GrantScope::Target(TargetId::new(5))),
            ],
        )
        .await;
    assert!(result.is_ok());

    let decision = service
        .evaluate(user.id, "edit_product", Some(TargetId::new(5)))
        .await;
    assert_eq!(decision.ok(), Some(AccessDecision::Deny));
}

#[tokio::test]
async fn scoped_grant_matches_only_its_target() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("edit_product").await;
    let service = service(&store);

    let result = service
        .assign(
            user.id,
            vec![GrantSpec::new(
                "edit_product",
                GrantScope::Target(TargetId::new(5)),
            )],
        )
        .await;
    assert!(result.is_ok());

    let decision = service
        .evaluate(user.id, "edit_product", Some(TargetId::new(5)))
        .await;
    assert_eq!(decision.ok(), Some(AccessDecision::Allow));

    let decision = service
        .evaluate(user.id, "edit_product", Some(TargetId::new(6)))
        .await;
    assert_eq!(decision.ok(), Some(AccessDecision::Indeterminate));

    let decision = service.evaluate(user.id, "edit_product", None).await;
    assert_eq!(decision.ok(), Some(AccessDecision::Indeterminate));
}

#[tokio::test]
async fn inactive_grant_never_influences_evaluation() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("delete_order").await;
    let service = service(&store);

    let result = service
        .assign(
            user.id,
            vec![GrantSpec::new("delete_order", GrantScope::Global).with_flags(false, true)],
        )
        .await;
    assert!(result.is_ok());

    let decision = service
        .evaluate(user.id, "delete_order", Some(TargetId::new(1)))
        .await;
    assert_eq!(decision.ok(), Some(AccessDecision::Indeterminate));
}

#[tokio::test]
async fn assign_without_target_fails_and_writes_nothing() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("view_products").await;
    store.add_permission("edit_product").await;
    let service = service(&store);

    let entries = vec![
        GrantSpec::new("view_products", GrantScope::Global),
        GrantSpec {
            permission: "edit_product".to_owned(),
            is_active: true,
            is_denied: false,
            scope: None,
        },
    ];
    let result = service.assign(user.id, entries).await;

    match result {
        Err(AppError::Validation(message)) => assert!(message.contains("edit_product")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(store.grant_rows().await.is_empty());
}

#[tokio::test]
async fn assign_reports_unknown_permission_as_skipped() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("view_products").await;
    let service = service(&store);

    let changes = service
        .assign(
            user.id,
            vec![
                GrantSpec::new("view_products", GrantScope::Global),
                GrantSpec::new("no_such_permission", GrantScope::Global),
            ],
        )
        .await;

    assert_eq!(
        changes.ok(),
        Some(vec![
            applied("view_products"),
            GrantChange {
                permission: "no_such_permission".to_owned(),
                status: GrantChangeStatus::SkippedUnknownPermission,
            },
        ])
    );
    assert_eq!(store.grant_rows().await.len(), 1);
}

#[tokio::test]
async fn assign_for_unknown_user_is_not_found() {
    let store = Arc::new(FakeStore::default());
    store.add_permission("view_products").await;
    let service = service(&store);

    let result = service
        .assign(
            UserId::new(),
            vec![GrantSpec::new("view_products", GrantScope::Global)],
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn assign_same_scope_twice_updates_instead_of_duplicating() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("view_products").await;
    let service = service(&store);

    let first = service
        .assign(
            user.id,
            vec![GrantSpec::new("view_products", GrantScope::Global)],
        )
        .await;
    assert!(first.is_ok());

    let second = service
        .assign(
            user.id,
            vec![GrantSpec::new("view_products", GrantScope::Global).with_flags(true, true)],
        )
        .await;
    assert!(second.is_ok());

    assert_eq!(store.grant_rows().await.len(), 1);
    let decision = service.evaluate(user.id, "view_products", None).await;
    assert_eq!(decision.ok(), Some(AccessDecision::Deny));
}

#[tokio::test]
async fn update_toggles_deny_for_same_target() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("edit_product").await;
    let service = service(&store);

    let target = TargetId::new(7);
    let result = service
        .assign(
            user.id,
            vec![GrantSpec::new("edit_product", GrantScope::Target(target))],
        )
        .await;
    assert!(result.is_ok());

    let decision = service.evaluate(user.id, "edit_product", Some(target)).await;
    assert_eq!(decision.ok(), Some(AccessDecision::Allow));

    let changes = service
        .update(
            user.id,
            vec![GrantPatch {
                permission: "edit_product".to_owned(),
                is_active: None,
                is_denied: Some(true),
                scope: Some(GrantScope::Target(target)),
            }],
        )
        .await;
    assert_eq!(changes.ok(), Some(vec![applied("edit_product")]));

    let decision = service.evaluate(user.id, "edit_product", Some(target)).await;
    assert_eq!(decision.ok(), Some(AccessDecision::Deny));
}

#[tokio::test]
async fn update_keeps_unspecified_flags() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("view_products").await;
    let service = service(&store);

    let result = service
        .assign(
            user.id,
            vec![GrantSpec::new("view_products", GrantScope::Global)],
        )
        .await;
    assert!(result.is_ok());

    let changes = service
        .update(
            user.id,
            vec![GrantPatch {
                permission: "view_products".to_owned(),
                is_active: None,
                is_denied: Some(true),
                scope: Some(GrantScope::Global),
            }],
        )
        .await;
    assert!(changes.is_ok());

    let rows = store.grant_rows().await;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_active);
    assert!(rows[0].is_denied);
}

#[tokio::test]
async fn update_missing_grant_reports_entry_and_continues() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("view_products").await;
    store.add_permission("edit_product").await;
    let service = service(&store);

    let result = service
        .assign(
            user.id,
            vec![GrantSpec::new("edit_product", GrantScope::Global)],
        )
        .await;
    assert!(result.is_ok());

    let changes = service
        .update(
            user.id,
            vec![
                GrantPatch::new("view_products", GrantScope::Global),
                GrantPatch {
                    permission: "edit_product".to_owned(),
                    is_active: None,
                    is_denied: Some(true),
                    scope: Some(GrantScope::Global),
                },
            ],
        )
        .await;

    assert_eq!(
        changes.ok(),
        Some(vec![
            GrantChange {
                permission: "view_products".to_owned(),
                status: GrantChangeStatus::MissingGrant,
            },
            applied("edit_product"),
        ])
    );

    let decision = service.evaluate(user.id, "edit_product", None).await;
    assert_eq!(decision.ok(), Some(AccessDecision::Deny));
}

#[tokio::test]
async fn update_without_target_fails_before_any_write() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("view_products").await;
    store.add_permission("edit_product").await;
    let service = service(&store);

    let result = service
        .assign(
            user.id,
            vec![
                GrantSpec::new("view_products", GrantScope::Global),
                GrantSpec::new("edit_product", GrantScope::Global),
            ],
        )
        .await;
    assert!(result.is_ok());

    let result = service
        .update(
            user.id,
            vec![
                GrantPatch {
                    permission: "view_products".to_owned(),
                    is_active: None,
                    is_denied: Some(true),
                    scope: Some(GrantScope::Global),
                },
                GrantPatch {
                    permission: "edit_product".to_owned(),
                    is_active: None,
                    is_denied: Some(true),
                    scope: None,
                },
            ],
        )
        .await;

    match result {
        Err(AppError::Validation(message)) => assert!(message.contains("edit_product")),
        other => panic!("expected validation error, got {other:?}"),
    }

    // Nothing was written, including the entry listed before the bad one.
    assert!(store.grant_rows().await.iter().all(|row| !row.is_denied));
}

#[tokio::test]
async fn update_unknown_permission_is_skipped() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    let service = service(&store);

    let changes = service
        .update(
            user.id,
            vec![GrantPatch::new("no_such_permission", GrantScope::Global)],
        )
        .await;
    assert_eq!(
        changes.ok(),
        Some(vec![GrantChange {
            permission: "no_such_permission".to_owned(),
            status: GrantChangeStatus::SkippedUnknownPermission,
        }])
    );
}

#[tokio::test]
async fn revoke_deletes_matched_grants_and_reports_the_rest() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("view_products").await;
    store.add_permission("edit_product").await;
    let service = service(&store);

    let result = service
        .assign(
            user.id,
            vec![GrantSpec::new("view_products", GrantScope::Global)],
        )
        .await;
    assert!(result.is_ok());

    let changes = service
        .revoke(
            user.id,
            vec![
                "view_products".to_owned(),
                "no_such_permission".to_owned(),
                "edit_product".to_owned(),
            ],
        )
        .await;

    assert_eq!(
        changes.ok(),
        Some(vec![
            applied("view_products"),
            GrantChange {
                permission: "no_such_permission".to_owned(),
                status: GrantChangeStatus::SkippedUnknownPermission,
            },
            GrantChange {
                permission: "edit_product".to_owned(),
                status: GrantChangeStatus::MissingGrant,
            },
        ])
    );
    assert!(store.grant_rows().await.is_empty());
}

#[tokio::test]
async fn revoke_without_existing_grant_is_silent() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("view_products").await;
    let service = service(&store);

    let changes = service
        .revoke(user.id, vec!["view_products".to_owned()])
        .await;
    assert_eq!(
        changes.ok(),
        Some(vec![GrantChange {
            permission: "view_products".to_owned(),
            status: GrantChangeStatus::MissingGrant,
        }])
    );
    assert!(store.grant_rows().await.is_empty());
}

#[tokio::test]
async fn set_initial_creates_active_global_grants() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    let view = store.add_permission("view_products").await;
    let edit = store.add_permission("edit_product").await;
    let service = service(&store);

    let grants = service.set_initial(&user, &[view, edit]).await;
    assert_eq!(grants.as_ref().map(Vec::len).ok(), Some(2));

    let rows = store.grant_rows().await;
    assert_eq!(rows.len(), 2);
    assert!(
        rows.iter()
            .all(|row| row.is_active && !row.is_denied && row.scope.is_global())
    );

    let decision = service
        .evaluate(user.id, "edit_product", Some(TargetId::new(12)))
        .await;
    assert_eq!(decision.ok(), Some(AccessDecision::Allow));
}

#[tokio::test]
async fn list_permission_names_is_distinct_and_sorted() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("view_products").await;
    store.add_permission("edit_product").await;
    let service = service(&store);

    let result = service
        .assign(
            user.id,
            vec![
                GrantSpec::new("view_products", GrantScope::Target(TargetId::new(1))),
                GrantSpec::new("view_products", GrantScope::Target(TargetId::new(2))),
                GrantSpec::new("edit_product", GrantScope::Global).with_flags(false, true),
            ],
        )
        .await;
    assert!(result.is_ok());

    let names = service.list_permission_names_for_user(user.id).await;
    assert_eq!(
        names.ok(),
        Some(vec!["edit_product".to_owned(), "view_products".to_owned()])
    );
}

#[tokio::test]
async fn list_grants_includes_inactive_and_denied_rows() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("view_products").await;
    store.add_permission("edit_product").await;
    let service = service(&store);

    let result = service
        .assign(
            user.id,
            vec![
                GrantSpec::new("view_products", GrantScope::Global).with_flags(false, false),
                GrantSpec::new("edit_product", GrantScope::Global).with_flags(true, true),
            ],
        )
        .await;
    assert!(result.is_ok());

    let grants = service.list_grants_for_user(user.id).await;
    assert_eq!(grants.as_ref().map(Vec::len).ok(), Some(2));
}

#[tokio::test]
async fn listings_for_unknown_user_are_not_found() {
    let store = Arc::new(FakeStore::default());
    let service = service(&store);

    let grants = service.list_grants_for_user(UserId::new()).await;
    assert!(matches!(grants, Err(AppError::NotFound(_))));

    let names = service.list_permission_names_for_user(UserId::new()).await;
    assert!(matches!(names, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn require_maps_deny_and_indeterminate_to_forbidden() {
    let store = Arc::new(FakeStore::default());
    let user = store.add_user().await;
    store.add_permission("view_orders").await;
    store.add_permission("delete_order").await;
    let service = service(&store);

    let result = service
        .assign(
            user.id,
            vec![
                GrantSpec::new("view_orders", GrantScope::Global),
                GrantSpec::new("delete_order", GrantScope::Global).with_flags(true, true),
            ],
        )
        .await;
    assert!(result.is_ok());

    assert!(service.require(user.id, "view_orders", None).await.is_ok());

    let denied = service.require(user.id, "delete_order", None).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let indeterminate = service.require(user.id, "view_users", None).await;
    assert!(matches!(indeterminate, Err(AppError::Forbidden(_))));
}
