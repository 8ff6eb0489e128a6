//! Permission registry: canonical-set reconciliation and permission CRUD.

use std::collections::BTreeSet;
use std::sync::Arc;

use mercat_core::{AppError, AppResult, NonEmptyString};
use mercat_domain::{Permission, PermissionDefinition, PermissionId};

use crate::registry_ports::{
    NewPermission, PermissionRepository, PermissionUpdate, ReconcileOutcome,
};

/// Application service owning the canonical set of permission definitions.
#[derive(Clone)]
pub struct PermissionService {
    repository: Arc<dyn PermissionRepository>,
}

impl PermissionService {
    /// Creates a new permission service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn PermissionRepository>) -> Self {
        Self { repository }
    }

    /// Reconciles stored permissions against a canonical set.
    ///
    /// Canonical names absent from storage are created with their description
    /// and default flag; stored permissions whose names left the canonical
    /// set are deleted. Names present on both sides are left untouched, so
    /// descriptions and flags of existing rows are never synced. Grant rows
    /// are never mutated here.
    pub async fn reconcile(
        &self,
        canonical: &[PermissionDefinition],
    ) -> AppResult<ReconcileOutcome> {
        let existing = self.repository.list_all().await?;
        let existing_names: BTreeSet<&str> =
            existing.iter().map(|row| row.name.as_str()).collect();
        let canonical_names: BTreeSet<&str> =
            canonical.iter().map(|entry| entry.name.as_str()).collect();

        let mut additions = Vec::new();
        let mut queued_names = BTreeSet::new();
        for entry in canonical {
            if existing_names.contains(entry.name.as_str()) {
                continue;
            }
            if !queued_names.insert(entry.name.as_str()) {
                continue;
            }
            additions.push(NewPermission {
                name: NonEmptyString::new(entry.name.as_str())?,
                description: entry.description.clone(),
                default_granted: entry.default_granted,
            });
        }

        let mut removals = Vec::new();
        let mut removed = Vec::new();
        for row in &existing {
            if !canonical_names.contains(row.name.as_str()) {
                removals.push(row.id);
                removed.push(row.name.clone());
            }
        }

        let created: Vec<String> = additions
            .iter()
            .map(|addition| addition.name.as_str().to_owned())
            .collect();

        if !additions.is_empty() || !removals.is_empty() {
            self.repository
                .apply_reconciliation(additions, removals)
                .await?;
        }

        Ok(ReconcileOutcome { created, removed })
    }

    /// Returns every persisted permission.
    pub async fn list_all(&self) -> AppResult<Vec<Permission>> {
        self.repository.list_all().await
    }

    /// Returns the names of every persisted permission.
    pub async fn list_names(&self) -> AppResult<Vec<String>> {
        let permissions = self.repository.list_all().await?;
        Ok(permissions.into_iter().map(|row| row.name).collect())
    }

    /// Point lookup by id; `Ok(None)` when the id is unknown.
    pub async fn get_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        self.repository.find_by_id(id).await
    }

    /// Point lookup by name; `Ok(None)` when the name is unknown.
    pub async fn get_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        self.repository.find_by_name(name).await
    }

    /// Creates a permission; fails with a conflict when the name exists.
    pub async fn create(
        &self,
        name: impl Into<String>,
        description: Option<String>,
    ) -> AppResult<Permission> {
        let name = NonEmptyString::new(name)?;
        if self.repository.find_by_name(name.as_str()).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                name.as_str()
            )));
        }

        self.repository
            .insert(NewPermission {
                name,
                description,
                default_granted: false,
            })
            .await
    }

    /// Updates a permission's name and/or description.
    ///
    /// Renaming onto a name used by a different permission is a conflict;
    /// renaming a permission to its own current name is not.
    pub async fn update(
        &self,
        id: PermissionId,
        update: PermissionUpdate,
    ) -> AppResult<Permission> {
        let Some(mut permission) = self.repository.find_by_id(id).await? else {
            return Err(AppError::NotFound(format!(
                "permission '{id}' does not exist"
            )));
        };

        if let Some(name) = update.name {
            let name = NonEmptyString::new(name)?;
            if let Some(existing) = self.repository.find_by_name(name.as_str()).await?
                && existing.id != id
            {
                return Err(AppError::Conflict(format!(
                    "permission '{}' already exists",
                    name.as_str()
                )));
            }
            permission.name = name.into();
        }

        if let Some(description) = update.description {
            permission.description = Some(description);
        }

        self.repository.update_one(&permission).await?;
        Ok(permission)
    }

    /// Deletes a permission by id.
    pub async fn delete(&self, id: PermissionId) -> AppResult<()> {
        if self.repository.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "permission '{id}' does not exist"
            )));
        }

        self.repository.delete(id).await
    }
}
