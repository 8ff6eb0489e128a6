use async_trait::async_trait;

use mercat_application::{NewPermission, PermissionRepository};
use mercat_core::{AppError, AppResult};
use mercat_domain::{Permission, PermissionId};

use sqlx::{FromRow, PgPool};
use tracing::info;

/// PostgreSQL-backed repository for permission definitions.
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: uuid::Uuid,
    name: String,
    description: Option<String>,
    default_granted: bool,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Self {
            id: PermissionId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            default_granted: row.default_granted,
        }
    }
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, description, default_granted
            FROM permissions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load permission: {error}")))?;

        Ok(row.map(Permission::from))
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, description, default_granted
            FROM permissions
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load permission: {error}")))?;

        Ok(row.map(Permission::from))
    }

    async fn list_all(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, description, default_granted
            FROM permissions
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?;

        Ok(rows.into_iter().map(Permission::from).collect())
    }

    async fn insert(&self, permission: NewPermission) -> AppResult<Permission> {
        let id = PermissionId::new();
        sqlx::query(
            r#"
            INSERT INTO permissions (id, name, description, default_granted)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id.as_uuid())
        .bind(permission.name.as_str())
        .bind(permission.description.as_deref())
        .bind(permission.default_granted)
        .execute(&self.pool)
        .await
        .map_err(|error| map_name_conflict(error, permission.name.as_str()))?;

        Ok(Permission {
            id,
            name: permission.name.into(),
            description: permission.description,
            default_granted: permission.default_granted,
        })
    }

    async fn update_one(&self, permission: &Permission) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE permissions
            SET name = $2, description = $3, default_granted = $4
            WHERE id = $1
            "#,
        )
        .bind(permission.id.as_uuid())
        .bind(permission.name.as_str())
        .bind(permission.description.as_deref())
        .bind(permission.default_granted)
        .execute(&self.pool)
        .await
        .map_err(|error| map_name_conflict(error, permission.name.as_str()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "permission '{}' does not exist",
                permission.id
            )));
        }

        Ok(())
    }

    async fn delete(&self, id: PermissionId) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM permissions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete permission: {error}")))?;

        if result.rows_affected() == 0 {
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
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let removal_ids: Vec<uuid::Uuid> = removals.iter().map(PermissionId::as_uuid).collect();
        if !removal_ids.is_empty() {
            sqlx::query(
                r#"
                DELETE FROM permissions
                WHERE id = ANY($1)
                "#,
            )
            .bind(removal_ids.as_slice())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to remove stale permissions: {error}"))
            })?;
        }

        let added = additions.len();
        for addition in additions {
            sqlx::query(
                r#"
                INSERT INTO permissions (id, name, description, default_granted)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(PermissionId::new().as_uuid())
            .bind(addition.name.as_str())
            .bind(addition.description.as_deref())
            .bind(addition.default_granted)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist permission: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        info!(added, removed = removal_ids.len(), "permission registry reconciled");
        Ok(())
    }
}

fn map_name_conflict(error: sqlx::Error, name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("permission '{name}' already exists"));
    }

    AppError::Internal(format!("failed to persist permission: {error}"))
}
