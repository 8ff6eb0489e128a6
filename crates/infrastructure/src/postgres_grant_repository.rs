use async_trait::async_trait;
use chrono::{DateTime, Utc};

use mercat_application::GrantRepository;
use mercat_core::{AppError, AppResult};
use mercat_domain::{GrantId, GrantScope, PermissionGrant, PermissionId, UserId};

use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed repository for per-user grant rows.
#[derive(Clone)]
pub struct PostgresGrantRepository {
    pool: PgPool,
}

impl PostgresGrantRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct GrantRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    permission_id: uuid::Uuid,
    is_active: bool,
    is_denied: bool,
    target_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<GrantRow> for PermissionGrant {
    fn from(row: GrantRow) -> Self {
        Self {
            id: GrantId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            permission_id: PermissionId::from_uuid(row.permission_id),
            is_active: row.is_active,
            is_denied: row.is_denied,
            scope: GrantScope::from_target_id(row.target_id),
            created_at: row.created_at,
        }
    }
}

const SELECT_GRANT: &str = r#"
    SELECT id, user_id, permission_id, is_active, is_denied, target_id, created_at
    FROM user_permissions
"#;

#[async_trait]
impl GrantRepository for PostgresGrantRepository {
    async fn insert_many(&self, grants: Vec<PermissionGrant>) -> AppResult<()> {
        if grants.is_empty() {
            return Ok(());
        }

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        for grant in grants {
            sqlx::query(
                r#"
                INSERT INTO user_permissions
                    (id, user_id, permission_id, is_active, is_denied, target_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (user_id, permission_id, target_id) DO UPDATE
                SET is_active = EXCLUDED.is_active, is_denied = EXCLUDED.is_denied
                "#,
            )
            .bind(grant.id.as_uuid())
            .bind(grant.user_id.as_uuid())
            .bind(grant.permission_id.as_uuid())
            .bind(grant.is_active)
            .bind(grant.is_denied)
            .bind(grant.scope.as_target_id())
            .bind(grant.created_at)
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to persist grant: {error}")))?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    async fn update_one(&self, grant: &PermissionGrant) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE user_permissions
            SET is_active = $2, is_denied = $3, target_id = $4
            WHERE id = $1
            "#,
        )
        .bind(grant.id.as_uuid())
        .bind(grant.is_active)
        .bind(grant.is_denied)
        .bind(grant.scope.as_target_id())
        .execute(&self.pool)
        .await
        .map_err(map_scope_conflict)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "grant '{}' does not exist",
                grant.id
            )));
        }

        Ok(())
    }

    async fn delete_many(&self, ids: Vec<GrantId>) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let id_values: Vec<uuid::Uuid> = ids.iter().map(GrantId::as_uuid).collect();
        sqlx::query(
            r#"
            DELETE FROM user_permissions
            WHERE id = ANY($1)
            "#,
        )
        .bind(id_values.as_slice())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete grants: {error}")))?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<PermissionGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(&format!(
            "{SELECT_GRANT} WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list grants: {error}")))?;

        Ok(rows.into_iter().map(PermissionGrant::from).collect())
    }

    async fn find_by_user_and_permission(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<PermissionGrant>> {
        let row = sqlx::query_as::<_, GrantRow>(&format!(
            "{SELECT_GRANT} WHERE user_id = $1 AND permission_id = $2 \
             ORDER BY created_at ASC, id ASC LIMIT 1"
        ))
        .bind(user_id.as_uuid())
        .bind(permission_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load grant: {error}")))?;

        Ok(row.map(PermissionGrant::from))
    }

    async fn list_by_user_and_permission_name(
        &self,
        user_id: UserId,
        permission_name: &str,
    ) -> AppResult<Vec<PermissionGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT grants.id, grants.user_id, grants.permission_id, grants.is_active,
                   grants.is_denied, grants.target_id, grants.created_at
            FROM user_permissions AS grants
            INNER JOIN permissions
                ON permissions.id = grants.permission_id
            WHERE grants.user_id = $1
                AND permissions.name = $2
            ORDER BY grants.created_at ASC, grants.id ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(permission_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list grants: {error}")))?;

        Ok(rows.into_iter().map(PermissionGrant::from).collect())
    }
}

fn map_scope_conflict(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(
            "a grant with this user, permission and target already exists".to_owned(),
        );
    }

    AppError::Internal(format!("failed to persist grant: {error}"))
}
