use async_trait::async_trait;

use mercat_application::{UserRecord, UserRepository};
use mercat_core::{AppError, AppResult};
use mercat_domain::UserId;

use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed lookup for user records owned by the platform.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: uuid::Uuid,
    username: String,
    email: String,
    is_active: bool,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            username: row.username,
            email: row.email,
            is_active: row.is_active,
        }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, is_active
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load user: {error}")))?;

        Ok(row.map(UserRecord::from))
    }
}
