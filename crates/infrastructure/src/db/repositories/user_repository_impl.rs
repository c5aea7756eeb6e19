//! 用户仓储的 PostgreSQL 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::{
    NewUser, PasswordHash, RepositoryResult, Timestamp, User, UserId, UserRepository,
};

use crate::db::{map_sqlx_error, DbPool};

#[derive(Debug, FromRow)]
struct DbUser {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    last_seen: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        User {
            id: UserId::new(row.id),
            name: row.name,
            email: row.email,
            password_hash: PasswordHash::new(row.password_hash),
            last_seen: row.last_seen,
            created_at: row.created_at,
        }
    }
}

pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        let row = sqlx::query_as::<_, DbUser>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, last_seen, created_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.password_hash.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(
            "SELECT id, name, email, password_hash, last_seen, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(
            "SELECT id, name, email, password_hash, last_seen, created_at FROM users WHERE id = $1",
        )
        .bind(i64::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(User::from))
    }

    async fn set_last_seen(&self, id: UserId, at: Timestamp) -> RepositoryResult<()> {
        sqlx::query("UPDATE users SET last_seen = $2 WHERE id = $1")
            .bind(i64::from(id))
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
