//! PostgreSQL 连接与仓储实现

pub mod repositories;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub type DbPool = PgPool;

/// 创建 PostgreSQL 连接池
pub async fn create_pg_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// 把 sqlx 错误映射为仓储层错误
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> domain::RepositoryError {
    match err {
        sqlx::Error::RowNotFound => domain::RepositoryError::NotFound,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            domain::RepositoryError::Conflict
        }
        other => domain::RepositoryError::storage(other.to_string()),
    }
}
