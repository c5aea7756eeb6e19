//! 消息回执仓储的 PostgreSQL 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::{
    MessageId, MessageReceipt, ReceiptRepository, ReceiptUpdate, RepositoryResult, UserId,
};

use crate::db::{map_sqlx_error, DbPool};

#[derive(Debug, FromRow)]
struct DbReceipt {
    message_id: i64,
    user_id: i64,
    delivered_at: Option<DateTime<Utc>>,
    read_at: Option<DateTime<Utc>>,
}

impl From<DbReceipt> for MessageReceipt {
    fn from(row: DbReceipt) -> Self {
        MessageReceipt {
            message_id: MessageId::new(row.message_id),
            user_id: UserId::new(row.user_id),
            delivered_at: row.delivered_at,
            read_at: row.read_at,
        }
    }
}

pub struct PgReceiptRepository {
    pool: DbPool,
}

impl PgReceiptRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReceiptRepository for PgReceiptRepository {
    async fn upsert(
        &self,
        message_id: MessageId,
        user_id: UserId,
        update: ReceiptUpdate,
    ) -> RepositoryResult<MessageReceipt> {
        // COALESCE 保证补丁里未携带的字段保持原值
        let row = sqlx::query_as::<_, DbReceipt>(
            r#"
            INSERT INTO message_receipts (message_id, user_id, delivered_at, read_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (message_id, user_id) DO UPDATE SET
                delivered_at = COALESCE(EXCLUDED.delivered_at, message_receipts.delivered_at),
                read_at = COALESCE(EXCLUDED.read_at, message_receipts.read_at)
            RETURNING message_id, user_id, delivered_at, read_at
            "#,
        )
        .bind(i64::from(message_id))
        .bind(i64::from(user_id))
        .bind(update.delivered_at)
        .bind(update.read_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find(
        &self,
        message_id: MessageId,
        user_id: UserId,
    ) -> RepositoryResult<Option<MessageReceipt>> {
        let row = sqlx::query_as::<_, DbReceipt>(
            r#"
            SELECT message_id, user_id, delivered_at, read_at
            FROM message_receipts
            WHERE message_id = $1 AND user_id = $2
            "#,
        )
        .bind(i64::from(message_id))
        .bind(i64::from(user_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(MessageReceipt::from))
    }
}
