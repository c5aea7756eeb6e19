//! 消息仓储的 PostgreSQL 实现
//!
//! 消息 ID 由 BIGSERIAL 分配，插入即是原子的单调分配点，
//! 并发发送的全序完全由它决定。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::{
    Message, MessageId, MessageRepository, RepositoryResult, RoomId, Timestamp, UserId,
};

use crate::db::{map_sqlx_error, DbPool};

#[derive(Debug, FromRow)]
struct DbMessage {
    id: i64,
    room_id: i64,
    sender_id: i64,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<DbMessage> for Message {
    fn from(row: DbMessage) -> Self {
        Message {
            id: MessageId::new(row.id),
            room_id: RoomId::new(row.room_id),
            sender_id: UserId::new(row.sender_id),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(
        &self,
        room_id: RoomId,
        sender_id: UserId,
        content: String,
        created_at: Timestamp,
    ) -> RepositoryResult<Message> {
        let row = sqlx::query_as::<_, DbMessage>(
            r#"
            INSERT INTO messages (room_id, sender_id, content, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, room_id, sender_id, content, created_at
            "#,
        )
        .bind(i64::from(room_id))
        .bind(i64::from(sender_id))
        .bind(&content)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        let row = sqlx::query_as::<_, DbMessage>(
            "SELECT id, room_id, sender_id, content, created_at FROM messages WHERE id = $1",
        )
        .bind(i64::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Message::from))
    }

    async fn list_by_room(
        &self,
        room_id: RoomId,
        before: Option<MessageId>,
        limit: u32,
    ) -> RepositoryResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, DbMessage>(
            r#"
            SELECT id, room_id, sender_id, content, created_at
            FROM messages
            WHERE room_id = $1 AND ($2::BIGINT IS NULL OR id < $2)
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(i64::from(room_id))
        .bind(before.map(i64::from))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Message::from).collect())
    }
}
