//! 房间成员仓储的 PostgreSQL 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::{
    RepositoryResult, RoomId, RoomMemberProfile, RoomMemberRepository, Timestamp, UserId,
};

use crate::db::{map_sqlx_error, DbPool};

#[derive(Debug, FromRow)]
struct DbMemberProfile {
    user_id: i64,
    name: String,
    last_seen: Option<DateTime<Utc>>,
}

pub struct PgRoomMemberRepository {
    pool: DbPool,
}

impl PgRoomMemberRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomMemberRepository for PgRoomMemberRepository {
    async fn is_member(&self, room_id: RoomId, user_id: UserId) -> RepositoryResult<bool> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM room_members WHERE room_id = $1 AND user_id = $2)",
        )
        .bind(i64::from(room_id))
        .bind(i64::from(user_id))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(exists.0)
    }

    async fn upsert(
        &self,
        room_id: RoomId,
        user_id: UserId,
        joined_at: Timestamp,
    ) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO room_members (room_id, user_id, joined_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (room_id, user_id) DO NOTHING
            "#,
        )
        .bind(i64::from(room_id))
        .bind(i64::from(user_id))
        .bind(joined_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_profiles(&self, room_id: RoomId) -> RepositoryResult<Vec<RoomMemberProfile>> {
        let rows = sqlx::query_as::<_, DbMemberProfile>(
            r#"
            SELECT u.id AS user_id, u.name, u.last_seen
            FROM room_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.room_id = $1
            ORDER BY u.id
            "#,
        )
        .bind(i64::from(room_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| RoomMemberProfile {
                user_id: UserId::new(row.user_id),
                name: row.name,
                last_seen: row.last_seen,
            })
            .collect())
    }
}
