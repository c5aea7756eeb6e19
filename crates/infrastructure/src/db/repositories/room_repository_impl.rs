//! 房间仓储的 PostgreSQL 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::{NewRoom, RepositoryResult, Room, RoomId, RoomRepository, UserId};

use crate::db::{map_sqlx_error, DbPool};

#[derive(Debug, FromRow)]
struct DbRoom {
    id: i64,
    name: String,
    is_private: bool,
    invite_code: Option<String>,
    created_by: i64,
    created_at: DateTime<Utc>,
}

impl From<DbRoom> for Room {
    fn from(row: DbRoom) -> Self {
        Room {
            id: RoomId::new(row.id),
            name: row.name,
            is_private: row.is_private,
            invite_code: row.invite_code,
            created_by: UserId::new(row.created_by),
            created_at: row.created_at,
        }
    }
}

pub struct PgRoomRepository {
    pool: DbPool,
}

impl PgRoomRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn create(&self, room: NewRoom) -> RepositoryResult<Room> {
        let row = sqlx::query_as::<_, DbRoom>(
            r#"
            INSERT INTO rooms (name, is_private, invite_code, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, is_private, invite_code, created_by, created_at
            "#,
        )
        .bind(&room.name)
        .bind(room.is_private)
        .bind(&room.invite_code)
        .bind(i64::from(room.created_by))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: RoomId) -> RepositoryResult<Option<Room>> {
        let row = sqlx::query_as::<_, DbRoom>(
            "SELECT id, name, is_private, invite_code, created_by, created_at FROM rooms WHERE id = $1",
        )
        .bind(i64::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Room::from))
    }

    async fn list_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<Room>> {
        let rows = sqlx::query_as::<_, DbRoom>(
            r#"
            SELECT r.id, r.name, r.is_private, r.invite_code, r.created_by, r.created_at
            FROM rooms r
            JOIN room_members m ON m.room_id = r.id
            WHERE m.user_id = $1
            ORDER BY r.id
            "#,
        )
        .bind(i64::from(user_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Room::from).collect())
    }
}
