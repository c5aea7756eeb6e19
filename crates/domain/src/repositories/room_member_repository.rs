//! 房间成员仓储接口
//!
//! 成员关系是所有房间级操作的权威授权来源，会话层在每次
//! join/send/typing 时都要重新查询，而不是在连接上缓存。

use async_trait::async_trait;

use crate::entities::room::RoomMemberProfile;
use crate::repositories::RepositoryResult;
use crate::value_objects::{RoomId, Timestamp, UserId};

#[async_trait]
pub trait RoomMemberRepository: Send + Sync {
    /// 用户是否为房间成员
    async fn is_member(&self, room_id: RoomId, user_id: UserId) -> RepositoryResult<bool>;

    /// 添加成员，已存在时为幂等 no-op
    async fn upsert(
        &self,
        room_id: RoomId,
        user_id: UserId,
        joined_at: Timestamp,
    ) -> RepositoryResult<()>;

    /// 房间成员列表（含用户展示信息）
    async fn list_profiles(&self, room_id: RoomId) -> RepositoryResult<Vec<RoomMemberProfile>>;
}
