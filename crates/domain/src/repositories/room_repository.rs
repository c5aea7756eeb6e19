//! 房间仓储接口

use async_trait::async_trait;

use crate::entities::room::Room;
use crate::repositories::RepositoryResult;
use crate::value_objects::{RoomId, UserId};

/// 待创建的房间记录
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub name: String,
    pub is_private: bool,
    pub invite_code: Option<String>,
    pub created_by: UserId,
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// 创建房间
    async fn create(&self, room: NewRoom) -> RepositoryResult<Room>;

    /// 根据ID查找房间
    async fn find_by_id(&self, id: RoomId) -> RepositoryResult<Option<Room>>;

    /// 列出用户加入的所有房间
    async fn list_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<Room>>;
}
