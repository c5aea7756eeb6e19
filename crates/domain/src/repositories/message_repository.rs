//! 消息仓储接口

use async_trait::async_trait;

use crate::entities::message::Message;
use crate::repositories::RepositoryResult;
use crate::value_objects::{MessageId, RoomId, Timestamp, UserId};

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 持久化一条消息并分配单调递增的ID。
    ///
    /// ID 分配必须是原子的：并发写入的全序完全由这里决定。
    async fn create(
        &self,
        room_id: RoomId,
        sender_id: UserId,
        content: String,
        created_at: Timestamp,
    ) -> RepositoryResult<Message>;

    /// 根据ID查找消息
    async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>>;

    /// 获取房间历史，按 ID 倒序分页。
    /// `before` 为上一页最后一条消息的 ID（游标），None 表示从最新开始。
    async fn list_by_room(
        &self,
        room_id: RoomId,
        before: Option<MessageId>,
        limit: u32,
    ) -> RepositoryResult<Vec<Message>>;
}
