//! 消息回执仓储接口

use async_trait::async_trait;

use crate::entities::message::{MessageReceipt, ReceiptUpdate};
use crate::repositories::RepositoryResult;
use crate::value_objects::{MessageId, UserId};

#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    /// 对 (message_id, user_id) 回执做 upsert：不存在则创建，
    /// 存在则只覆盖补丁中携带的字段，另一个字段保持原值。
    /// 同一键永远只有一行。
    async fn upsert(
        &self,
        message_id: MessageId,
        user_id: UserId,
        update: ReceiptUpdate,
    ) -> RepositoryResult<MessageReceipt>;

    /// 查询单条回执
    async fn find(
        &self,
        message_id: MessageId,
        user_id: UserId,
    ) -> RepositoryResult<Option<MessageReceipt>>;
}
