//! 消息与已读回执实体

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{MessageId, RoomId, Timestamp, UserId};

/// 消息实体。创建后不可变，ID 由消息存储在持久化时单调分配。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: Timestamp,
}

impl Message {
    /// 校验并规整消息内容：去除首尾空白，拒绝空内容。
    pub fn normalize_content(content: &str) -> DomainResult<String> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation_error(
                "content",
                "content must not be empty",
            ));
        }
        Ok(trimmed.to_string())
    }
}

/// 每 (消息, 用户) 一条的送达/已读回执。
///
/// 两个时间戳彼此独立：`read_at` 被设置并不意味着 `delivered_at` 已设置，
/// 重复确认只是用新的时间戳覆盖对应字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub delivered_at: Option<Timestamp>,
    pub read_at: Option<Timestamp>,
}

/// 回执 upsert 的字段补丁，只更新携带的字段。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReceiptUpdate {
    pub delivered_at: Option<Timestamp>,
    pub read_at: Option<Timestamp>,
}

impl ReceiptUpdate {
    pub fn delivered(at: Timestamp) -> Self {
        Self {
            delivered_at: Some(at),
            read_at: None,
        }
    }

    pub fn read(at: Timestamp) -> Self {
        Self {
            delivered_at: None,
            read_at: Some(at),
        }
    }
}
