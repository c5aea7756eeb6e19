//! 实时协议事件定义
//!
//! 入站事件是一个封闭的带标签枚举，会话管理器对其做穷尽匹配；
//! 线上格式为 `{"type": "...", ...}` 的 JSON，字段用 camelCase。

use domain::{MessageId, RoomId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// 客户端 → 服务端事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// 订阅房间（需为成员，否则静默忽略）
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId },

    /// 发送消息
    #[serde(rename_all = "camelCase")]
    SendMessage { room_id: RoomId, content: String },

    /// 输入状态提示
    #[serde(rename_all = "camelCase")]
    Typing { room_id: RoomId, is_typing: bool },

    /// 确认消息已送达
    #[serde(rename_all = "camelCase")]
    MessageDelivered { message_id: MessageId },

    /// 确认消息已读
    #[serde(rename_all = "camelCase")]
    MessageRead { message_id: MessageId },
}

/// 在线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// 服务端 → 客户端事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// 房间内的新消息，发给该房间的所有订阅连接（含发送者自己的其他连接）
    #[serde(rename_all = "camelCase")]
    ReceiveMessage {
        id: MessageId,
        room_id: RoomId,
        sender_id: UserId,
        content: String,
        created_at: Timestamp,
    },

    /// 全进程广播的上/下线边沿事件
    #[serde(rename_all = "camelCase")]
    UserStatus {
        user_id: UserId,
        status: PresenceStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_seen: Option<Timestamp>,
    },

    /// 输入状态，发给房间内除发起连接外的订阅者
    #[serde(rename_all = "camelCase")]
    Typing {
        room_id: RoomId,
        user_id: UserId,
        is_typing: bool,
    },

    /// 回执状态更新，发给消息所在房间的所有订阅者；
    /// 只携带本次刚刚被设置的那个字段
    #[serde(rename_all = "camelCase")]
    MessageStatus {
        message_id: MessageId,
        user_id: UserId,
        #[serde(skip_serializing_if = "Option::is_none")]
        delivered_at: Option<Timestamp>,
        #[serde(skip_serializing_if = "Option::is_none")]
        read_at: Option<Timestamp>,
    },
}
