//! 房间与成员关系实体

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{RoomId, Timestamp, UserId};

/// 聊天房间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// 私有房间需要邀请码才能加入
    pub is_private: bool,
    /// 仅私有房间持有
    pub invite_code: Option<String>,
    pub created_by: UserId,
    pub created_at: Timestamp,
}

impl Room {
    pub fn validate_name(name: &str) -> DomainResult<()> {
        if name.trim().is_empty() {
            return Err(DomainError::validation_error("name", "name is required"));
        }
        Ok(())
    }

    /// 校验加入条件：公开房间直接放行，私有房间比对邀请码。
    pub fn authorize_join(&self, invite_code: Option<&str>) -> DomainResult<()> {
        if !self.is_private {
            return Ok(());
        }
        match (invite_code, self.invite_code.as_deref()) {
            (Some(provided), Some(expected)) if provided == expected => Ok(()),
            _ => Err(DomainError::InviteRequired),
        }
    }
}

/// 房间成员关系，(room_id, user_id) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMember {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub joined_at: Timestamp,
}

/// 成员列表视图：成员关系加上用户展示信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMemberProfile {
    pub user_id: UserId,
    pub name: String,
    pub last_seen: Option<Timestamp>,
}
