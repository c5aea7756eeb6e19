//! 房间用例：创建、加入、列表、历史、成员

use std::sync::Arc;

use rand::distr::{Alphanumeric, SampleString};

use domain::{
    DomainError, Message, MessageId, MessageRepository, NewRoom, Room, RoomId,
    RoomMemberProfile, RoomMemberRepository, RoomRepository, UserId,
};

use crate::clock::Clock;
use crate::error::ApplicationError;

/// 历史分页默认/上限
const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 100;

/// 私有房间邀请码长度
const INVITE_CODE_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct CreateRoomRequest {
    pub name: String,
    pub is_private: bool,
    pub created_by: UserId,
}

/// 一页历史消息，ID 倒序；next_cursor 为下一页游标
#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub next_cursor: Option<MessageId>,
}

pub struct RoomServiceDependencies {
    pub rooms: Arc<dyn RoomRepository>,
    pub members: Arc<dyn RoomMemberRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct RoomService {
    rooms: Arc<dyn RoomRepository>,
    members: Arc<dyn RoomMemberRepository>,
    messages: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
}

impl RoomService {
    pub fn new(deps: RoomServiceDependencies) -> Self {
        Self {
            rooms: deps.rooms,
            members: deps.members,
            messages: deps.messages,
            clock: deps.clock,
        }
    }

    /// 创建房间，创建者自动成为第一个成员。
    /// 私有房间生成随机邀请码。
    pub async fn create_room(&self, request: CreateRoomRequest) -> Result<Room, ApplicationError> {
        Room::validate_name(&request.name)?;

        let invite_code = request
            .is_private
            .then(|| Alphanumeric.sample_string(&mut rand::rng(), INVITE_CODE_LEN).to_lowercase());

        let room = self
            .rooms
            .create(NewRoom {
                name: request.name,
                is_private: request.is_private,
                invite_code,
                created_by: request.created_by,
            })
            .await?;

        self.members
            .upsert(room.id, request.created_by, self.clock.now())
            .await?;

        tracing::info!(room_id = %room.id, created_by = %request.created_by, "room created");
        Ok(room)
    }

    /// 加入房间。私有房间校验邀请码；成员关系 upsert 幂等。
    pub async fn join_room(
        &self,
        room_id: RoomId,
        user_id: UserId,
        invite_code: Option<&str>,
    ) -> Result<(), ApplicationError> {
        let Some(room) = self.rooms.find_by_id(room_id).await? else {
            return Err(ApplicationError::Domain(DomainError::resource_not_found(
                "room",
                room_id.to_string(),
            )));
        };

        room.authorize_join(invite_code)?;

        self.members.upsert(room_id, user_id, self.clock.now()).await?;
        Ok(())
    }

    /// 用户加入的房间列表
    pub async fn list_rooms(&self, user_id: UserId) -> Result<Vec<Room>, ApplicationError> {
        Ok(self.rooms.list_for_user(user_id).await?)
    }

    /// 房间历史，仅成员可读。ID 倒序，游标翻页。
    pub async fn history(
        &self,
        room_id: RoomId,
        user_id: UserId,
        limit: Option<u32>,
        cursor: Option<MessageId>,
    ) -> Result<MessagePage, ApplicationError> {
        self.require_member(room_id, user_id).await?;

        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let messages = self.messages.list_by_room(room_id, cursor, limit).await?;
        let next_cursor = messages.last().map(|message| message.id);

        Ok(MessagePage {
            messages,
            next_cursor,
        })
    }

    /// 房间成员列表（展示信息），仅成员可读。
    /// 在线标志由调用方用会话管理器的实时状态补全。
    pub async fn member_profiles(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<Vec<RoomMemberProfile>, ApplicationError> {
        self.require_member(room_id, user_id).await?;
        Ok(self.members.list_profiles(room_id).await?)
    }

    async fn require_member(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<(), ApplicationError> {
        if self.members.is_member(room_id, user_id).await? {
            Ok(())
        } else {
            Err(ApplicationError::Authorization)
        }
    }
}
