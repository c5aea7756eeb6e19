//! 仓储接口的内存实现
//!
//! 供集成测试和本地开发使用，语义与 PostgreSQL 实现一致：
//! 自增 ID、唯一约束冲突、幂等 upsert。成员表在房间仓储和
//! 成员仓储之间共享，以支持按成员列出房间。

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use domain::{
    Message, MessageId, MessageReceipt, MessageRepository, NewRoom, NewUser, ReceiptRepository,
    ReceiptUpdate, RepositoryError, RepositoryResult, Room, RoomId, RoomMember,
    RoomMemberProfile, RoomMemberRepository, RoomRepository, Timestamp, User, UserId,
    UserRepository,
};

type MembershipTable = Arc<RwLock<HashMap<(RoomId, UserId), RoomMember>>>;
type UserTable = Arc<RwLock<HashMap<UserId, User>>>;

/// 一套互相接通的内存仓储
pub struct MemoryRepositories {
    pub users: Arc<InMemoryUserRepository>,
    pub rooms: Arc<InMemoryRoomRepository>,
    pub members: Arc<InMemoryRoomMemberRepository>,
    pub messages: Arc<InMemoryMessageRepository>,
    pub receipts: Arc<InMemoryReceiptRepository>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        let user_table: UserTable = Arc::new(RwLock::new(HashMap::new()));
        let membership: MembershipTable = Arc::new(RwLock::new(HashMap::new()));
        Self {
            users: Arc::new(InMemoryUserRepository::with_table(user_table.clone())),
            rooms: Arc::new(InMemoryRoomRepository::with_memberships(membership.clone())),
            members: Arc::new(InMemoryRoomMemberRepository::new(membership, user_table)),
            messages: Arc::new(InMemoryMessageRepository::new()),
            receipts: Arc::new(InMemoryReceiptRepository::new()),
        }
    }
}

impl Default for MemoryRepositories {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InMemoryUserRepository {
    next_id: AtomicI64,
    users: UserTable,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::with_table(Arc::new(RwLock::new(HashMap::new())))
    }

    fn with_table(users: UserTable) -> Self {
        Self {
            next_id: AtomicI64::new(0),
            users,
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict);
        }

        let id = UserId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let user = User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            last_seen: None,
            created_at: chrono::Utc::now(),
        };
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn set_last_seen(&self, id: UserId, at: Timestamp) -> RepositoryResult<()> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&id) {
            user.last_seen = Some(at);
        }
        Ok(())
    }
}

pub struct InMemoryRoomRepository {
    next_id: AtomicI64,
    rooms: RwLock<HashMap<RoomId, Room>>,
    memberships: MembershipTable,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self::with_memberships(Arc::new(RwLock::new(HashMap::new())))
    }

    fn with_memberships(memberships: MembershipTable) -> Self {
        Self {
            next_id: AtomicI64::new(0),
            rooms: RwLock::new(HashMap::new()),
            memberships,
        }
    }
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn create(&self, room: NewRoom) -> RepositoryResult<Room> {
        let id = RoomId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let room = Room {
            id,
            name: room.name,
            is_private: room.is_private,
            invite_code: room.invite_code,
            created_by: room.created_by,
            created_at: chrono::Utc::now(),
        };
        self.rooms.write().await.insert(id, room.clone());
        Ok(room)
    }

    async fn find_by_id(&self, id: RoomId) -> RepositoryResult<Option<Room>> {
        Ok(self.rooms.read().await.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<Room>> {
        let room_ids: Vec<RoomId> = {
            let memberships = self.memberships.read().await;
            memberships
                .keys()
                .filter(|(_, member)| *member == user_id)
                .map(|(room_id, _)| *room_id)
                .collect()
        };

        let rooms = self.rooms.read().await;
        let mut joined: Vec<Room> = room_ids
            .into_iter()
            .filter_map(|id| rooms.get(&id).cloned())
            .collect();
        joined.sort_by_key(|room| room.id);
        Ok(joined)
    }
}

pub struct InMemoryRoomMemberRepository {
    members: MembershipTable,
    users: UserTable,
}

impl InMemoryRoomMemberRepository {
    fn new(members: MembershipTable, users: UserTable) -> Self {
        Self { members, users }
    }
}

#[async_trait]
impl RoomMemberRepository for InMemoryRoomMemberRepository {
    async fn is_member(&self, room_id: RoomId, user_id: UserId) -> RepositoryResult<bool> {
        let members = self.members.read().await;
        Ok(members.contains_key(&(room_id, user_id)))
    }

    async fn upsert(
        &self,
        room_id: RoomId,
        user_id: UserId,
        joined_at: Timestamp,
    ) -> RepositoryResult<()> {
        let mut members = self.members.write().await;
        members.entry((room_id, user_id)).or_insert(RoomMember {
            room_id,
            user_id,
            joined_at,
        });
        Ok(())
    }

    async fn list_profiles(&self, room_id: RoomId) -> RepositoryResult<Vec<RoomMemberProfile>> {
        let member_ids: Vec<UserId> = {
            let members = self.members.read().await;
            members
                .keys()
                .filter(|(room, _)| *room == room_id)
                .map(|(_, user_id)| *user_id)
                .collect()
        };

        let users = self.users.read().await;
        let mut profiles: Vec<RoomMemberProfile> = member_ids
            .into_iter()
            .filter_map(|user_id| {
                users.get(&user_id).map(|user| RoomMemberProfile {
                    user_id,
                    name: user.name.clone(),
                    last_seen: user.last_seen,
                })
            })
            .collect();
        profiles.sort_by_key(|profile| profile.user_id);
        Ok(profiles)
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    next_id: AtomicI64,
    messages: RwLock<HashMap<MessageId, Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(
        &self,
        room_id: RoomId,
        sender_id: UserId,
        content: String,
        created_at: Timestamp,
    ) -> RepositoryResult<Message> {
        let id = MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let message = Message {
            id,
            room_id,
            sender_id,
            content,
            created_at,
        };
        self.messages.write().await.insert(id, message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        Ok(self.messages.read().await.get(&id).cloned())
    }

    async fn list_by_room(
        &self,
        room_id: RoomId,
        before: Option<MessageId>,
        limit: u32,
    ) -> RepositoryResult<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut page: Vec<Message> = messages
            .values()
            .filter(|message| message.room_id == room_id)
            .filter(|message| before.is_none_or(|cursor| message.id < cursor))
            .cloned()
            .collect();
        page.sort_by(|a, b| b.id.cmp(&a.id));
        page.truncate(limit as usize);
        Ok(page)
    }
}

#[derive(Default)]
pub struct InMemoryReceiptRepository {
    receipts: RwLock<HashMap<(MessageId, UserId), MessageReceipt>>,
}

impl InMemoryReceiptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReceiptRepository for InMemoryReceiptRepository {
    async fn upsert(
        &self,
        message_id: MessageId,
        user_id: UserId,
        update: ReceiptUpdate,
    ) -> RepositoryResult<MessageReceipt> {
        let mut receipts = self.receipts.write().await;
        let receipt = receipts.entry((message_id, user_id)).or_insert(MessageReceipt {
            message_id,
            user_id,
            delivered_at: None,
            read_at: None,
        });
        if let Some(at) = update.delivered_at {
            receipt.delivered_at = Some(at);
        }
        if let Some(at) = update.read_at {
            receipt.read_at = Some(at);
        }
        Ok(receipt.clone())
    }

    async fn find(
        &self,
        message_id: MessageId,
        user_id: UserId,
    ) -> RepositoryResult<Option<MessageReceipt>> {
        let receipts = self.receipts.read().await;
        Ok(receipts.get(&(message_id, user_id)).cloned())
    }
}
