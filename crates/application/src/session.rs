//! 会话管理器
//!
//! 持有全部活跃连接及其认证身份和房间订阅，是实时核心的编排者：
//! 连接注册/注销时驱动在线状态追踪器，房间级动作（join/send/typing/回执）
//! 在每次调用时重新校验成员资格，再委托给限流器、消息扇出和回执追踪。
//!
//! 失败语义：除握手外的所有拒绝路径（畸形负载、非成员、限流、持久化
//! 失败）对客户端一律静默，不回传错误帧——统一的沉默使非成员无法
//! 通过探测区分"房间不存在"与"无权限"。持久化失败会记录日志。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use domain::{
    Message, MessageId, MessageRepository, ReceiptRepository, ReceiptUpdate, RoomId,
    RoomMemberRepository, UserId, UserRepository,
};

use crate::clock::Clock;
use crate::events::{PresenceStatus, ServerEvent};
use crate::presence::PresenceTracker;
use crate::rate_limiter::{RateLimitSettings, SlidingWindowLimiter};
use crate::ClientEvent;

/// 连接标识，进程内唯一
pub type ConnectionId = Uuid;

/// 单个连接的出站通道。发送失败说明对端任务已退出，丢弃即可。
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// 一条已认证连接的状态。user_id 在握手时绑定一次，之后不可变。
struct ConnectionState {
    user_id: UserId,
    sender: EventSender,
    rooms: HashSet<RoomId>,
}

/// 会话管理器的外部依赖
pub struct SessionManagerDependencies {
    pub members: Arc<dyn RoomMemberRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub receipts: Arc<dyn ReceiptRepository>,
    pub users: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
    pub rate_limit: RateLimitSettings,
}

pub struct SessionManager {
    connections: RwLock<HashMap<ConnectionId, ConnectionState>>,
    /// 房间 → 订阅连接的倒排索引，与 connections 中的订阅集合同步维护
    room_index: RwLock<HashMap<RoomId, HashSet<ConnectionId>>>,
    presence: PresenceTracker,
    limiter: SlidingWindowLimiter,
    members: Arc<dyn RoomMemberRepository>,
    messages: Arc<dyn MessageRepository>,
    receipts: Arc<dyn ReceiptRepository>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(deps: SessionManagerDependencies) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            room_index: RwLock::new(HashMap::new()),
            presence: PresenceTracker::new(),
            limiter: SlidingWindowLimiter::new(deps.rate_limit),
            members: deps.members,
            messages: deps.messages,
            receipts: deps.receipts,
            users: deps.users,
            clock: deps.clock,
        }
    }

    /// 注册一条已通过握手认证的连接。
    ///
    /// 若用户因此从离线转为在线，向全进程广播一次上线事件。
    pub async fn register(&self, user_id: UserId, sender: EventSender) -> ConnectionId {
        let connection_id = Uuid::new_v4();

        {
            let mut connections = self.connections.write().await;
            connections.insert(
                connection_id,
                ConnectionState {
                    user_id,
                    sender,
                    rooms: HashSet::new(),
                },
            );
        }

        tracing::info!(%connection_id, %user_id, "connection registered");

        if self.presence.connect(user_id) {
            self.broadcast_all(ServerEvent::UserStatus {
                user_id,
                status: PresenceStatus::Online,
                last_seen: None,
            })
            .await;
        }

        connection_id
    }

    /// 注销连接：清理所有房间订阅并驱动在线状态。
    ///
    /// 显式断开与网络异常走同一条路径。用户完全离线时持久化
    /// last_seen 并广播下线事件。
    pub async fn unregister(&self, connection_id: ConnectionId) {
        let removed = {
            let mut connections = self.connections.write().await;
            connections.remove(&connection_id)
        };

        let Some(state) = removed else {
            return;
        };

        {
            let mut room_index = self.room_index.write().await;
            for room_id in &state.rooms {
                if let Some(subscribers) = room_index.get_mut(room_id) {
                    subscribers.remove(&connection_id);
                    if subscribers.is_empty() {
                        room_index.remove(room_id);
                    }
                }
            }
        }

        tracing::info!(%connection_id, user_id = %state.user_id, "connection closed");

        if self.presence.disconnect(state.user_id) {
            let now = self.clock.now();
            if let Err(err) = self.users.set_last_seen(state.user_id, now).await {
                tracing::error!(user_id = %state.user_id, error = %err, "failed to persist last_seen");
            }
            self.broadcast_all(ServerEvent::UserStatus {
                user_id: state.user_id,
                status: PresenceStatus::Offline,
                last_seen: Some(now),
            })
            .await;
        }
    }

    /// 用户当前是否在线（至少一条活跃连接）
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.presence.is_online(user_id)
    }

    /// 处理一条入站事件。封闭枚举，穷尽匹配。
    pub async fn handle_event(&self, connection_id: ConnectionId, event: ClientEvent) {
        let Some(user_id) = self.user_of(connection_id).await else {
            return;
        };

        match event {
            ClientEvent::JoinRoom { room_id } => {
                self.join_room(connection_id, user_id, room_id).await;
            }
            ClientEvent::SendMessage { room_id, content } => {
                self.send_message(user_id, room_id, content).await;
            }
            ClientEvent::Typing { room_id, is_typing } => {
                self.typing(connection_id, user_id, room_id, is_typing).await;
            }
            ClientEvent::MessageDelivered { message_id } => {
                let update = ReceiptUpdate::delivered(self.clock.now());
                self.acknowledge(message_id, user_id, update).await;
            }
            ClientEvent::MessageRead { message_id } => {
                let update = ReceiptUpdate::read(self.clock.now());
                self.acknowledge(message_id, user_id, update).await;
            }
        }
    }

    async fn join_room(&self, connection_id: ConnectionId, user_id: UserId, room_id: RoomId) {
        if !room_id.is_valid() {
            return;
        }
        if !self.check_membership(room_id, user_id).await {
            return;
        }

        // 重复加入是幂等的：订阅集合与倒排索引都是 set。
        // 两把锁不嵌套持有，避免与广播路径（index → connections）互等。
        let still_connected = {
            let mut connections = self.connections.write().await;
            match connections.get_mut(&connection_id) {
                Some(state) => {
                    state.rooms.insert(room_id);
                    true
                }
                None => false,
            }
        };
        if !still_connected {
            return;
        }

        {
            let mut room_index = self.room_index.write().await;
            room_index.entry(room_id).or_default().insert(connection_id);
        }

        // 订阅期间连接可能已注销；回查一次防止倒排索引残留
        if self.user_of(connection_id).await.is_none() {
            let mut room_index = self.room_index.write().await;
            if let Some(subscribers) = room_index.get_mut(&room_id) {
                subscribers.remove(&connection_id);
                if subscribers.is_empty() {
                    room_index.remove(&room_id);
                }
            }
            return;
        }

        tracing::debug!(%connection_id, %user_id, %room_id, "room subscribed");
    }

    /// 消息扇出管道：校验 → 限流 → 持久化 → 广播。
    async fn send_message(&self, user_id: UserId, room_id: RoomId, content: String) {
        if !room_id.is_valid() {
            return;
        }
        let Ok(content) = Message::normalize_content(&content) else {
            return;
        };
        if !self.check_membership(room_id, user_id).await {
            return;
        }
        if !self.limiter.allow(user_id, room_id, self.clock.now()) {
            tracing::debug!(%user_id, %room_id, "send dropped by rate limiter");
            return;
        }

        let message = match self
            .messages
            .create(room_id, user_id, content, self.clock.now())
            .await
        {
            Ok(message) => message,
            Err(err) => {
                // 发送方不会收到错误帧，与其余发送路径的静默语义一致
                tracing::error!(%user_id, %room_id, error = %err, "message persistence failed");
                return;
            }
        };

        self.broadcast_room(
            room_id,
            ServerEvent::ReceiveMessage {
                id: message.id,
                room_id: message.room_id,
                sender_id: message.sender_id,
                content: message.content,
                created_at: message.created_at,
            },
        )
        .await;
    }

    async fn typing(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        room_id: RoomId,
        is_typing: bool,
    ) {
        if !room_id.is_valid() {
            return;
        }
        if !self.check_membership(room_id, user_id).await {
            return;
        }

        self.broadcast_room_except(
            room_id,
            connection_id,
            ServerEvent::Typing {
                room_id,
                user_id,
                is_typing,
            },
        )
        .await;
    }

    /// 回执追踪：upsert 后向消息所在房间广播状态更新。
    ///
    /// 未知的 message_id 整体为 no-op。重复确认只刷新对应时间戳。
    async fn acknowledge(&self, message_id: MessageId, user_id: UserId, update: ReceiptUpdate) {
        let message = match self.messages.find_by_id(message_id).await {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(err) => {
                tracing::error!(%message_id, error = %err, "receipt lookup failed");
                return;
            }
        };

        if let Err(err) = self.receipts.upsert(message_id, user_id, update).await {
            tracing::error!(%message_id, %user_id, error = %err, "receipt upsert failed");
            return;
        }

        // 只携带本次刚刚设置的字段
        self.broadcast_room(
            message.room_id,
            ServerEvent::MessageStatus {
                message_id,
                user_id,
                delivered_at: update.delivered_at,
                read_at: update.read_at,
            },
        )
        .await;
    }

    async fn user_of(&self, connection_id: ConnectionId) -> Option<UserId> {
        let connections = self.connections.read().await;
        connections.get(&connection_id).map(|state| state.user_id)
    }

    /// 成员资格在每个房间级动作上重新校验，永不缓存在连接上。
    /// 存储故障按"拒绝"处理并记录日志。
    async fn check_membership(&self, room_id: RoomId, user_id: UserId) -> bool {
        match self.members.is_member(room_id, user_id).await {
            Ok(is_member) => is_member,
            Err(err) => {
                tracing::error!(%room_id, %user_id, error = %err, "membership check failed");
                false
            }
        }
    }

    /// 向所有活跃连接广播（上/下线边沿事件使用）
    async fn broadcast_all(&self, event: ServerEvent) {
        let connections = self.connections.read().await;
        for state in connections.values() {
            let _ = state.sender.send(event.clone());
        }
    }

    /// 向房间的所有订阅连接广播
    async fn broadcast_room(&self, room_id: RoomId, event: ServerEvent) {
        self.broadcast_room_inner(room_id, None, event).await;
    }

    /// 向房间订阅连接广播，但跳过发起连接（typing 转发使用）
    async fn broadcast_room_except(
        &self,
        room_id: RoomId,
        except: ConnectionId,
        event: ServerEvent,
    ) {
        self.broadcast_room_inner(room_id, Some(except), event).await;
    }

    async fn broadcast_room_inner(
        &self,
        room_id: RoomId,
        except: Option<ConnectionId>,
        event: ServerEvent,
    ) {
        let room_index = self.room_index.read().await;
        let Some(subscribers) = room_index.get(&room_id) else {
            return;
        };
        let connections = self.connections.read().await;
        for connection_id in subscribers {
            if Some(*connection_id) == except {
                continue;
            }
            if let Some(state) = connections.get(connection_id) {
                let _ = state.sender.send(event.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use domain::{
        MessageReceipt, NewUser, RepositoryError, RepositoryResult, RoomMemberProfile, Timestamp,
        User,
    };
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    // ---- 内存桩实现 ----

    #[derive(Default)]
    struct FakeMembers {
        memberships: Mutex<HashSet<(RoomId, UserId)>>,
    }

    impl FakeMembers {
        fn grant(&self, room_id: RoomId, user_id: UserId) {
            self.memberships.lock().unwrap().insert((room_id, user_id));
        }
    }

    #[async_trait]
    impl RoomMemberRepository for FakeMembers {
        async fn is_member(&self, room_id: RoomId, user_id: UserId) -> RepositoryResult<bool> {
            Ok(self.memberships.lock().unwrap().contains(&(room_id, user_id)))
        }

        async fn upsert(
            &self,
            room_id: RoomId,
            user_id: UserId,
            _joined_at: Timestamp,
        ) -> RepositoryResult<()> {
            self.grant(room_id, user_id);
            Ok(())
        }

        async fn list_profiles(&self, _room_id: RoomId) -> RepositoryResult<Vec<RoomMemberProfile>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct FakeMessages {
        next_id: AtomicI64,
        stored: Mutex<HashMap<MessageId, Message>>,
    }

    impl FakeMessages {
        fn count(&self) -> usize {
            self.stored.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MessageRepository for FakeMessages {
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
            self.stored.lock().unwrap().insert(id, message.clone());
            Ok(message)
        }

        async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
            Ok(self.stored.lock().unwrap().get(&id).cloned())
        }

        async fn list_by_room(
            &self,
            _room_id: RoomId,
            _before: Option<MessageId>,
            _limit: u32,
        ) -> RepositoryResult<Vec<Message>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct FakeReceipts {
        rows: Mutex<HashMap<(MessageId, UserId), MessageReceipt>>,
    }

    #[async_trait]
    impl ReceiptRepository for FakeReceipts {
        async fn upsert(
            &self,
            message_id: MessageId,
            user_id: UserId,
            update: ReceiptUpdate,
        ) -> RepositoryResult<MessageReceipt> {
            let mut rows = self.rows.lock().unwrap();
            let receipt = rows.entry((message_id, user_id)).or_insert(MessageReceipt {
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
            Ok(self.rows.lock().unwrap().get(&(message_id, user_id)).cloned())
        }
    }

    #[derive(Default)]
    struct FakeUsers {
        last_seen: Mutex<Vec<(UserId, Timestamp)>>,
    }

    #[async_trait]
    impl UserRepository for FakeUsers {
        async fn create(&self, _user: NewUser) -> RepositoryResult<User> {
            Err(RepositoryError::storage("not supported in tests"))
        }

        async fn find_by_email(&self, _email: &str) -> RepositoryResult<Option<User>> {
            Ok(None)
        }

        async fn find_by_id(&self, _id: UserId) -> RepositoryResult<Option<User>> {
            Ok(None)
        }

        async fn set_last_seen(&self, id: UserId, at: Timestamp) -> RepositoryResult<()> {
            self.last_seen.lock().unwrap().push((id, at));
            Ok(())
        }
    }

    struct ManualClock {
        now: Mutex<Timestamp>,
    }

    impl ManualClock {
        fn at_ms(ms: i64) -> Self {
            Self {
                now: Mutex::new(Utc.timestamp_millis_opt(ms).unwrap()),
            }
        }

        fn advance_ms(&self, ms: i64) {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::milliseconds(ms);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            *self.now.lock().unwrap()
        }
    }

    // ---- 测试装置 ----

    struct Fixture {
        sessions: SessionManager,
        members: Arc<FakeMembers>,
        messages: Arc<FakeMessages>,
        receipts: Arc<FakeReceipts>,
        users: Arc<FakeUsers>,
        clock: Arc<ManualClock>,
    }

    fn fixture_with_rate_limit(rate_limit: RateLimitSettings) -> Fixture {
        let members = Arc::new(FakeMembers::default());
        let messages = Arc::new(FakeMessages::default());
        let receipts = Arc::new(FakeReceipts::default());
        let users = Arc::new(FakeUsers::default());
        let clock = Arc::new(ManualClock::at_ms(1_700_000_000_000));

        let sessions = SessionManager::new(SessionManagerDependencies {
            members: members.clone(),
            messages: messages.clone(),
            receipts: receipts.clone(),
            users: users.clone(),
            clock: clock.clone(),
            rate_limit,
        });

        Fixture {
            sessions,
            members,
            messages,
            receipts,
            users,
            clock,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_rate_limit(RateLimitSettings {
            max_messages: 100,
            window_ms: 10_000,
        })
    }

    struct Client {
        id: ConnectionId,
        rx: mpsc::UnboundedReceiver<ServerEvent>,
    }

    impl Client {
        fn drain(&mut self) -> Vec<ServerEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    async fn connect(fixture: &Fixture, user_id: UserId) -> Client {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = fixture.sessions.register(user_id, tx).await;
        Client { id, rx }
    }

    async fn join(fixture: &Fixture, client: &Client, room_id: RoomId) {
        fixture
            .sessions
            .handle_event(client.id, ClientEvent::JoinRoom { room_id })
            .await;
    }

    const ROOM: RoomId = RoomId(1);
    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    // ---- 用例 ----

    #[tokio::test]
    async fn presence_edges_fire_exactly_once() {
        let fx = fixture();
        let mut observer = connect(&fx, ALICE).await;
        observer.drain();

        // Bob 开三个连接，只有第一个产生上线事件
        let bob1 = connect(&fx, BOB).await;
        let bob2 = connect(&fx, BOB).await;
        let bob3 = connect(&fx, BOB).await;

        let online: Vec<_> = observer
            .drain()
            .into_iter()
            .filter(|e| {
                matches!(e, ServerEvent::UserStatus { user_id, status: PresenceStatus::Online, .. } if *user_id == BOB)
            })
            .collect();
        assert_eq!(online.len(), 1);

        // 前两次断开没有事件，最后一次产生下线事件并记录 last_seen
        fx.sessions.unregister(bob1.id).await;
        fx.sessions.unregister(bob2.id).await;
        assert!(observer.drain().is_empty());

        fx.sessions.unregister(bob3.id).await;
        let events = observer.drain();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerEvent::UserStatus {
                user_id,
                status: PresenceStatus::Offline,
                last_seen,
            } => {
                assert_eq!(*user_id, BOB);
                assert!(last_seen.is_some());
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(fx.users.last_seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_member_send_is_silently_dropped() {
        let fx = fixture();
        fx.members.grant(ROOM, BOB);

        let mut alice = connect(&fx, ALICE).await;
        let mut bob = connect(&fx, BOB).await;
        join(&fx, &bob, ROOM).await;
        alice.drain();
        bob.drain();

        // Alice 不是成员：不持久化、无人收到广播
        fx.sessions
            .handle_event(
                alice.id,
                ClientEvent::SendMessage {
                    room_id: ROOM,
                    content: "sneaky".to_string(),
                },
            )
            .await;

        assert_eq!(fx.messages.count(), 0);
        assert!(bob.drain().is_empty());
        assert!(alice.drain().is_empty());
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let fx = fixture();
        fx.members.grant(ROOM, ALICE);
        fx.members.grant(ROOM, BOB);

        let mut alice = connect(&fx, ALICE).await;
        let bob = connect(&fx, BOB).await;
        join(&fx, &alice, ROOM).await;
        join(&fx, &alice, ROOM).await;
        join(&fx, &bob, ROOM).await;
        alice.drain();

        fx.sessions
            .handle_event(
                bob.id,
                ClientEvent::SendMessage {
                    room_id: ROOM,
                    content: "once".to_string(),
                },
            )
            .await;

        // 重复 join 不产生重复投递
        let received: Vec<_> = alice
            .drain()
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::ReceiveMessage { .. }))
            .collect();
        assert_eq!(received.len(), 1);
    }

    #[tokio::test]
    async fn empty_content_is_ignored() {
        let fx = fixture();
        fx.members.grant(ROOM, ALICE);
        let alice = connect(&fx, ALICE).await;
        join(&fx, &alice, ROOM).await;

        fx.sessions
            .handle_event(
                alice.id,
                ClientEvent::SendMessage {
                    room_id: ROOM,
                    content: "   \n ".to_string(),
                },
            )
            .await;

        assert_eq!(fx.messages.count(), 0);
    }

    #[tokio::test]
    async fn content_is_trimmed_before_broadcast() {
        let fx = fixture();
        fx.members.grant(ROOM, ALICE);
        let mut alice = connect(&fx, ALICE).await;
        join(&fx, &alice, ROOM).await;
        alice.drain();

        fx.sessions
            .handle_event(
                alice.id,
                ClientEvent::SendMessage {
                    room_id: ROOM,
                    content: "  hello  ".to_string(),
                },
            )
            .await;

        // 发送者自己的订阅连接也收到广播
        let events = alice.drain();
        match &events[..] {
            [ServerEvent::ReceiveMessage { content, .. }] => assert_eq!(content, "hello"),
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limited_send_is_dropped_without_error() {
        let fx = fixture_with_rate_limit(RateLimitSettings {
            max_messages: 2,
            window_ms: 10_000,
        });
        fx.members.grant(ROOM, ALICE);
        let mut alice = connect(&fx, ALICE).await;
        join(&fx, &alice, ROOM).await;
        alice.drain();

        for _ in 0..5 {
            fx.sessions
                .handle_event(
                    alice.id,
                    ClientEvent::SendMessage {
                        room_id: ROOM,
                        content: "spam".to_string(),
                    },
                )
                .await;
            fx.clock.advance_ms(1);
        }

        assert_eq!(fx.messages.count(), 2);
        let received = alice.drain();
        assert_eq!(received.len(), 2);
        // 没有任何错误帧
        assert!(received
            .iter()
            .all(|e| matches!(e, ServerEvent::ReceiveMessage { .. })));
    }

    #[tokio::test]
    async fn typing_is_relayed_to_others_only() {
        let fx = fixture();
        fx.members.grant(ROOM, ALICE);
        fx.members.grant(ROOM, BOB);

        let mut alice = connect(&fx, ALICE).await;
        let mut bob = connect(&fx, BOB).await;
        join(&fx, &alice, ROOM).await;
        join(&fx, &bob, ROOM).await;
        alice.drain();
        bob.drain();

        fx.sessions
            .handle_event(
                alice.id,
                ClientEvent::Typing {
                    room_id: ROOM,
                    is_typing: true,
                },
            )
            .await;

        let bob_events = bob.drain();
        assert_eq!(
            bob_events,
            vec![ServerEvent::Typing {
                room_id: ROOM,
                user_id: ALICE,
                is_typing: true,
            }]
        );
        // 发起者不会收到自己的 typing 回显
        assert!(alice.drain().is_empty());
    }

    #[tokio::test]
    async fn receipts_upsert_independently_and_idempotently() {
        let fx = fixture();
        fx.members.grant(ROOM, ALICE);
        fx.members.grant(ROOM, BOB);

        let mut alice = connect(&fx, ALICE).await;
        let bob = connect(&fx, BOB).await;
        join(&fx, &alice, ROOM).await;
        join(&fx, &bob, ROOM).await;
        alice.drain();

        fx.sessions
            .handle_event(
                alice.id,
                ClientEvent::SendMessage {
                    room_id: ROOM,
                    content: "hello".to_string(),
                },
            )
            .await;
        let message_id = match &alice.drain()[..] {
            [ServerEvent::ReceiveMessage { id, .. }] => *id,
            other => panic!("unexpected events: {other:?}"),
        };

        // delivered 后 read：同一行上两个字段独立设置
        fx.sessions
            .handle_event(bob.id, ClientEvent::MessageDelivered { message_id })
            .await;
        fx.clock.advance_ms(50);
        fx.sessions
            .handle_event(bob.id, ClientEvent::MessageRead { message_id })
            .await;

        let receipt = fx
            .receipts
            .find(message_id, BOB)
            .await
            .unwrap()
            .expect("receipt row");
        assert!(receipt.delivered_at.is_some());
        assert!(receipt.read_at.is_some());

        // 重复 read 刷新时间戳，不产生第二行
        let first_read = receipt.read_at.unwrap();
        fx.clock.advance_ms(50);
        fx.sessions
            .handle_event(bob.id, ClientEvent::MessageRead { message_id })
            .await;
        let receipt = fx.receipts.find(message_id, BOB).await.unwrap().unwrap();
        assert!(receipt.read_at.unwrap() > first_read);
        assert_eq!(fx.receipts.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn receipt_for_unknown_message_is_noop() {
        let fx = fixture();
        fx.members.grant(ROOM, ALICE);
        let mut alice = connect(&fx, ALICE).await;
        join(&fx, &alice, ROOM).await;
        alice.drain();

        fx.sessions
            .handle_event(
                alice.id,
                ClientEvent::MessageDelivered {
                    message_id: MessageId::new(999),
                },
            )
            .await;

        assert!(fx.receipts.rows.lock().unwrap().is_empty());
        assert!(alice.drain().is_empty());
    }

    #[tokio::test]
    async fn delivery_receipt_round_trip() {
        // 端到端场景：A 发消息，B 收到后回送达确认，A 收到状态更新
        let fx = fixture();
        fx.members.grant(ROOM, ALICE);
        fx.members.grant(ROOM, BOB);

        let mut alice = connect(&fx, ALICE).await;
        let mut bob = connect(&fx, BOB).await;
        join(&fx, &alice, ROOM).await;
        join(&fx, &bob, ROOM).await;
        alice.drain();
        bob.drain();

        fx.sessions
            .handle_event(
                alice.id,
                ClientEvent::SendMessage {
                    room_id: ROOM,
                    content: "hello".to_string(),
                },
            )
            .await;

        let message_id = match &bob.drain()[..] {
            [ServerEvent::ReceiveMessage {
                id,
                room_id,
                sender_id,
                content,
                ..
            }] => {
                assert_eq!(*room_id, ROOM);
                assert_eq!(*sender_id, ALICE);
                assert_eq!(content, "hello");
                *id
            }
            other => panic!("unexpected events: {other:?}"),
        };
        alice.drain();

        fx.sessions
            .handle_event(bob.id, ClientEvent::MessageDelivered { message_id })
            .await;

        let alice_events = alice.drain();
        match &alice_events[..] {
            [ServerEvent::MessageStatus {
                message_id: status_id,
                user_id,
                delivered_at,
                read_at,
            }] => {
                assert_eq!(*status_id, message_id);
                assert_eq!(*user_id, BOB);
                assert!(delivered_at.is_some());
                assert!(read_at.is_none());
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unregister_removes_subscriptions() {
        let fx = fixture();
        fx.members.grant(ROOM, ALICE);
        fx.members.grant(ROOM, BOB);

        let mut alice = connect(&fx, ALICE).await;
        let bob = connect(&fx, BOB).await;
        join(&fx, &alice, ROOM).await;
        join(&fx, &bob, ROOM).await;

        fx.sessions.unregister(alice.id).await;

        fx.sessions
            .handle_event(
                bob.id,
                ClientEvent::SendMessage {
                    room_id: ROOM,
                    content: "anyone here?".to_string(),
                },
            )
            .await;

        // 已注销连接不再收到任何房间广播
        assert!(alice
            .drain()
            .iter()
            .all(|e| !matches!(e, ServerEvent::ReceiveMessage { .. })));
    }

    #[tokio::test]
    async fn invalid_room_id_is_dropped() {
        let fx = fixture();
        let alice = connect(&fx, ALICE).await;

        fx.sessions
            .handle_event(
                alice.id,
                ClientEvent::JoinRoom {
                    room_id: RoomId::new(-1),
                },
            )
            .await;
        fx.sessions
            .handle_event(
                alice.id,
                ClientEvent::SendMessage {
                    room_id: RoomId::new(0),
                    content: "hi".to_string(),
                },
            )
            .await;

        assert_eq!(fx.messages.count(), 0);
    }
}
