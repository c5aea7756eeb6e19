//! 用户仓储接口

use async_trait::async_trait;

use crate::entities::user::User;
use crate::repositories::RepositoryResult;
use crate::value_objects::{PasswordHash, Timestamp, UserId};

/// 待创建的用户记录
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: PasswordHash,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 创建用户；邮箱冲突返回 `RepositoryError::Conflict`
    async fn create(&self, user: NewUser) -> RepositoryResult<User>;

    /// 根据邮箱查找用户
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// 根据ID查找用户
    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>>;

    /// 更新最后在线时间，用户完全离线时调用
    async fn set_last_seen(&self, id: UserId, at: Timestamp) -> RepositoryResult<()>;
}
