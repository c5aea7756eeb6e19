//! 仓储接口定义
//!
//! 领域层只依赖这些接口；PostgreSQL 与内存实现位于 infrastructure。

pub mod message_repository;
pub mod receipt_repository;
pub mod room_member_repository;
pub mod room_repository;
pub mod user_repository;

pub use message_repository::MessageRepository;
pub use receipt_repository::ReceiptRepository;
pub use room_member_repository::RoomMemberRepository;
pub use room_repository::{NewRoom, RoomRepository};
pub use user_repository::{NewUser, UserRepository};

use thiserror::Error;

/// 仓储层错误类型
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 目标记录不存在
    #[error("record not found")]
    NotFound,

    /// 唯一约束冲突
    #[error("record conflicts with an existing one")]
    Conflict,

    /// 底层存储故障
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

/// 仓储层结果类型
pub type RepositoryResult<T> = Result<T, RepositoryError>;
