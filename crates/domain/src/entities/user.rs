//! 用户实体定义

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{PasswordHash, Timestamp, UserId};

/// 用户实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// 用户唯一ID
    pub id: UserId,
    /// 显示名称
    pub name: String,
    /// 登录邮箱，全局唯一
    pub email: String,
    /// 密码哈希，永不对外序列化
    #[serde(skip_serializing)]
    pub password_hash: PasswordHash,
    /// 最后一次完全离线的时间
    pub last_seen: Option<Timestamp>,
    /// 注册时间
    pub created_at: Timestamp,
}

impl User {
    /// 校验注册字段
    pub fn validate_registration(name: &str, email: &str, password: &str) -> DomainResult<()> {
        if name.trim().is_empty() {
            return Err(DomainError::validation_error("name", "name is required"));
        }
        if email.trim().is_empty() || !email.contains('@') {
            return Err(DomainError::validation_error(
                "email",
                "a valid email is required",
            ));
        }
        if password.is_empty() {
            return Err(DomainError::validation_error(
                "password",
                "password is required",
            ));
        }
        Ok(())
    }
}
