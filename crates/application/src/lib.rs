//! 应用层实现。
//!
//! 实时核心（在线状态、限流、会话管理、消息扇出、回执追踪）以及
//! 围绕领域模型的用例服务都在这里，外部适配器（密码哈希、时钟、
//! 存储）通过 trait 注入。

pub mod clock;
pub mod error;
pub mod events;
pub mod password;
pub mod presence;
pub mod rate_limiter;
pub mod services;
pub mod session;

pub use clock::{Clock, SystemClock};
pub use error::ApplicationError;
pub use events::{ClientEvent, PresenceStatus, ServerEvent};
pub use password::{BcryptPasswordHasher, PasswordHasher, PasswordHasherError};
pub use presence::PresenceTracker;
pub use rate_limiter::{RateLimitSettings, SlidingWindowLimiter};
pub use services::{RoomService, RoomServiceDependencies, UserService, UserServiceDependencies};
pub use session::{ConnectionId, SessionManager, SessionManagerDependencies};
