//! 基础设施层
//!
//! 领域仓储接口的 PostgreSQL 实现，以及测试和本地开发用的内存实现。

pub mod db;
pub mod memory;

pub use db::repositories::{
    PgMessageRepository, PgReceiptRepository, PgRoomMemberRepository, PgRoomRepository,
    PgUserRepository,
};
pub use db::{create_pg_pool, DbPool};
pub use memory::{
    InMemoryMessageRepository, InMemoryReceiptRepository, InMemoryRoomMemberRepository,
    InMemoryRoomRepository, InMemoryUserRepository, MemoryRepositories,
};
