pub mod message_repository_impl;
pub mod receipt_repository_impl;
pub mod room_member_repository_impl;
pub mod room_repository_impl;
pub mod user_repository_impl;

pub use message_repository_impl::PgMessageRepository;
pub use receipt_repository_impl::PgReceiptRepository;
pub use room_member_repository_impl::PgRoomMemberRepository;
pub use room_repository_impl::PgRoomRepository;
pub use user_repository_impl::PgUserRepository;
