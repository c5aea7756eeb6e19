pub mod message;
pub mod room;
pub mod user;

pub use message::{Message, MessageReceipt, ReceiptUpdate};
pub use room::{Room, RoomMember, RoomMemberProfile};
pub use user::User;
