//! 用例服务

pub mod room_service;
pub mod user_service;

pub use room_service::{CreateRoomRequest, MessagePage, RoomService, RoomServiceDependencies};
pub use user_service::{
    AuthenticateUserRequest, RegisterUserRequest, UserService, UserServiceDependencies,
};
