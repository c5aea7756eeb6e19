use std::sync::Arc;

use application::{RoomService, SessionManager, UserService};

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub room_service: Arc<RoomService>,
    pub sessions: Arc<SessionManager>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        user_service: Arc<UserService>,
        room_service: Arc<RoomService>,
        sessions: Arc<SessionManager>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            user_service,
            room_service,
            sessions,
            jwt_service,
        }
    }
}
