use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{
    BcryptPasswordHasher, RateLimitSettings, RoomService, RoomServiceDependencies, SessionManager,
    SessionManagerDependencies, SystemClock, UserService, UserServiceDependencies,
};
use axum::Router;
use infrastructure::MemoryRepositories;
use tokio::{net::TcpListener, sync::oneshot, time::sleep};
use web_api::{router as build_router_fn, AppState, JwtConfig, JwtService};

pub fn build_router() -> Router {
    let repos = MemoryRepositories::new();

    // 最低 bcrypt cost，测试只关心流程
    let password_hasher: Arc<dyn application::PasswordHasher> =
        Arc::new(BcryptPasswordHasher::new(4));
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);

    let user_service = UserService::new(UserServiceDependencies {
        users: repos.users.clone(),
        password_hasher,
    });

    let room_service = RoomService::new(RoomServiceDependencies {
        rooms: repos.rooms.clone(),
        members: repos.members.clone(),
        messages: repos.messages.clone(),
        clock: clock.clone(),
    });

    let sessions = SessionManager::new(SessionManagerDependencies {
        members: repos.members.clone(),
        messages: repos.messages.clone(),
        receipts: repos.receipts.clone(),
        users: repos.users.clone(),
        clock,
        rate_limit: RateLimitSettings::default(),
    });

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: "test-secret-key-with-at-least-32-chars!".to_string(),
        expiration_hours: 168,
    }));

    let state = AppState::new(
        Arc::new(user_service),
        Arc::new(room_service),
        Arc::new(sessions),
        jwt_service,
    );

    build_router_fn(state)
}

/// 启动一个绑定随机端口的测试服务器
pub async fn spawn_server() -> (SocketAddr, oneshot::Sender<()>) {
    let router = build_router();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    // allow server to start
    sleep(Duration::from_millis(50)).await;

    (addr, shutdown_tx)
}
