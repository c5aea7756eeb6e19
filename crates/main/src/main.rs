//! 主应用程序入口
//!
//! 启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    BcryptPasswordHasher, RateLimitSettings, RoomService, RoomServiceDependencies, SessionManager,
    SessionManagerDependencies, SystemClock, UserService, UserServiceDependencies,
};
use axum::http::HeaderValue;
use config::AppConfig;
use infrastructure::{
    create_pg_pool, PgMessageRepository, PgReceiptRepository, PgRoomMemberRepository,
    PgRoomRepository, PgUserRepository,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    // 默认配置带有开发密钥，通不过生产校验；只告警不阻止本地启动
    if let Err(err) = config.validate() {
        tracing::warn!(error = %err, "配置未通过生产校验");
    }

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 创建仓储实例
    let users = Arc::new(PgUserRepository::new(pg_pool.clone()));
    let rooms = Arc::new(PgRoomRepository::new(pg_pool.clone()));
    let members = Arc::new(PgRoomMemberRepository::new(pg_pool.clone()));
    let messages = Arc::new(PgMessageRepository::new(pg_pool.clone()));
    let receipts = Arc::new(PgReceiptRepository::new(pg_pool));

    let password_hasher: Arc<dyn application::PasswordHasher> = Arc::new(
        config
            .server
            .bcrypt_cost
            .map(BcryptPasswordHasher::new)
            .unwrap_or_default(),
    );
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);

    // 创建应用层服务
    let user_service = UserService::new(UserServiceDependencies {
        users: users.clone(),
        password_hasher,
    });

    let room_service = RoomService::new(RoomServiceDependencies {
        rooms,
        members: members.clone(),
        messages: messages.clone(),
        clock: clock.clone(),
    });

    let sessions = SessionManager::new(SessionManagerDependencies {
        members,
        messages,
        receipts,
        users,
        clock,
        rate_limit: RateLimitSettings {
            max_messages: config.rate_limit.max_messages,
            window_ms: config.rate_limit.window_ms,
        },
    });

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        expiration_hours: config.jwt.expiration_hours,
    }));

    let state = AppState::new(
        Arc::new(user_service),
        Arc::new(room_service),
        Arc::new(sessions),
        jwt_service,
    );

    // CORS：未配置来源时放开，交给反向代理收紧
    let cors = match &config.server.cors_origin {
        Some(origin) => CorsLayer::permissive()
            .allow_origin(origin.parse::<HeaderValue>().map_err(anyhow::Error::from)?),
        None => CorsLayer::permissive(),
    };

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("聊天服务器启动在 http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
