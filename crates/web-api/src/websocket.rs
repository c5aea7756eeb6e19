//! WebSocket 接入层
//!
//! 升级前完成 JWT 握手认证，升级后把连接注册进会话管理器：
//! 出站事件经 mpsc 通道序列化为 JSON 文本帧，入站文本帧解析为
//! 客户端事件后交给会话管理器处理，解析失败静默丢弃。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use application::{ClientEvent, ServerEvent};
use domain::UserId;

use crate::state::AppState;

/// WebSocket连接查询参数
#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    /// JWT access token，亦可放在 Authorization header
    pub token: Option<String>,
}

/// 处理WebSocket连接升级
///
/// token 无效或缺失时在升级前拒绝（401），连接不建立。
pub async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WebSocketQuery>,
) -> Result<Response, StatusCode> {
    let user_id = authenticate(&state, &headers, &query)?;

    tracing::info!(user_id = %user_id, "WebSocket upgrade authenticated");

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// 握手认证：优先 query 参数，其次 Bearer header
fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    query: &WebSocketQuery,
) -> Result<UserId, StatusCode> {
    if let Some(token) = &query.token {
        return state
            .jwt_service
            .verify_token(token)
            .map_err(|_| StatusCode::UNAUTHORIZED);
    }

    state
        .jwt_service
        .extract_user_from_headers(headers)
        .map_err(|_| StatusCode::UNAUTHORIZED)
}

/// 处理单条WebSocket连接的完整生命周期
async fn handle_socket(socket: WebSocket, state: AppState, user_id: UserId) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let connection_id = state.sessions.register(user_id, event_tx).await;

    tracing::info!(user_id = %user_id, connection_id = %connection_id, "WebSocket connection established");

    // 发送任务：会话管理器投递的事件序列化后写入 socket
    let send_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to serialize websocket payload");
                    continue;
                }
            };
            if ws_sender.send(WsMessage::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // 接收任务：文本帧解析为客户端事件，其余帧按协议处理
    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_receiver.next().await {
            match message {
                WsMessage::Text(text) => {
                    match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => {
                            recv_state.sessions.handle_event(connection_id, event).await;
                        }
                        Err(err) => {
                            // 畸形负载静默丢弃，连接保持
                            tracing::debug!(error = %err, "dropping malformed client event");
                        }
                    }
                }
                WsMessage::Close(_) => {
                    tracing::debug!(connection_id = %connection_id, "client closed connection");
                    break;
                }
                // Ping 由底层自动回应 Pong
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Binary(_) => {}
            }
        }
    });

    // 任一方向结束即视为连接断开
    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    state.sessions.unregister(connection_id).await;

    tracing::info!(user_id = %user_id, connection_id = %connection_id, "WebSocket connection closed");
}
