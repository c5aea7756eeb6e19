use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use application::services::{
    AuthenticateUserRequest, CreateRoomRequest, RegisterUserRequest,
};
use domain::{Message, MessageId, Room, RoomId, Timestamp, UserId};

use crate::auth::TokenResponse;
use crate::websocket::websocket_upgrade;
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomPayload {
    name: String,
    #[serde(default)]
    is_private: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRoomPayload {
    invite_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    cursor: Option<i64>,
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomDto {
    id: RoomId,
    name: String,
    is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    invite_code: Option<String>,
    created_by: UserId,
    created_at: Timestamp,
}

impl From<Room> for RoomDto {
    fn from(room: Room) -> Self {
        Self {
            id: room.id,
            name: room.name,
            is_private: room.is_private,
            invite_code: room.invite_code,
            created_by: room.created_by,
            created_at: room.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageDto {
    id: MessageId,
    room_id: RoomId,
    sender_id: UserId,
    content: String,
    created_at: Timestamp,
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            content: message.content,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryDto {
    messages: Vec<MessageDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_cursor: Option<MessageId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MemberDto {
    user_id: UserId,
    name: String,
    online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_seen: Option<Timestamp>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .route("/ws", get(websocket_upgrade))
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register_user))
        .route("/auth/login", post(login_user))
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/{room_id}/join", post(join_room))
        .route("/rooms/{room_id}/messages", get(get_history))
        .route("/rooms/{room_id}/members", get(get_members))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let user = state
        .user_service
        .register(RegisterUserRequest {
            name: payload.name,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let token = state.jwt_service.generate_token(user.id)?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(AuthenticateUserRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let token = state.jwt_service.generate_token(user.id)?;
    Ok(Json(TokenResponse { token }))
}

async fn list_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RoomDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let rooms = state.room_service.list_rooms(user_id).await?;
    Ok(Json(rooms.into_iter().map(RoomDto::from).collect()))
}

async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRoomPayload>,
) -> Result<(StatusCode, Json<RoomDto>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let room = state
        .room_service
        .create_room(CreateRoomRequest {
            name: payload.name,
            is_private: payload.is_private,
            created_by: user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(room.into())))
}

async fn join_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
    payload: Option<Json<JoinRoomPayload>>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let Json(payload) = payload.unwrap_or_default();
    state
        .room_service
        .join_room(
            RoomId::new(room_id),
            user_id,
            payload.invite_code.as_deref(),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn get_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryDto>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let page = state
        .room_service
        .history(
            RoomId::new(room_id),
            user_id,
            query.limit,
            query.cursor.map(MessageId::new),
        )
        .await?;

    Ok(Json(HistoryDto {
        messages: page.messages.into_iter().map(MessageDto::from).collect(),
        next_cursor: page.next_cursor,
    }))
}

async fn get_members(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
) -> Result<Json<Vec<MemberDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let profiles = state
        .room_service
        .member_profiles(RoomId::new(room_id), user_id)
        .await?;

    let members = profiles
        .into_iter()
        .map(|profile| MemberDto {
            online: state.sessions.is_online(profile.user_id),
            user_id: profile.user_id,
            name: profile.name,
            last_seen: profile.last_seen,
        })
        .collect();

    Ok(Json(members))
}
