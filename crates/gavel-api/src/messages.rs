use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use uuid::Uuid;

use gavel_db::models::MessageRow;
use gavel_types::api::{Claims, MessageResponse, SendMessageRequest};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, run_blocking};
use crate::{parse_ts, parse_uuid};

/// All messages of a conversation, oldest first, content returned as the
/// base64 ciphertext exactly as it was stored.
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let caller = claims.sub.to_string();
    let cid = conversation_id.to_string();

    let rows = run_blocking(move || db.db.list_messages(&cid, &caller)).await?;

    let messages: Vec<MessageResponse> = rows.into_iter().map(to_response).collect();
    Ok(Json(messages))
}

/// Append one message. The body carries base64 ciphertext; the server
/// decodes the transport encoding and stores the bytes untouched.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = B64
        .decode(&req.content)
        .map_err(|_| ApiError::BadRequest("content must be valid base64".into()))?;

    let db = state.clone();
    let sender = claims.sub.to_string();
    let cid = conversation_id.to_string();

    let row = run_blocking(move || db.db.append_message(&cid, &sender, &content)).await?;

    Ok((StatusCode::CREATED, Json(to_response(row))))
}

/// Mark everything the other participant sent as read. Safe to repeat;
/// a second call with nothing unread is a no-op success.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let reader = claims.sub.to_string();
    let cid = conversation_id.to_string();

    run_blocking(move || db.db.mark_messages_read(&cid, &reader)).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn to_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: parse_uuid(&row.id, "message id"),
        conversation_id: parse_uuid(&row.conversation_id, "conversation id"),
        sender_id: parse_uuid(&row.sender_id, "sender id"),
        content: B64.encode(&row.content),
        is_read: row.is_read,
        created_at: parse_ts(&row.created_at, "created_at"),
    }
}
