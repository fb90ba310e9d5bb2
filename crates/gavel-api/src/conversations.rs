use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use uuid::Uuid;

use gavel_db::models::{ConversationRow, UserRow};
use gavel_types::api::{
    Claims, ConversationResponse, ConversationSummary, CreateConversationRequest, UserSummary,
};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, run_blocking};
use crate::{parse_ts, parse_uuid};

/// All conversations the caller participates in, most recently active
/// first, each carrying the other participant and an unread count.
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let caller = claims.sub.to_string();

    let rows = run_blocking(move || db.db.list_conversations_for(&caller)).await?;

    let conversations: Vec<ConversationSummary> = rows
        .into_iter()
        .map(|row| ConversationSummary {
            id: parse_uuid(&row.conversation.id, "conversation id"),
            other_participant: UserSummary {
                id: parse_uuid(&row.other_id, "participant id"),
                username: row.other_username,
            },
            unread_count: row.unread_count,
            created_at: parse_ts(&row.conversation.created_at, "created_at"),
            last_message_at: parse_ts(&row.conversation.last_message_at, "last_message_at"),
        })
        .collect();

    Ok(Json(conversations))
}

/// Create-or-fetch the conversation between the caller and another user.
/// Symmetric and idempotent: both participants land on the same record
/// and the same shared key no matter who asked first. A creation race is
/// absorbed by the pair-key constraint and resolved by re-reading.
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateConversationRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.other_user_id == claims.sub {
        return Err(ApiError::BadRequest(
            "cannot start a conversation with yourself".into(),
        ));
    }

    let db = state.clone();
    let caller = claims.sub.to_string();
    let other_id = req.other_user_id.to_string();

    // Key generated up front; only used if this call actually creates
    // the conversation. The server relays it and never uses it itself.
    let shared_key = gavel_crypto::keys::generate_conversation_key();

    let (conversation, other) = run_blocking(move || {
        let other = db
            .db
            .get_user_by_id(&other_id)?
            .ok_or(gavel_db::StoreError::NotFound)?;
        let conversation = db
            .db
            .get_or_create_conversation(&caller, &other_id, &shared_key)?;
        Ok((conversation, other))
    })
    .await?;

    Ok(Json(to_response(conversation, other)))
}

/// Fetch one conversation. Non-participants get the same 404 as a
/// missing id.
pub async fn get_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let caller = claims.sub.to_string();
    let conversation_id = id.to_string();

    let (conversation, other) = run_blocking(move || {
        let conversation = db.db.get_conversation_for(&conversation_id, &caller)?;
        let other_id = conversation.other_participant(&caller).to_string();
        let other = db
            .db
            .get_user_by_id(&other_id)?
            .ok_or(gavel_db::StoreError::NotFound)?;
        Ok((conversation, other))
    })
    .await?;

    Ok(Json(to_response(conversation, other)))
}

fn to_response(conversation: ConversationRow, other: UserRow) -> ConversationResponse {
    ConversationResponse {
        id: parse_uuid(&conversation.id, "conversation id"),
        other_participant: UserSummary {
            id: parse_uuid(&other.id, "user id"),
            username: other.username,
        },
        shared_key: B64.encode(&conversation.shared_key),
        created_at: parse_ts(&conversation.created_at, "created_at"),
        last_message_at: parse_ts(&conversation.last_message_at, "last_message_at"),
    }
}
