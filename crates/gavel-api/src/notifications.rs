use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::warn;

use gavel_db::models::NotificationRow;
use gavel_types::api::{
    Claims, MarkNotificationsReadRequest, NotificationListResponse, NotificationResponse,
};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, run_blocking};
use crate::{parse_ts, parse_uuid};

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub limit: Option<i64>,
}

/// The caller's notifications, newest first, with the unread counter.
/// The limit is clamped server-side; asking for more than the ceiling
/// yields the ceiling.
pub async fn get_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let user = claims.sub.to_string();

    let (unread_count, rows) = run_blocking(move || {
        let unread = db.db.unread_notification_count(&user)?;
        let rows = db.db.list_notifications(&user, query.limit)?;
        Ok((unread, rows))
    })
    .await?;

    Ok(Json(NotificationListResponse {
        unread_count,
        notifications: rows.into_iter().map(to_response).collect(),
    }))
}

/// Mark notifications read, either an explicit id list or all at once.
/// Ids that belong to someone else are silently skipped.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MarkNotificationsReadRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let user = claims.sub.to_string();

    match (req.all, req.ids) {
        (Some(true), _) => {
            run_blocking(move || db.db.mark_all_notifications_read(&user)).await?;
        }
        (_, Some(ids)) => {
            let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            run_blocking(move || db.db.mark_notifications_read(&user, &ids)).await?;
        }
        _ => {
            return Err(ApiError::BadRequest(
                "either ids or all=true must be supplied".into(),
            ));
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

fn to_response(row: NotificationRow) -> NotificationResponse {
    let metadata = serde_json::from_str(&row.metadata).unwrap_or_else(|e| {
        warn!("Corrupt metadata on notification '{}': {}", row.id, e);
        serde_json::json!({})
    });

    NotificationResponse {
        id: parse_uuid(&row.id, "notification id"),
        kind: row.kind,
        title: row.title,
        body: row.body,
        href: row.href,
        metadata,
        is_read: row.is_read,
        created_at: parse_ts(&row.created_at, "created_at"),
    }
}
