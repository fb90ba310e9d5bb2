use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use gavel_types::api::{BidResponse, Claims, PlaceBidRequest};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, run_blocking};
use crate::{parse_ts, parse_uuid};

/// Record a bid on a property. Only agents may submit; a bid is placed
/// on behalf of the named bidder. An accepted bid fans out notifications
/// to the bidder and the property owner in the same transaction as the
/// bid record; a rejected bid produces none.
pub async fn place_bid(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(property_id): Path<Uuid>,
    Json(req): Json<PlaceBidRequest>,
) -> ApiResult<impl IntoResponse> {
    if claims.role != "agent" {
        return Err(ApiError::Forbidden);
    }
    if req.amount <= 0 {
        return Err(ApiError::BadRequest("bid amount must be positive".into()));
    }

    let db = state.clone();
    let pid = property_id.to_string();
    let bidder = req.bidder_id.to_string();
    let amount = req.amount;

    let (bid, _notifications) =
        run_blocking(move || db.db.place_bid(&pid, &bidder, amount)).await?;

    Ok((
        StatusCode::CREATED,
        Json(BidResponse {
            id: parse_uuid(&bid.id, "bid id"),
            property_id,
            bidder_id: req.bidder_id,
            amount: bid.amount,
            created_at: parse_ts(&bid.created_at, "created_at"),
        }),
    ))
}
