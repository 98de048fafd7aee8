use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::coupons::{ApplyCouponInput, CouponQuote},
    state::AppState,
};

/// Quote a coupon against the user's current cart subtotal.
///
/// Nothing is reserved: checkout re-validates the code when the order is
/// actually created.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/cart/coupon",
    params(("user_id" = Uuid, Path, description = "Cart owner")),
    request_body = ApplyCouponInput,
    responses(
        (status = 200, description = "Discount quote for this cart", body = CouponQuote),
        (status = 400, description = "Unknown, inactive, expired or capped coupon")
    ),
    tag = "coupons"
)]
pub async fn quote_coupon(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(input): Json<ApplyCouponInput>,
) -> Result<Json<CouponQuote>, ServiceError> {
    let cart = state.carts.get_cart(user_id).await?;
    let quote = state
        .coupons
        .quote(user_id, &input.code, cart.totals.subtotal)
        .await?;
    Ok(Json(quote))
}
