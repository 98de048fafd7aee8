use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    entities::OrderModel,
    errors::ServiceError,
    services::checkout::{CheckoutContext, CheckoutSummary},
    state::AppState,
};

/// Price the cart for checkout without creating anything.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/checkout/summary",
    params(("user_id" = Uuid, Path, description = "Cart owner")),
    request_body = CheckoutContext,
    responses(
        (status = 200, description = "Monetary breakdown for this checkout", body = CheckoutSummary),
        (status = 400, description = "Empty cart, bad shipping method or bad coupon")
    ),
    tag = "checkout"
)]
pub async fn checkout_summary(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(context): Json<CheckoutContext>,
) -> Result<Json<CheckoutSummary>, ServiceError> {
    Ok(Json(state.checkout.checkout_summary(user_id, &context).await?))
}

/// Convert the cart into an order.
///
/// All writes are one transaction; a stock or coupon race aborts the whole
/// checkout with the cart untouched.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/orders",
    params(("user_id" = Uuid, Path, description = "Cart owner")),
    request_body = CheckoutContext,
    responses(
        (status = 201, description = "Created order", body = OrderModel),
        (status = 400, description = "Empty cart, bad shipping method or bad coupon"),
        (status = 409, description = "Transaction conflict, retryable"),
        (status = 422, description = "Insufficient stock")
    ),
    tag = "checkout"
)]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(context): Json<CheckoutContext>,
) -> Result<(StatusCode, Json<OrderModel>), ServiceError> {
    let order = state.checkout.create_order(user_id, context).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Cancel a pending or confirmed order, restoring stock and releasing any
/// coupon redemption.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/orders/{order_id}/cancel",
    params(
        ("user_id" = Uuid, Path, description = "Order owner"),
        ("order_id" = Uuid, Path, description = "Order to cancel")
    ),
    responses(
        (status = 200, description = "Cancelled order", body = OrderModel),
        (status = 400, description = "Order is past the cancellable stages"),
        (status = 404, description = "Order not found for this user")
    ),
    tag = "checkout"
)]
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path((user_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<OrderModel>, ServiceError> {
    Ok(Json(state.checkout.cancel_order(user_id, order_id).await?))
}
