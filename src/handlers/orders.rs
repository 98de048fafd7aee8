use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    entities::{OrderItemModel, OrderModel},
    errors::ServiceError,
    services::orders::{OrderDetails, OrderPage, UpdateItemStatusInput, UpdateStatusInput},
    state::AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

/// The user's order history, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/orders",
    params(("user_id" = Uuid, Path, description = "Order owner"), PageQuery),
    responses((status = 200, description = "One page of orders", body = OrderPage)),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<OrderPage>, ServiceError> {
    Ok(Json(
        state
            .orders
            .list_orders(user_id, query.page, query.per_page)
            .await?,
    ))
}

/// One order with its items and status history.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/orders/{order_id}",
    params(
        ("user_id" = Uuid, Path, description = "Order owner"),
        ("order_id" = Uuid, Path, description = "Order id")
    ),
    responses(
        (status = 200, description = "Order detail", body = OrderDetails),
        (status = 404, description = "Order not found for this user")
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path((user_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<OrderDetails>, ServiceError> {
    Ok(Json(state.orders.get_order(user_id, order_id).await?))
}

/// Staff-side status change for a whole order.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{order_id}/status",
    params(("order_id" = Uuid, Path, description = "Order id")),
    request_body = UpdateStatusInput,
    responses(
        (status = 200, description = "Order after the transition", body = OrderModel),
        (status = 400, description = "Transition not allowed by the lifecycle")
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateStatusInput>,
) -> Result<Json<OrderModel>, ServiceError> {
    Ok(Json(
        state.orders.update_order_status(order_id, input, None).await?,
    ))
}

/// Items across all orders that belong to one vendor.
#[utoipa::path(
    get,
    path = "/api/v1/vendors/{vendor_id}/order-items",
    params(("vendor_id" = Uuid, Path, description = "Vendor id")),
    responses((status = 200, description = "The vendor's order items", body = [OrderItemModel])),
    tag = "vendors"
)]
pub async fn vendor_items(
    State(state): State<Arc<AppState>>,
    Path(vendor_id): Path<Uuid>,
) -> Result<Json<Vec<OrderItemModel>>, ServiceError> {
    Ok(Json(state.orders.vendor_items(vendor_id).await?))
}

/// Vendor-side status change for one of their order items. The parent
/// order follows once every item has reached the same status.
#[utoipa::path(
    put,
    path = "/api/v1/vendors/{vendor_id}/order-items/{item_id}/status",
    params(
        ("vendor_id" = Uuid, Path, description = "Vendor id"),
        ("item_id" = Uuid, Path, description = "Order item id")
    ),
    request_body = UpdateItemStatusInput,
    responses(
        (status = 200, description = "Item after the transition", body = OrderItemModel),
        (status = 400, description = "Transition not allowed by the lifecycle"),
        (status = 404, description = "Item not found for this vendor")
    ),
    tag = "vendors"
)]
pub async fn update_item_status(
    State(state): State<Arc<AppState>>,
    Path((vendor_id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateItemStatusInput>,
) -> Result<Json<OrderItemModel>, ServiceError> {
    Ok(Json(
        state
            .orders
            .update_item_status(vendor_id, item_id, input)
            .await?,
    ))
}
