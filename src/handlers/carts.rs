use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::carts::{AddToCartInput, CartWithItems},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityInput {
    pub quantity: i32,
}

/// Fetch the user's cart with lines and derived totals.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/cart",
    params(("user_id" = Uuid, Path, description = "Cart owner")),
    responses(
        (status = 200, description = "Cart contents and totals", body = CartWithItems)
    ),
    tag = "carts"
)]
pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CartWithItems>, ServiceError> {
    Ok(Json(state.carts.get_cart(user_id).await?))
}

/// Add a product (optionally a variation) to the cart.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/cart/items",
    params(("user_id" = Uuid, Path, description = "Cart owner")),
    request_body = AddToCartInput,
    responses(
        (status = 201, description = "Item added", body = CartWithItems),
        (status = 404, description = "Product or variation not found"),
        (status = 422, description = "Requested quantity exceeds stock")
    ),
    tag = "carts"
)]
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(input): Json<AddToCartInput>,
) -> Result<(StatusCode, Json<CartWithItems>), ServiceError> {
    let cart = state.carts.add_item(user_id, input).await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

/// Change a line's quantity; zero removes the line.
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}/cart/items/{item_id}",
    params(
        ("user_id" = Uuid, Path, description = "Cart owner"),
        ("item_id" = Uuid, Path, description = "Cart line")
    ),
    request_body = UpdateQuantityInput,
    responses(
        (status = 200, description = "Cart after the update", body = CartWithItems),
        (status = 404, description = "Line not found in this cart")
    ),
    tag = "carts"
)]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path((user_id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateQuantityInput>,
) -> Result<Json<CartWithItems>, ServiceError> {
    Ok(Json(
        state
            .carts
            .update_item_quantity(user_id, item_id, input.quantity)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}/cart/items/{item_id}",
    params(
        ("user_id" = Uuid, Path, description = "Cart owner"),
        ("item_id" = Uuid, Path, description = "Cart line")
    ),
    responses((status = 200, description = "Cart after removal", body = CartWithItems)),
    tag = "carts"
)]
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path((user_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CartWithItems>, ServiceError> {
    Ok(Json(state.carts.remove_item(user_id, item_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}/cart",
    params(("user_id" = Uuid, Path, description = "Cart owner")),
    responses((status = 200, description = "Emptied cart", body = CartWithItems)),
    tag = "carts"
)]
pub async fn clear_cart(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CartWithItems>, ServiceError> {
    Ok(Json(state.carts.clear_cart(user_id).await?))
}
