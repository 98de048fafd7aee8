use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use crate::state::AppState;

pub mod carts;
pub mod checkout;
pub mod coupons;
pub mod orders;
pub mod returns;
pub mod shipping;

/// Full API surface. User-scoped routes carry the user id in the path;
/// authentication sits in front of this service and is not modelled here.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", v1_router())
        .with_state(state)
}

fn v1_router() -> Router<Arc<AppState>> {
    Router::new()
        // Cart
        .route(
            "/users/:user_id/cart",
            get(carts::get_cart).delete(carts::clear_cart),
        )
        .route("/users/:user_id/cart/items", post(carts::add_item))
        .route(
            "/users/:user_id/cart/items/:item_id",
            put(carts::update_item).delete(carts::remove_item),
        )
        // Coupons
        .route("/users/:user_id/cart/coupon", post(coupons::quote_coupon))
        // Shipping
        .route(
            "/users/:user_id/shipping-methods",
            get(shipping::available_methods),
        )
        // Checkout and orders
        .route(
            "/users/:user_id/checkout/summary",
            post(checkout::checkout_summary),
        )
        .route(
            "/users/:user_id/orders",
            post(checkout::create_order).get(orders::list_orders),
        )
        .route("/users/:user_id/orders/:order_id", get(orders::get_order))
        .route(
            "/users/:user_id/orders/:order_id/cancel",
            post(checkout::cancel_order),
        )
        // Returns
        .route(
            "/users/:user_id/returns",
            post(returns::create_return).get(returns::list_user_returns),
        )
        .route("/returns/:return_id/process", post(returns::process_return))
        // Vendor
        .route("/vendors/:vendor_id/order-items", get(orders::vendor_items))
        .route(
            "/vendors/:vendor_id/order-items/:item_id/status",
            put(orders::update_item_status),
        )
        .route(
            "/vendors/:vendor_id/returns",
            get(returns::list_vendor_returns),
        )
        // Admin
        .route("/orders/:order_id/status", put(orders::update_order_status))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
