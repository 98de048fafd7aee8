use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{errors::ServiceError, services::shipping::ShippingQuote, state::AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ShippingQuery {
    /// Destination country code; defaults to the configured home country
    pub country: Option<String>,
}

/// Shipping methods usable for the user's cart, each quoted with its cost,
/// cheapest first.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/shipping-methods",
    params(("user_id" = Uuid, Path, description = "Cart owner"), ShippingQuery),
    responses(
        (status = 200, description = "Available methods with quoted costs", body = [ShippingQuote])
    ),
    tag = "shipping"
)]
pub async fn available_methods(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ShippingQuery>,
) -> Result<Json<Vec<ShippingQuote>>, ServiceError> {
    let cart = state.carts.get_cart(user_id).await?;
    let country = query
        .country
        .unwrap_or_else(|| state.config.default_country.clone());

    let quotes = state
        .shipping
        .available_methods(&country, cart.totals.total_weight, cart.totals.subtotal)
        .await?;
    Ok(Json(quotes))
}
