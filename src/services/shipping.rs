use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{shipping_method, ShippingMethod, ShippingMethodModel},
    errors::ServiceError,
};

/// Shipping cost calculator and method availability filter.
#[derive(Clone)]
pub struct ShippingService {
    db: Arc<DatabaseConnection>,
}

/// A shipping method quoted against the current cart
#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingQuote {
    pub method: ShippingMethodModel,
    pub cost: Decimal,
}

impl ShippingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Active methods usable for the destination and cart weight, cheapest
    /// first, each quoted against the cart. Methods that do not serve the
    /// country or cannot take the weight are filtered out, not errors.
    #[instrument(skip(self))]
    pub async fn available_methods(
        &self,
        country: &str,
        weight: Decimal,
        order_total: Decimal,
    ) -> Result<Vec<ShippingQuote>, ServiceError> {
        let methods = ShippingMethod::find()
            .filter(shipping_method::Column::IsActive.eq(true))
            .order_by_asc(shipping_method::Column::BaseCost)
            .all(&*self.db)
            .await?;

        Ok(methods
            .into_iter()
            .filter(|m| m.is_available_for_country(country) && m.accepts_weight(weight))
            .map(|method| ShippingQuote {
                cost: method.calculate_cost(weight, order_total),
                method,
            })
            .collect())
    }

    /// Resolves a chosen method and re-checks its availability for the
    /// destination. Used by checkout so a stale method id or a method that
    /// stopped serving the country fails before any write.
    pub async fn resolve_for_checkout(
        &self,
        method_id: Uuid,
        country: &str,
        weight: Decimal,
    ) -> Result<ShippingMethodModel, ServiceError> {
        let method = ShippingMethod::find_by_id(method_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidShippingMethod(format!("Method {} does not exist", method_id))
            })?;

        if !method.is_active {
            return Err(ServiceError::InvalidShippingMethod(format!(
                "{} is not active",
                method.name
            )));
        }
        if !method.is_available_for_country(country) {
            return Err(ServiceError::InvalidShippingMethod(format!(
                "{} is not available for {}",
                method.name, country
            )));
        }
        if !method.accepts_weight(weight) {
            return Err(ServiceError::InvalidShippingMethod(format!(
                "{} cannot ship {} kg",
                method.name, weight
            )));
        }

        Ok(method)
    }
}
