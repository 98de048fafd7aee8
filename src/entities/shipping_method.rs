use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shipping method with weight-based pricing and per-country availability.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[schema(as = ShippingMethod)]
#[sea_orm(table_name = "shipping_methods")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub base_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub cost_per_kg: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub free_shipping_threshold: Option<Decimal>,
    pub min_delivery_days: i32,
    pub max_delivery_days: i32,
    pub is_active: bool,
    /// Country allowlist as a JSON array; empty means available everywhere.
    #[sea_orm(column_type = "Json")]
    pub available_countries: Json,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))", nullable)]
    pub max_weight: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Shipping cost for a cart of the given weight and merchandise total.
    /// Orders at or above the free-shipping threshold ship for nothing.
    pub fn calculate_cost(&self, weight: Decimal, order_total: Decimal) -> Decimal {
        if let Some(threshold) = self.free_shipping_threshold {
            if order_total >= threshold {
                return Decimal::ZERO;
            }
        }
        (self.base_cost + weight * self.cost_per_kg).round_dp(2)
    }

    pub fn countries(&self) -> Vec<String> {
        serde_json::from_value(self.available_countries.clone()).unwrap_or_default()
    }

    pub fn is_available_for_country(&self, country: &str) -> bool {
        let countries = self.countries();
        countries.is_empty() || countries.iter().any(|c| c == country)
    }

    /// Weight limits reject a method as unavailable, never as an error.
    pub fn accepts_weight(&self, weight: Decimal) -> bool {
        match self.max_weight {
            Some(max) => weight <= max,
            None => true,
        }
    }
}
