use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discount coupon with usage caps and a validity window.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[schema(as = Coupon)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub description: String,
    pub discount_type: DiscountType,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub discount_value: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub minimum_order_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub maximum_discount_amount: Option<Decimal>,
    #[sea_orm(nullable)]
    pub usage_limit: Option<i32>,
    #[sea_orm(nullable)]
    pub usage_limit_per_user: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::coupon_usage::Entity")]
    Usages,
}

impl Related<super::coupon_usage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, utoipa::ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "fixed")]
    Fixed,
    #[sea_orm(string_value = "free_shipping")]
    FreeShipping,
}

impl Model {
    /// Discount on merchandise for the given subtotal.
    ///
    /// A fixed discount never exceeds the subtotal, and a free-shipping
    /// coupon discounts nothing here: the shipping waiver is applied by the
    /// checkout assembler. The result is clamped to
    /// `maximum_discount_amount` when one is set.
    pub fn calculate_discount(&self, subtotal: Decimal) -> Decimal {
        let discount = match self.discount_type {
            DiscountType::Percentage => subtotal * (self.discount_value / Decimal::from(100)),
            DiscountType::Fixed => self.discount_value.min(subtotal),
            DiscountType::FreeShipping => Decimal::ZERO,
        };

        let discount = match self.maximum_discount_amount {
            Some(cap) => discount.min(cap),
            None => discount,
        };
        discount.round_dp(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn coupon(discount_type: DiscountType, value: Decimal, cap: Option<Decimal>) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            code: "TEST".into(),
            name: "Test coupon".into(),
            description: String::new(),
            discount_type,
            discount_value: value,
            minimum_order_amount: Decimal::ZERO,
            maximum_discount_amount: cap,
            usage_limit: None,
            usage_limit_per_user: None,
            used_count: 0,
            is_active: true,
            start_date: now,
            end_date: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn percentage_discount() {
        let c = coupon(DiscountType::Percentage, dec!(10), None);
        assert_eq!(c.calculate_discount(dec!(250.00)), dec!(25.00));
    }

    #[test]
    fn percentage_discount_clamped_to_cap() {
        let c = coupon(DiscountType::Percentage, dec!(10), Some(dec!(80.00)));
        assert_eq!(c.calculate_discount(dec!(1000.00)), dec!(80.00));
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        let c = coupon(DiscountType::Fixed, dec!(50.00), None);
        assert_eq!(c.calculate_discount(dec!(30.00)), dec!(30.00));
        assert_eq!(c.calculate_discount(dec!(120.00)), dec!(50.00));
    }

    #[test]
    fn free_shipping_discounts_nothing_on_merchandise() {
        let c = coupon(DiscountType::FreeShipping, dec!(0), None);
        assert_eq!(c.calculate_discount(dec!(500.00)), Decimal::ZERO);
    }
}
