use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog product owned by a single vendor.
///
/// Stock is only tracked when `manage_stock` is set; products with
/// `manage_stock = false` are treated as always available.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[schema(as = Product)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub sku: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))", nullable)]
    pub weight: Option<Decimal>,
    pub stock_quantity: i32,
    pub manage_stock: bool,
    pub sales_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_variation::Entity")]
    Variations,
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
}

impl Related<super::product_variation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variations.def()
    }
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Stock available for purchase, `None` when stock is not tracked.
    pub fn available_stock(&self) -> Option<i32> {
        self.manage_stock.then_some(self.stock_quantity)
    }

    pub fn is_in_stock(&self) -> bool {
        !self.manage_stock || self.stock_quantity > 0
    }
}
