use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchasable variation of a product (size, colour, ...).
///
/// Variation stock is always tracked, unlike the parent product.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[schema(as = ProductVariation)]
#[sea_orm(table_name = "product_variations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(unique)]
    pub sku: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))", nullable)]
    pub weight: Option<Decimal>,
    pub stock_quantity: i32,
    #[sea_orm(column_type = "Json")]
    pub attributes: Json,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Structured variation attribute, stored as JSON on the variation and
/// copied verbatim into order item snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VariationAttribute {
    pub attribute: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
}

impl Model {
    pub fn attribute_list(&self) -> Vec<VariationAttribute> {
        serde_json::from_value(self.attributes.clone()).unwrap_or_default()
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}
