use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Return request for a single order item. At most one return per item.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[schema(as = ReturnRequest)]
#[sea_orm(table_name = "returns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub return_number: String,
    pub order_id: Uuid,
    #[sea_orm(unique)]
    pub order_item_id: Uuid,
    pub user_id: Uuid,

    pub reason: ReturnReason,
    pub detailed_reason: String,
    pub quantity: i32,

    pub status: ReturnStatus,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub refund_amount: Decimal,
    pub admin_notes: String,
    #[sea_orm(nullable)]
    pub processed_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::order_item::Entity",
        from = "Column::OrderItemId",
        to = "super::order_item::Column::Id"
    )]
    OrderItem,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, utoipa::ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    #[sea_orm(string_value = "requested")]
    Requested,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "received")]
    Received,
    #[sea_orm(string_value = "refunded")]
    Refunded,
    #[sea_orm(string_value = "completed")]
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, utoipa::ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    #[sea_orm(string_value = "defective")]
    Defective,
    #[sea_orm(string_value = "wrong_item")]
    WrongItem,
    #[sea_orm(string_value = "not_as_described")]
    NotAsDescribed,
    #[sea_orm(string_value = "changed_mind")]
    ChangedMind,
    #[sea_orm(string_value = "size_issue")]
    SizeIssue,
    #[sea_orm(string_value = "quality_issue")]
    QualityIssue,
    #[sea_orm(string_value = "other")]
    Other,
}
