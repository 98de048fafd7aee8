use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        order, order_item, order_status_history, Order, OrderItem, OrderItemModel, OrderModel,
        OrderStatusHistory, OrderStatusHistoryModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

use crate::entities::order::OrderStatus;

/// Order read models and the post-purchase status workflow.
///
/// Creation and cancellation live in the checkout assembler; this service
/// covers everything that happens to an order afterwards.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// One page of a user's order history
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPage {
    pub orders: Vec<OrderModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Full order detail: header, lines and the status audit trail
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetails {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
    pub status_history: Vec<OrderStatusHistoryModel>,
}

/// Input for moving an order to a new status
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusInput {
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
}

/// Vendor input for moving one order item to a new status. Tracking
/// details are stamped onto the parent order when it follows to shipped.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemStatusInput {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Newest-first page of the user's orders.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<OrderPage, ServiceError> {
        let per_page = per_page.clamp(1, 100);
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(OrderPage {
            orders,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderDetails, ServiceError> {
        let order_row = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;
        let status_history = OrderStatusHistory::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(OrderDetails {
            order: order_row,
            items,
            status_history,
        })
    }

    /// Moves the whole order to a new status, enforcing the lifecycle.
    /// Shipping-related inputs are stamped onto the header when the order
    /// moves to shipped.
    #[instrument(skip(self, input), fields(status = %input.status))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        input: UpdateStatusInput,
        changed_by: Option<Uuid>,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let order_row = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let updated = self
            .transition_order(&txn, order_row, input, changed_by)
            .await?;

        txn.commit().await.map_err(ServiceError::from_commit_error)?;
        Ok(updated)
    }

    /// Vendor-side status update for a single order line.
    ///
    /// When every line of the order has reached the same status and the
    /// order itself may move there, the parent follows its items. A partial
    /// shipment therefore leaves the order where it was.
    #[instrument(skip(self, input), fields(status = %input.status))]
    pub async fn update_item_status(
        &self,
        vendor_id: Uuid,
        item_id: Uuid,
        input: UpdateItemStatusInput,
    ) -> Result<OrderItemModel, ServiceError> {
        let new_status = input.status;
        let txn = self.db.begin().await?;

        let item = OrderItem::find_by_id(item_id)
            .one(&txn)
            .await?
            .filter(|i| i.vendor_id == vendor_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order item {} not found", item_id)))?;

        if !item.status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatusTransition {
                from: item.status.to_string(),
                to: new_status.to_string(),
            });
        }

        let order_id = item.order_id;
        let mut active: order_item::ActiveModel = item.into();
        active.status = Set(new_status);
        let updated_item = active.update(&txn).await?;

        // Parent follows once all siblings agree.
        let siblings = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;
        let unanimous = siblings.iter().all(|i| i.status == new_status);

        if unanimous {
            let order_row = Order::find_by_id(order_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

            if order_row.status.can_transition_to(new_status) {
                self.transition_order(
                    &txn,
                    order_row,
                    UpdateStatusInput {
                        status: new_status,
                        notes: "All items reached this status".to_string(),
                        tracking_number: input.tracking_number,
                        carrier: input.carrier,
                    },
                    Some(vendor_id),
                )
                .await?;
            }
        }

        txn.commit().await.map_err(ServiceError::from_commit_error)?;

        self.event_sender
            .send_or_log(Event::OrderItemStatusChanged {
                order_id,
                item_id,
                new_status: new_status.to_string(),
            })
            .await;

        info!("Order item {} moved to {}", item_id, new_status);
        Ok(updated_item)
    }

    /// Items belonging to one vendor, across all orders, newest first. The
    /// vendor's view of incoming business.
    #[instrument(skip(self))]
    pub async fn vendor_items(
        &self,
        vendor_id: Uuid,
    ) -> Result<Vec<OrderItemModel>, ServiceError> {
        Ok(OrderItem::find()
            .filter(order_item::Column::VendorId.eq(vendor_id))
            .order_by_desc(order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    async fn transition_order(
        &self,
        txn: &DatabaseTransaction,
        order_row: OrderModel,
        input: UpdateStatusInput,
        changed_by: Option<Uuid>,
    ) -> Result<OrderModel, ServiceError> {
        if !order_row.status.can_transition_to(input.status) {
            return Err(ServiceError::InvalidStatusTransition {
                from: order_row.status.to_string(),
                to: input.status.to_string(),
            });
        }

        let order_id = order_row.id;
        let old_status = order_row.status;
        let mut active: order::ActiveModel = order_row.into();
        active.status = Set(input.status);
        active.updated_at = Set(Utc::now());
        match input.status {
            OrderStatus::Shipped => {
                active.shipped_at = Set(Some(Utc::now()));
                if input.tracking_number.is_some() {
                    active.tracking_number = Set(input.tracking_number.clone());
                }
                if input.carrier.is_some() {
                    active.carrier = Set(input.carrier.clone());
                }
            }
            OrderStatus::Delivered => {
                active.delivered_at = Set(Some(Utc::now()));
            }
            _ => {}
        }
        let updated = active.update(txn).await?;

        let history = order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            status: Set(input.status),
            notes: Set(input.notes),
            changed_by: Set(changed_by),
            created_at: Set(Utc::now()),
        };
        history.insert(txn).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: input.status.to_string(),
            })
            .await;

        info!("Order {} moved {} -> {}", order_id, old_status, input.status);
        Ok(updated)
    }
}
