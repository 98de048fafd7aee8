use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        order_item, return_request,
        return_request::{ReturnReason, ReturnStatus},
        Order, OrderItem, ReturnRequest, ReturnRequestModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

use crate::entities::order::OrderStatus;

/// Post-delivery returns: one request per order item, processed by staff.
#[derive(Clone)]
pub struct ReturnService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReturnInput {
    pub order_item_id: Uuid,
    pub reason: ReturnReason,
    #[validate(length(min = 1, max = 1000))]
    pub detailed_reason: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessReturnInput {
    pub approve: bool,
    #[serde(default)]
    pub admin_notes: String,
    /// Vendor making the decision; must own the returned item
    pub processed_by: Uuid,
}

impl ReturnService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Opens a return for a delivered order item.
    ///
    /// The item must belong to one of the user's orders, must have been
    /// delivered, and must not already have a return. The quantity may not
    /// exceed what was ordered; the refund is quoted from the frozen unit
    /// price.
    #[instrument(skip(self, input))]
    pub async fn create_return(
        &self,
        user_id: Uuid,
        input: CreateReturnInput,
    ) -> Result<ReturnRequestModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let (item, order_row) = OrderItem::find_by_id(input.order_item_id)
            .find_also_related(Order)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order item {} not found", input.order_item_id))
            })?;
        let order_row = order_row.ok_or_else(|| {
            ServiceError::NotFound(format!("Order for item {} not found", input.order_item_id))
        })?;

        if order_row.user_id != user_id {
            return Err(ServiceError::NotFound(format!(
                "Order item {} not found",
                input.order_item_id
            )));
        }
        if item.status != OrderStatus::Delivered {
            return Err(ServiceError::ValidationError(
                "Only delivered items can be returned".to_string(),
            ));
        }
        if input.quantity > item.quantity {
            return Err(ServiceError::ValidationError(format!(
                "Cannot return {} of an item ordered {} times",
                input.quantity, item.quantity
            )));
        }

        let already_requested = ReturnRequest::find()
            .filter(return_request::Column::OrderItemId.eq(item.id))
            .count(&txn)
            .await?;
        if already_requested > 0 {
            return Err(ServiceError::ValidationError(
                "A return has already been requested for this item".to_string(),
            ));
        }

        let return_id = Uuid::new_v4();
        let request = return_request::ActiveModel {
            id: Set(return_id),
            return_number: Set(self.generate_return_number(&txn).await?),
            order_id: Set(order_row.id),
            order_item_id: Set(item.id),
            user_id: Set(user_id),
            reason: Set(input.reason),
            detailed_reason: Set(input.detailed_reason),
            quantity: Set(input.quantity),
            status: Set(ReturnStatus::Requested),
            refund_amount: Set(item.unit_price * Decimal::from(input.quantity)),
            admin_notes: Set(String::new()),
            processed_by: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            processed_at: Set(None),
        };
        let created = request.insert(&txn).await?;

        txn.commit().await.map_err(ServiceError::from_commit_error)?;

        self.event_sender
            .send_or_log(Event::ReturnRequested(return_id))
            .await;
        info!(
            "Return {} opened for order item {}",
            created.return_number, item.id
        );
        Ok(created)
    }

    /// Approves or rejects a requested return. Approval fixes the refund at
    /// the frozen unit price times the returned quantity.
    #[instrument(skip(self, input))]
    pub async fn process_return(
        &self,
        return_id: Uuid,
        input: ProcessReturnInput,
    ) -> Result<ReturnRequestModel, ServiceError> {
        let request = ReturnRequest::find_by_id(return_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Return {} not found", return_id)))?;

        let item = OrderItem::find_by_id(request.order_item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order item {} not found", request.order_item_id))
            })?;
        if item.vendor_id != input.processed_by {
            return Err(ServiceError::NotFound(format!(
                "Return {} not found",
                return_id
            )));
        }

        if request.status != ReturnStatus::Requested {
            return Err(ServiceError::InvalidStatusTransition {
                from: format!("{:?}", request.status).to_lowercase(),
                to: if input.approve {
                    "approved".to_string()
                } else {
                    "rejected".to_string()
                },
            });
        }

        let new_status = if input.approve {
            ReturnStatus::Approved
        } else {
            ReturnStatus::Rejected
        };

        let mut active: return_request::ActiveModel = request.into();
        active.status = Set(new_status);
        active.admin_notes = Set(input.admin_notes);
        active.processed_by = Set(Some(input.processed_by));
        active.processed_at = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        let event = if input.approve {
            Event::ReturnApproved(return_id)
        } else {
            Event::ReturnRejected(return_id)
        };
        self.event_sender.send_or_log(event).await;

        info!("Return {} processed: {:?}", return_id, new_status);
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn list_user_returns(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ReturnRequestModel>, ServiceError> {
        Ok(ReturnRequest::find()
            .filter(return_request::Column::UserId.eq(user_id))
            .order_by_desc(return_request::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Returns raised against a vendor's items.
    #[instrument(skip(self))]
    pub async fn list_vendor_returns(
        &self,
        vendor_id: Uuid,
    ) -> Result<Vec<ReturnRequestModel>, ServiceError> {
        let item_ids: Vec<Uuid> = OrderItem::find()
            .filter(order_item::Column::VendorId.eq(vendor_id))
            .select_only()
            .column(order_item::Column::Id)
            .into_tuple()
            .all(&*self.db)
            .await?;

        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(ReturnRequest::find()
            .filter(return_request::Column::OrderItemId.is_in(item_ids))
            .order_by_desc(return_request::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    async fn generate_return_number<C: ConnectionTrait>(
        &self,
        txn: &C,
    ) -> Result<String, ServiceError> {
        loop {
            let digits: String = {
                let mut rng = rand::thread_rng();
                (0..8).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
            };
            let candidate = format!("RET{}", digits);

            let taken = ReturnRequest::find()
                .filter(return_request::Column::ReturnNumber.eq(candidate.clone()))
                .count(txn)
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
        }
    }
}
