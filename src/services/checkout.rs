use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    entities::{
        coupon::DiscountType, coupon_usage, order, order_item, order_status_history,
        product, product_variation, cart_item, Coupon, CouponModel, CartItem, CartItemModel,
        Order, OrderModel, ProductModel, ProductVariation, ShippingMethodModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        carts::{aggregate_lines, CartService},
        coupons::CouponService,
        shipping::ShippingService,
    },
};

use crate::entities::order::{OrderStatus, PaymentStatus};

/// Order total assembler: prices a cart and converts it into a persisted
/// order inside one all-or-nothing transaction.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    carts: CartService,
    coupons: CouponService,
    shipping: ShippingService,
}

/// Destination or billing address supplied at checkout
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct Address {
    #[validate(length(min = 1, max = 255))]
    pub line_1: String,
    #[serde(default)]
    pub line_2: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
}

/// Customer contact details frozen onto the order
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CustomerInfo {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
}

/// Request-scoped checkout context.
///
/// Everything the assembler needs travels in this value; there is no
/// session state, and an earlier coupon quote is never trusted; the code
/// is re-validated when the order is created.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckoutContext {
    pub shipping_method_id: Uuid,
    pub coupon_code: Option<String>,
    #[validate]
    pub customer: CustomerInfo,
    #[validate]
    pub shipping_address: Address,
    /// Defaults to the shipping address when absent
    #[validate]
    pub billing_address: Option<Address>,
    #[validate(length(min = 1, max = 50))]
    pub payment_method: String,
    #[serde(default)]
    pub customer_notes: String,
}

/// Monetary breakdown of a priced checkout
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutBreakdown {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub total_items: i32,
}

/// Non-mutating checkout quote
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutSummary {
    pub breakdown: CheckoutBreakdown,
    pub shipping_method: ShippingMethodModel,
    pub applied_coupon: Option<CouponModel>,
}

struct PricedCart {
    cart_id: Uuid,
    lines: Vec<(CartItemModel, Option<ProductModel>)>,
    shipping_method: ShippingMethodModel,
    coupon: Option<CouponModel>,
    breakdown: CheckoutBreakdown,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
        carts: CartService,
        coupons: CouponService,
        shipping: ShippingService,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
            carts,
            coupons,
            shipping,
        }
    }

    /// Prices the user's cart for checkout. Read-only: all validation
    /// (empty cart, shipping availability, coupon) happens here, before a
    /// single row is written.
    async fn price_cart(
        &self,
        user_id: Uuid,
        context: &CheckoutContext,
    ) -> Result<PricedCart, ServiceError> {
        context.validate()?;

        let cart = self.carts.get_or_create_cart(user_id).await?;
        let lines = self.carts.lines_with_products(cart.id).await?;
        if lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let totals = aggregate_lines(&lines);

        let shipping_method = self
            .shipping
            .resolve_for_checkout(
                context.shipping_method_id,
                &context.shipping_address.country,
                totals.total_weight,
            )
            .await?;

        let coupon = match &context.coupon_code {
            Some(code) => {
                let coupon = self.coupons.find_by_code(code).await?;
                self.coupons
                    .validate(&coupon, user_id, totals.subtotal)
                    .await?;
                Some(coupon)
            }
            None => None,
        };

        let subtotal = totals.subtotal;
        let tax_amount = (subtotal * self.config.tax_rate).round_dp(2);
        let discount_amount = coupon
            .as_ref()
            .map(|c| c.calculate_discount(subtotal))
            .unwrap_or(Decimal::ZERO);

        // A free-shipping coupon waives shipping rather than discounting
        // merchandise.
        let shipping_cost = match coupon.as_ref().map(|c| c.discount_type) {
            Some(DiscountType::FreeShipping) => Decimal::ZERO,
            _ => shipping_method.calculate_cost(totals.total_weight, subtotal),
        };

        let total_amount = (subtotal + tax_amount + shipping_cost - discount_amount)
            .max(Decimal::ZERO)
            .round_dp(2);

        Ok(PricedCart {
            cart_id: cart.id,
            breakdown: CheckoutBreakdown {
                subtotal,
                tax_amount,
                shipping_cost,
                discount_amount,
                total_amount,
                total_items: totals.total_items,
            },
            lines,
            shipping_method,
            coupon,
        })
    }

    /// Quotes the full monetary breakdown without mutating anything.
    #[instrument(skip(self, context))]
    pub async fn checkout_summary(
        &self,
        user_id: Uuid,
        context: &CheckoutContext,
    ) -> Result<CheckoutSummary, ServiceError> {
        let priced = self.price_cart(user_id, context).await?;
        Ok(CheckoutSummary {
            breakdown: priced.breakdown,
            shipping_method: priced.shipping_method,
            applied_coupon: priced.coupon,
        })
    }

    /// Creates an order from the user's cart.
    ///
    /// The whole write sequence runs in one transaction: order header,
    /// item snapshots, stock decrements, sales counters, coupon usage,
    /// cart clearing and the initial status-history row. A stock or
    /// coupon-cap race aborts everything and leaves the cart intact.
    #[instrument(skip(self, context))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        context: CheckoutContext,
    ) -> Result<OrderModel, ServiceError> {
        let priced = self.price_cart(user_id, &context).await?;

        let txn = self.db.begin().await?;

        let order_id = Uuid::new_v4();
        let order_number = self.generate_order_number(&txn).await?;
        let billing = context
            .billing_address
            .clone()
            .unwrap_or_else(|| context.shipping_address.clone());

        let header = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            user_id: Set(user_id),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            customer_email: Set(context.customer.email.clone()),
            customer_phone: Set(context.customer.phone.clone()),
            customer_first_name: Set(context.customer.first_name.clone()),
            customer_last_name: Set(context.customer.last_name.clone()),
            shipping_address_line_1: Set(context.shipping_address.line_1.clone()),
            shipping_address_line_2: Set(context.shipping_address.line_2.clone()),
            shipping_city: Set(context.shipping_address.city.clone()),
            shipping_state: Set(context.shipping_address.state.clone()),
            shipping_postal_code: Set(context.shipping_address.postal_code.clone()),
            shipping_country: Set(context.shipping_address.country.clone()),
            billing_address_line_1: Set(billing.line_1),
            billing_address_line_2: Set(billing.line_2),
            billing_city: Set(billing.city),
            billing_state: Set(billing.state),
            billing_postal_code: Set(billing.postal_code),
            billing_country: Set(billing.country),
            subtotal: Set(priced.breakdown.subtotal),
            shipping_cost: Set(priced.breakdown.shipping_cost),
            tax_amount: Set(priced.breakdown.tax_amount),
            discount_amount: Set(priced.breakdown.discount_amount),
            total_amount: Set(priced.breakdown.total_amount),
            payment_method: Set(context.payment_method.clone()),
            customer_notes: Set(context.customer_notes.clone()),
            tracking_number: Set(None),
            carrier: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            shipped_at: Set(None),
            delivered_at: Set(None),
        };
        let order_row = header.insert(&txn).await?;

        for (line, product) in &priced.lines {
            let product = product.as_ref().ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} no longer exists", line.product_id))
            })?;

            let variation = match line.variation_id {
                Some(variation_id) => ProductVariation::find_by_id(variation_id)
                    .one(&txn)
                    .await?,
                None => None,
            };

            let (sku, variation_details) = match &variation {
                Some(v) => (
                    v.sku.clone(),
                    serde_json::json!({
                        "sku": v.sku,
                        "attributes": v.attribute_list(),
                    }),
                ),
                None => (product.sku.clone(), serde_json::json!({})),
            };

            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                vendor_id: Set(product.vendor_id),
                product_id: Set(product.id),
                variation_id: Set(line.variation_id),
                product_name: Set(product.name.clone()),
                product_sku: Set(sku),
                variation_details: Set(variation_details),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                total_price: Set(line.line_total()),
                status: Set(OrderStatus::Pending),
                created_at: Set(Utc::now()),
            };
            item.insert(&txn).await?;

            self.commit_stock(&txn, line, product, variation.as_ref())
                .await?;
        }

        if let Some(coupon) = &priced.coupon {
            self.commit_coupon(&txn, coupon, user_id, order_id, priced.breakdown.discount_amount)
                .await?;
        }

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(priced.cart_id))
            .exec(&txn)
            .await?;

        let history = order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            status: Set(OrderStatus::Pending),
            notes: Set("Order created".to_string()),
            changed_by: Set(Some(user_id)),
            created_at: Set(Utc::now()),
        };
        history.insert(&txn).await?;

        txn.commit().await.map_err(ServiceError::from_commit_error)?;

        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id,
                user_id,
                total_amount: priced.breakdown.total_amount,
            })
            .await;
        if let Some(coupon) = &priced.coupon {
            self.event_sender
                .send_or_log(Event::CouponRedeemed {
                    coupon_id: coupon.id,
                    order_id,
                    discount_amount: priced.breakdown.discount_amount,
                })
                .await;
        }
        self.event_sender
            .send_or_log(Event::CartCleared(priced.cart_id))
            .await;

        info!(
            "Created order {} for user {}: total {}",
            order_number, user_id, priced.breakdown.total_amount
        );
        Ok(order_row)
    }

    /// Cancels a pending or confirmed order, reversing stock decrements,
    /// sales counters and any coupon redemption.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let order_row = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if !order_row.status.is_cancellable() {
            return Err(ServiceError::InvalidStatusTransition {
                from: order_row.status.to_string(),
                to: OrderStatus::Cancelled.to_string(),
            });
        }

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        for item in &items {
            if let Some(variation_id) = item.variation_id {
                ProductVariation::update_many()
                    .col_expr(
                        product_variation::Column::StockQuantity,
                        Expr::col(product_variation::Column::StockQuantity).add(item.quantity),
                    )
                    .filter(product_variation::Column::Id.eq(variation_id))
                    .exec(&txn)
                    .await?;
            } else {
                crate::entities::Product::update_many()
                    .col_expr(
                        product::Column::StockQuantity,
                        Expr::col(product::Column::StockQuantity).add(item.quantity),
                    )
                    .filter(product::Column::Id.eq(item.product_id))
                    .filter(product::Column::ManageStock.eq(true))
                    .exec(&txn)
                    .await?;
            }

            crate::entities::Product::update_many()
                .col_expr(
                    product::Column::SalesCount,
                    Expr::col(product::Column::SalesCount).sub(item.quantity),
                )
                .filter(product::Column::Id.eq(item.product_id))
                .exec(&txn)
                .await?;
        }

        let released_coupon = coupon_usage::Entity::find()
            .filter(coupon_usage::Column::OrderId.eq(order_id))
            .one(&txn)
            .await?;
        if let Some(usage) = &released_coupon {
            Coupon::update_many()
                .col_expr(
                    crate::entities::coupon::Column::UsedCount,
                    Expr::col(crate::entities::coupon::Column::UsedCount).sub(1),
                )
                .filter(crate::entities::coupon::Column::Id.eq(usage.coupon_id))
                .exec(&txn)
                .await?;
        }

        let old_status = order_row.status;
        let mut active: order::ActiveModel = order_row.into();
        active.status = Set(OrderStatus::Cancelled);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        let history = order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            status: Set(OrderStatus::Cancelled),
            notes: Set("Order cancelled by customer".to_string()),
            changed_by: Set(Some(user_id)),
            created_at: Set(Utc::now()),
        };
        history.insert(&txn).await?;

        txn.commit().await.map_err(ServiceError::from_commit_error)?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: OrderStatus::Cancelled.to_string(),
            })
            .await;
        self.event_sender.send_or_log(Event::OrderCancelled(order_id)).await;
        if let Some(usage) = released_coupon {
            self.event_sender
                .send_or_log(Event::CouponReleased {
                    coupon_id: usage.coupon_id,
                    order_id,
                })
                .await;
        }

        info!("Cancelled order {}", order_id);
        Ok(updated)
    }

    /// Decrements tracked stock for one order line and bumps the sales
    /// counter. The decrement is a conditional single-statement update so
    /// two concurrent checkouts can never both take the last unit: the
    /// loser matches zero rows and the transaction aborts.
    async fn commit_stock<C: ConnectionTrait>(
        &self,
        txn: &C,
        line: &CartItemModel,
        product: &ProductModel,
        variation: Option<&product_variation::Model>,
    ) -> Result<(), ServiceError> {
        if let Some(variation) = variation {
            let result = ProductVariation::update_many()
                .col_expr(
                    product_variation::Column::StockQuantity,
                    Expr::col(product_variation::Column::StockQuantity).sub(line.quantity),
                )
                .filter(product_variation::Column::Id.eq(variation.id))
                .filter(product_variation::Column::StockQuantity.gte(line.quantity))
                .exec(txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "Variation {} has fewer than {} in stock",
                    variation.sku, line.quantity
                )));
            }
        } else if product.manage_stock {
            let result = crate::entities::Product::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).sub(line.quantity),
                )
                .filter(product::Column::Id.eq(product.id))
                .filter(product::Column::StockQuantity.gte(line.quantity))
                .exec(txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "Product {} has fewer than {} in stock",
                    product.sku, line.quantity
                )));
            }
        }

        crate::entities::Product::update_many()
            .col_expr(
                product::Column::SalesCount,
                Expr::col(product::Column::SalesCount).add(line.quantity),
            )
            .filter(product::Column::Id.eq(product.id))
            .exec(txn)
            .await?;

        Ok(())
    }

    /// Records a coupon redemption. The `used_count` increment carries the
    /// usage-limit filter so concurrent redemptions cannot blow past the
    /// global cap.
    async fn commit_coupon<C: ConnectionTrait>(
        &self,
        txn: &C,
        coupon: &CouponModel,
        user_id: Uuid,
        order_id: Uuid,
        discount_amount: Decimal,
    ) -> Result<(), ServiceError> {
        let usage = coupon_usage::ActiveModel {
            id: Set(Uuid::new_v4()),
            coupon_id: Set(coupon.id),
            user_id: Set(user_id),
            order_id: Set(order_id),
            discount_amount: Set(discount_amount),
            created_at: Set(Utc::now()),
        };
        usage.insert(txn).await?;

        let mut increment = Coupon::update_many()
            .col_expr(
                crate::entities::coupon::Column::UsedCount,
                Expr::col(crate::entities::coupon::Column::UsedCount).add(1),
            )
            .filter(crate::entities::coupon::Column::Id.eq(coupon.id));
        if let Some(limit) = coupon.usage_limit {
            increment =
                increment.filter(crate::entities::coupon::Column::UsedCount.lt(limit));
        }

        let result = increment.exec(txn).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::InvalidCoupon(
                "Coupon usage limit reached".to_string(),
            ));
        }

        Ok(())
    }

    /// Generates an `ORD`-prefixed 8-digit order number, retrying on the
    /// rare collision.
    async fn generate_order_number<C: ConnectionTrait>(
        &self,
        txn: &C,
    ) -> Result<String, ServiceError> {
        loop {
            let digits: String = {
                let mut rng = rand::thread_rng();
                (0..8).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
            };
            let candidate = format!("ORD{}", digits);

            let taken = Order::find()
                .filter(order::Column::OrderNumber.eq(candidate.clone()))
                .count(txn)
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
        }
    }
}
