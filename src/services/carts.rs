use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        cart, cart_item, Cart, CartItem, CartItemModel, CartModel, Product, ProductModel,
        ProductVariation,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Shopping cart service: lazy per-user carts, line management and the
/// pure subtotal/weight/item-count aggregation used by checkout.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Derived cart totals. Monetary and weight sums use exact decimal
/// arithmetic; an empty cart yields all zeros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub total_weight: Decimal,
    pub total_items: i32,
}

impl CartTotals {
    pub const ZERO: CartTotals = CartTotals {
        subtotal: Decimal::ZERO,
        total_weight: Decimal::ZERO,
        total_items: 0,
    };
}

/// Sums cart lines into `(subtotal, total_weight, total_item_count)`.
///
/// `subtotal` uses the frozen per-line unit price, not the live product
/// price. A product without a weight contributes zero weight.
pub fn aggregate_lines(lines: &[(CartItemModel, Option<ProductModel>)]) -> CartTotals {
    let mut totals = CartTotals::ZERO;
    for (item, product) in lines {
        totals.subtotal += item.line_total();
        totals.total_items += item.quantity;
        if let Some(weight) = product.as_ref().and_then(|p| p.weight) {
            totals.total_weight += weight * Decimal::from(item.quantity);
        }
    }
    totals
}

/// Input for adding an item to the cart
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    pub variation_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Cart with its lines and derived totals
#[derive(Debug, Serialize, ToSchema)]
pub struct CartWithItems {
    pub cart: CartModel,
    pub items: Vec<CartItemModel>,
    pub totals: CartTotals,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Fetches the user's cart, creating an empty one on first access.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self, user_id: Uuid) -> Result<CartModel, ServiceError> {
        if let Some(existing) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }

        let cart_id = Uuid::new_v4();
        let cart = cart::ActiveModel {
            id: Set(cart_id),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let cart = cart.insert(&*self.db).await?;

        self.event_sender.send_or_log(Event::CartCreated(cart_id)).await;
        info!("Created cart {} for user {}", cart_id, user_id);
        Ok(cart)
    }

    /// Cart lines joined with their products, the shape the aggregation and
    /// checkout both consume.
    pub async fn lines_with_products(
        &self,
        cart_id: Uuid,
    ) -> Result<Vec<(CartItemModel, Option<ProductModel>)>, ServiceError> {
        Ok(CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .find_also_related(Product)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartWithItems, ServiceError> {
        let cart = self.get_or_create_cart(user_id).await?;
        let lines = self.lines_with_products(cart.id).await?;
        let totals = aggregate_lines(&lines);
        let items = lines.into_iter().map(|(item, _)| item).collect();
        Ok(CartWithItems { cart, items, totals })
    }

    /// Adds an item, merging into an existing identical line.
    ///
    /// The unit price is frozen here from the variation (or product) price.
    /// When the merged quantity exceeds available stock the line is clamped
    /// to the maximum and the request is rejected, matching the storefront
    /// contract: the cart is usable, the caller is told to adjust.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartWithItems, ServiceError> {
        input.validate()?;
        let cart = self.get_or_create_cart(user_id).await?;

        let product = Product::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let variation = match input.variation_id {
            Some(variation_id) => {
                let variation = ProductVariation::find_by_id(variation_id)
                    .one(&*self.db)
                    .await?
                    .filter(|v| v.product_id == product.id && v.is_active)
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Variation {} not found", variation_id))
                    })?;
                Some(variation)
            }
            None => None,
        };

        // Price frozen at add-time
        let unit_price = variation.as_ref().map(|v| v.price).unwrap_or(product.price);
        let available = match &variation {
            Some(v) => Some(v.stock_quantity),
            None => product.available_stock(),
        };

        let txn = self.db.begin().await?;

        let mut line_filter = Condition::all()
            .add(cart_item::Column::CartId.eq(cart.id))
            .add(cart_item::Column::ProductId.eq(product.id));
        line_filter = match input.variation_id {
            Some(vid) => line_filter.add(cart_item::Column::VariationId.eq(vid)),
            None => line_filter.add(cart_item::Column::VariationId.is_null()),
        };

        let existing = CartItem::find().filter(line_filter).one(&txn).await?;

        let requested = match &existing {
            Some(line) => line.quantity + input.quantity,
            None => input.quantity,
        };

        let clamped = match available {
            Some(max) if requested > max => Some(max),
            _ => None,
        };
        let quantity = clamped.unwrap_or(requested);

        match existing {
            Some(line) => {
                let mut line: cart_item::ActiveModel = line.into();
                line.quantity = Set(quantity);
                line.updated_at = Set(Utc::now());
                line.update(&txn).await?;
            }
            None => {
                if quantity > 0 {
                    let line = cart_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        cart_id: Set(cart.id),
                        product_id: Set(product.id),
                        variation_id: Set(input.variation_id),
                        quantity: Set(quantity),
                        unit_price: Set(unit_price),
                        created_at: Set(Utc::now()),
                        updated_at: Set(Utc::now()),
                    };
                    line.insert(&txn).await?;
                }
            }
        }

        txn.commit().await?;

        if let Some(max) = clamped {
            return Err(ServiceError::InsufficientStock(format!(
                "Only {} of product {} available; cart adjusted to the maximum",
                max, product.id
            )));
        }

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                product_id: product.id,
            })
            .await;

        info!(
            "Added product {} x{} to cart {}",
            product.id, input.quantity, cart.id
        );
        self.get_cart(user_id).await
    }

    /// Updates a line's quantity; zero removes the line. The frozen unit
    /// price is kept as captured at add-time.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartWithItems, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must not be negative".to_string(),
            ));
        }

        let cart = self.get_or_create_cart(user_id).await?;
        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .filter(|i| i.cart_id == cart.id)
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        if quantity == 0 {
            CartItem::delete_by_id(item_id).exec(&*self.db).await?;
            self.event_sender
                .send_or_log(Event::CartItemRemoved {
                    cart_id: cart.id,
                    item_id,
                })
                .await;
        } else {
            let available = self.available_stock_for(&item).await?;
            if let Some(max) = available {
                if quantity > max {
                    return Err(ServiceError::InsufficientStock(format!(
                        "Only {} available for this item",
                        max
                    )));
                }
            }

            let mut line: cart_item::ActiveModel = item.into();
            line.quantity = Set(quantity);
            line.updated_at = Set(Utc::now());
            line.update(&*self.db).await?;

            self.event_sender
                .send_or_log(Event::CartItemUpdated {
                    cart_id: cart.id,
                    item_id,
                })
                .await;
        }

        self.get_cart(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartWithItems, ServiceError> {
        self.update_item_quantity(user_id, item_id, 0).await
    }

    /// Deletes all lines. The cart row itself stays, ready for reuse.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<CartWithItems, ServiceError> {
        let cart = self.get_or_create_cart(user_id).await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;

        self.event_sender.send_or_log(Event::CartCleared(cart.id)).await;
        info!("Cleared cart {}", cart.id);
        self.get_cart(user_id).await
    }

    async fn available_stock_for(&self, item: &CartItemModel) -> Result<Option<i32>, ServiceError> {
        if let Some(variation_id) = item.variation_id {
            let variation = ProductVariation::find_by_id(variation_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Variation {} not found", variation_id))
                })?;
            return Ok(Some(variation.stock_quantity));
        }

        let product = Product::find_by_id(item.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", item.product_id))
            })?;
        Ok(product.available_stock())
    }
}
