mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use marketplace_api::{
    entities::{
        coupon, coupon_usage, order::OrderStatus, order_item, order_status_history, Coupon,
        CouponUsage, Order, OrderItem, OrderStatusHistory,
    },
    errors::ServiceError,
    services::carts::AddToCartInput,
};

use common::{checkout_context, spawn_app, CouponBuilder, TestApp};

async fn fill_cart(app: &TestApp, user_id: Uuid, product_id: Uuid, quantity: i32) {
    app.state
        .carts
        .add_item(
            user_id,
            AddToCartInput {
                product_id,
                variation_id: None,
                quantity,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn breakdown_combines_tax_shipping_and_subtotal() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let product = app.seed_product(dec!(500.00), Some(dec!(1.00)), 10).await;
    let method = app.seed_shipping_method(dec!(50.00), dec!(2.00), None).await;

    fill_cart(&app, user_id, product.id, 2).await;

    let summary = app
        .state
        .checkout
        .checkout_summary(user_id, &checkout_context(method.id, None))
        .await
        .unwrap();

    // 1000 merchandise, 18% tax, 50 base + 2kg * 2/kg shipping
    assert_eq!(summary.breakdown.subtotal, dec!(1000.00));
    assert_eq!(summary.breakdown.tax_amount, dec!(180.00));
    assert_eq!(summary.breakdown.shipping_cost, dec!(54.00));
    assert_eq!(summary.breakdown.discount_amount, dec!(0.00));
    assert_eq!(summary.breakdown.total_amount, dec!(1234.00));
}

#[tokio::test]
async fn capped_percentage_coupon_reduces_the_total() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let product = app.seed_product(dec!(500.00), Some(dec!(1.00)), 10).await;
    let method = app.seed_shipping_method(dec!(50.00), dec!(2.00), None).await;
    app.seed_coupon(
        "TENOFF",
        CouponBuilder {
            maximum_discount_amount: Some(dec!(80.00)),
            ..Default::default()
        },
    )
    .await;

    fill_cart(&app, user_id, product.id, 2).await;

    let summary = app
        .state
        .checkout
        .checkout_summary(user_id, &checkout_context(method.id, Some("TENOFF")))
        .await
        .unwrap();

    // 10% of 1000 would be 100; the cap holds it at 80
    assert_eq!(summary.breakdown.discount_amount, dec!(80.00));
    assert_eq!(summary.breakdown.total_amount, dec!(1154.00));
}

#[tokio::test]
async fn free_shipping_coupon_waives_shipping_only() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let product = app.seed_product(dec!(500.00), Some(dec!(1.00)), 10).await;
    let method = app.seed_shipping_method(dec!(50.00), dec!(2.00), None).await;
    app.seed_coupon(
        "SHIPFREE",
        CouponBuilder {
            discount_type: marketplace_api::entities::coupon::DiscountType::FreeShipping,
            discount_value: dec!(0),
            ..Default::default()
        },
    )
    .await;

    fill_cart(&app, user_id, product.id, 2).await;

    let summary = app
        .state
        .checkout
        .checkout_summary(user_id, &checkout_context(method.id, Some("SHIPFREE")))
        .await
        .unwrap();

    assert_eq!(summary.breakdown.shipping_cost, dec!(0.00));
    assert_eq!(summary.breakdown.discount_amount, dec!(0.00));
    assert_eq!(summary.breakdown.total_amount, dec!(1180.00));
}

#[tokio::test]
async fn create_order_snapshots_everything_and_clears_the_cart() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let product = app.seed_product(dec!(500.00), Some(dec!(1.00)), 10).await;
    let method = app.seed_shipping_method(dec!(50.00), dec!(2.00), None).await;
    app.seed_coupon("TEN", CouponBuilder::default()).await;

    fill_cart(&app, user_id, product.id, 2).await;

    let order = app
        .state
        .checkout
        .create_order(user_id, checkout_context(method.id, Some("TEN")))
        .await
        .unwrap();

    assert!(order.order_number.starts_with("ORD"));
    assert_eq!(order.order_number.len(), 11);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.subtotal, dec!(1000.00));
    assert_eq!(order.discount_amount, dec!(100.00));
    assert_eq!(order.total_amount, dec!(1134.00));
    assert_eq!(order.customer_email, "buyer@example.com");
    // Billing defaults to the shipping address
    assert_eq!(order.billing_city, order.shipping_city);

    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_name, product.name);
    assert_eq!(items[0].unit_price, dec!(500.00));
    assert_eq!(items[0].total_price, dec!(1000.00));
    assert_eq!(items[0].vendor_id, product.vendor_id);

    // Stock moved, sales counted
    assert_eq!(app.product_stock(product.id).await, (8, 2));

    // Cart emptied
    let cart = app.state.carts.get_cart(user_id).await.unwrap();
    assert!(cart.items.is_empty());

    // Coupon redeemed exactly once
    let coupon_row = Coupon::find()
        .filter(coupon::Column::Code.eq("TEN"))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(coupon_row.used_count, 1);
    let usages = CouponUsage::find()
        .filter(coupon_usage::Column::OrderId.eq(order.id))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(usages, 1);

    // Initial history row
    let history = OrderStatusHistory::find()
        .filter(order_status_history::Column::OrderId.eq(order.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, OrderStatus::Pending);
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let app = spawn_app().await;
    let method = app.seed_shipping_method(dec!(50.00), dec!(2.00), None).await;

    let err = app
        .state
        .checkout
        .create_order(Uuid::new_v4(), checkout_context(method.id, None))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::EmptyCart);
}

#[tokio::test]
async fn failed_stock_decrement_rolls_back_the_whole_checkout() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let product = app.seed_product(dec!(100.00), None, 5).await;
    let method = app.seed_shipping_method(dec!(50.00), dec!(2.00), None).await;

    fill_cart(&app, user_id, product.id, 3).await;

    // Stock disappears between carting and checkout
    use marketplace_api::entities::product;
    use sea_orm::{ActiveModelTrait, Set};
    let mut active: product::ActiveModel = product.clone().into();
    active.stock_quantity = Set(1);
    active.update(&*app.state.db).await.unwrap();

    let err = app
        .state
        .checkout
        .create_order(user_id, checkout_context(method.id, None))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // Nothing was written and the cart survived
    assert_eq!(Order::find().count(&*app.state.db).await.unwrap(), 0);
    assert_eq!(OrderItem::find().count(&*app.state.db).await.unwrap(), 0);
    assert_eq!(app.product_stock(product.id).await, (1, 0));
    let cart = app.state.carts.get_cart(user_id).await.unwrap();
    assert_eq!(cart.items[0].quantity, 3);
}

#[tokio::test]
async fn concurrent_checkouts_cannot_oversell_the_last_unit() {
    let app = spawn_app().await;
    let product = app.seed_product(dec!(100.00), None, 1).await;
    let method = app.seed_shipping_method(dec!(50.00), dec!(2.00), None).await;

    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    fill_cart(&app, user_a, product.id, 1).await;
    fill_cart(&app, user_b, product.id, 1).await;

    let (a, b) = tokio::join!(
        app.state
            .checkout
            .create_order(user_a, checkout_context(method.id, None)),
        app.state
            .checkout
            .create_order(user_b, checkout_context(method.id, None)),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one checkout may win the last unit");
    for result in [a, b] {
        if let Err(err) = result {
            assert_matches!(
                err,
                ServiceError::InsufficientStock(_) | ServiceError::TransactionConflict(_)
            );
        }
    }

    let (stock, sales) = app.product_stock(product.id).await;
    assert_eq!(stock, 0);
    assert_eq!(sales, 1);
    assert_eq!(Order::find().count(&*app.state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn second_redemption_respects_the_global_cap() {
    let app = spawn_app().await;
    let method = app.seed_shipping_method(dec!(50.00), dec!(2.00), None).await;
    let product = app.seed_product(dec!(100.00), None, 10).await;
    app.seed_coupon(
        "ONCE",
        CouponBuilder {
            usage_limit: Some(1),
            ..Default::default()
        },
    )
    .await;

    let user_a = Uuid::new_v4();
    fill_cart(&app, user_a, product.id, 1).await;
    app.state
        .checkout
        .create_order(user_a, checkout_context(method.id, Some("ONCE")))
        .await
        .unwrap();

    let user_b = Uuid::new_v4();
    fill_cart(&app, user_b, product.id, 1).await;
    let err = app
        .state
        .checkout
        .create_order(user_b, checkout_context(method.id, Some("ONCE")))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidCoupon(msg) if msg.contains("usage limit"));
}

#[tokio::test]
async fn cancelling_a_pending_order_reverses_everything() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let product = app.seed_product(dec!(100.00), None, 4).await;
    let method = app.seed_shipping_method(dec!(50.00), dec!(2.00), None).await;
    app.seed_coupon("TEN", CouponBuilder::default()).await;

    fill_cart(&app, user_id, product.id, 3).await;
    let order = app
        .state
        .checkout
        .create_order(user_id, checkout_context(method.id, Some("TEN")))
        .await
        .unwrap();
    assert_eq!(app.product_stock(product.id).await, (1, 3));

    let cancelled = app
        .state
        .checkout
        .cancel_order(user_id, order.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    // Stock restored, sales rolled back, coupon released
    assert_eq!(app.product_stock(product.id).await, (4, 0));
    let coupon_row = Coupon::find()
        .filter(coupon::Column::Code.eq("TEN"))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(coupon_row.used_count, 0);

    // Cancellation is in the audit trail
    let history = OrderStatusHistory::find()
        .filter(order_status_history::Column::OrderId.eq(order.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn orders_past_confirmation_cannot_be_cancelled() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let product = app.seed_product(dec!(100.00), None, 5).await;
    let method = app.seed_shipping_method(dec!(50.00), dec!(2.00), None).await;

    fill_cart(&app, user_id, product.id, 1).await;
    let order = app
        .state
        .checkout
        .create_order(user_id, checkout_context(method.id, None))
        .await
        .unwrap();

    // Move the order to processing
    use marketplace_api::services::orders::UpdateStatusInput;
    for status in [OrderStatus::Confirmed, OrderStatus::Processing] {
        app.state
            .orders
            .update_order_status(
                order.id,
                UpdateStatusInput {
                    status,
                    notes: String::new(),
                    tracking_number: None,
                    carrier: None,
                },
                None,
            )
            .await
            .unwrap();
    }

    let err = app
        .state
        .checkout
        .cancel_order(user_id, order.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatusTransition { .. });

    // Stock stays committed to the order
    assert_eq!(app.product_stock(product.id).await, (4, 1));
}
