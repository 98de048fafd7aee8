mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use uuid::Uuid;

use marketplace_api::{
    entities::order::OrderStatus,
    errors::ServiceError,
    services::{
        carts::AddToCartInput,
        orders::{UpdateItemStatusInput, UpdateStatusInput},
    },
};

use common::{checkout_context, spawn_app, TestApp};

fn item_status(status: OrderStatus) -> UpdateItemStatusInput {
    UpdateItemStatusInput {
        status,
        tracking_number: None,
        carrier: None,
    }
}

/// Two-vendor order: one item from each product's (random) vendor.
async fn two_vendor_order(app: &TestApp, user_id: Uuid) -> (Uuid, Vec<marketplace_api::entities::OrderItemModel>) {
    let product_a = app.seed_product(dec!(100.00), None, 10).await;
    let product_b = app.seed_product(dec!(200.00), None, 10).await;
    let method = app.seed_shipping_method(dec!(50.00), dec!(1.00), None).await;

    for product_id in [product_a.id, product_b.id] {
        app.state
            .carts
            .add_item(
                user_id,
                AddToCartInput {
                    product_id,
                    variation_id: None,
                    quantity: 1,
                },
            )
            .await
            .unwrap();
    }

    let order = app
        .state
        .checkout
        .create_order(user_id, checkout_context(method.id, None))
        .await
        .unwrap();

    let details = app.state.orders.get_order(user_id, order.id).await.unwrap();
    (order.id, details.items)
}

#[tokio::test]
async fn parent_order_waits_for_all_items() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let (order_id, items) = two_vendor_order(&app, user_id).await;

    // First vendor confirms; the other item is still pending
    app.state
        .orders
        .update_item_status(items[0].vendor_id, items[0].id, item_status(OrderStatus::Confirmed))
        .await
        .unwrap();
    let details = app.state.orders.get_order(user_id, order_id).await.unwrap();
    assert_eq!(details.order.status, OrderStatus::Pending);

    // Second vendor confirms; now the parent follows
    app.state
        .orders
        .update_item_status(items[1].vendor_id, items[1].id, item_status(OrderStatus::Confirmed))
        .await
        .unwrap();
    let details = app.state.orders.get_order(user_id, order_id).await.unwrap();
    assert_eq!(details.order.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn item_transitions_follow_the_lifecycle() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let (_, items) = two_vendor_order(&app, user_id).await;

    // pending -> shipped skips stages
    let err = app
        .state
        .orders
        .update_item_status(items[0].vendor_id, items[0].id, item_status(OrderStatus::Shipped))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatusTransition { .. });
}

#[tokio::test]
async fn another_vendor_cannot_touch_the_item() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let (_, items) = two_vendor_order(&app, user_id).await;

    let err = app
        .state
        .orders
        .update_item_status(Uuid::new_v4(), items[0].id, item_status(OrderStatus::Confirmed))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn shipping_stamps_tracking_and_timestamps() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let (order_id, _) = two_vendor_order(&app, user_id).await;

    for status in [OrderStatus::Confirmed, OrderStatus::Processing] {
        app.state
            .orders
            .update_order_status(
                order_id,
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

    let shipped = app
        .state
        .orders
        .update_order_status(
            order_id,
            UpdateStatusInput {
                status: OrderStatus::Shipped,
                notes: "Left the warehouse".to_string(),
                tracking_number: Some("TRK123".to_string()),
                carrier: Some("BlueDart".to_string()),
            },
            None,
        )
        .await
        .unwrap();
    assert!(shipped.shipped_at.is_some());
    assert_eq!(shipped.tracking_number.as_deref(), Some("TRK123"));

    let delivered = app
        .state
        .orders
        .update_order_status(
            order_id,
            UpdateStatusInput {
                status: OrderStatus::Delivered,
                notes: String::new(),
                tracking_number: None,
                carrier: None,
            },
            None,
        )
        .await
        .unwrap();
    assert!(delivered.delivered_at.is_some());

    // Terminal: nothing moves a delivered order
    let err = app
        .state
        .orders
        .update_order_status(
            order_id,
            UpdateStatusInput {
                status: OrderStatus::Confirmed,
                notes: String::new(),
                tracking_number: None,
                carrier: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatusTransition { .. });
}

#[tokio::test]
async fn order_listing_pages_newest_first() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let product = app.seed_product(dec!(50.00), None, 100).await;
    let method = app.seed_shipping_method(dec!(50.00), dec!(1.00), None).await;

    for _ in 0..3 {
        app.state
            .carts
            .add_item(
                user_id,
                AddToCartInput {
                    product_id: product.id,
                    variation_id: None,
                    quantity: 1,
                },
            )
            .await
            .unwrap();
        app.state
            .checkout
            .create_order(user_id, checkout_context(method.id, None))
            .await
            .unwrap();
    }

    let page = app.state.orders.list_orders(user_id, 1, 2).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.orders.len(), 2);

    let page_two = app.state.orders.list_orders(user_id, 2, 2).await.unwrap();
    assert_eq!(page_two.orders.len(), 1);

    // A stranger sees nothing
    let stranger = app
        .state
        .orders
        .list_orders(Uuid::new_v4(), 1, 10)
        .await
        .unwrap();
    assert_eq!(stranger.total, 0);
}

#[tokio::test]
async fn vendor_sees_only_their_items() {
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let (_, items) = two_vendor_order(&app, user_id).await;

    let mine = app
        .state
        .orders
        .vendor_items(items[0].vendor_id)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, items[0].id);
}
