use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    events::EventSender,
    services::{
        CartService, CheckoutService, CouponService, OrderService, ReturnService, ShippingService,
    },
};

/// Shared application state: one service instance per domain, all cloning
/// the same connection pool and event channel.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub event_sender: Arc<EventSender>,
    pub carts: CartService,
    pub coupons: CouponService,
    pub shipping: ShippingService,
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub returns: ReturnService,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let carts = CartService::new(db.clone(), event_sender.clone());
        let coupons = CouponService::new(db.clone());
        let shipping = ShippingService::new(db.clone());
        let checkout = CheckoutService::new(
            db.clone(),
            event_sender.clone(),
            config.clone(),
            carts.clone(),
            coupons.clone(),
            shipping.clone(),
        );
        let orders = OrderService::new(db.clone(), event_sender.clone());
        let returns = ReturnService::new(db.clone(), event_sender.clone());

        Self {
            config,
            db,
            event_sender,
            carts,
            coupons,
            shipping,
            checkout,
            orders,
            returns,
        }
    }
}
