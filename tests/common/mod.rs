#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

use marketplace_api::{
    config::AppConfig,
    db::{ensure_schema, establish_connection},
    entities::{
        coupon, coupon::DiscountType, product, product_variation, shipping_method, CouponModel,
        Product, ProductModel, ProductVariationModel, ShippingMethodModel,
    },
    events::{process_events, EventSender},
    state::AppState,
};

/// Test fixture around a throwaway sqlite database.
///
/// The pool is limited to a single connection so that concurrent requests
/// in a test are serialized by the pool, the same way a busy production
/// pool would interleave them.
pub struct TestApp {
    pub state: Arc<AppState>,
    _tmp: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let db_path = tmp.path().join("test.sqlite");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());

    let mut cfg = AppConfig::for_database(url);
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;

    let db = Arc::new(establish_connection(&cfg).await.expect("connect"));
    ensure_schema(&db).await.expect("create schema");

    let (tx, rx) = mpsc::channel(cfg.event_channel_capacity);
    tokio::spawn(process_events(rx));

    let state = Arc::new(AppState::new(
        db,
        Arc::new(cfg),
        Arc::new(EventSender::new(tx)),
    ));

    TestApp { state, _tmp: tmp }
}

impl TestApp {
    pub async fn seed_product(
        &self,
        price: Decimal,
        weight: Option<Decimal>,
        stock: i32,
    ) -> ProductModel {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            vendor_id: Set(Uuid::new_v4()),
            name: Set(format!("Product {}", id.simple())),
            sku: Set(format!("SKU-{}", id.simple())),
            price: Set(price),
            weight: Set(weight),
            stock_quantity: Set(stock),
            manage_stock: Set(true),
            sales_count: Set(0),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    /// Product whose stock is not tracked at all.
    pub async fn seed_untracked_product(&self, price: Decimal) -> ProductModel {
        let product = self.seed_product(price, None, 0).await;
        let mut active: product::ActiveModel = product.into();
        active.manage_stock = Set(false);
        active.update(&*self.state.db).await.expect("update product")
    }

    pub async fn seed_variation(
        &self,
        product_id: Uuid,
        price: Decimal,
        stock: i32,
    ) -> ProductVariationModel {
        let id = Uuid::new_v4();
        product_variation::ActiveModel {
            id: Set(id),
            product_id: Set(product_id),
            sku: Set(format!("VAR-{}", id.simple())),
            price: Set(price),
            weight: Set(None),
            stock_quantity: Set(stock),
            attributes: Set(serde_json::json!([
                { "attribute": "Size", "value": "L" }
            ])),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed variation")
    }

    pub async fn seed_coupon(&self, code: &str, builder: CouponBuilder) -> CouponModel {
        coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(format!("Coupon {}", code)),
            description: Set(String::new()),
            discount_type: Set(builder.discount_type),
            discount_value: Set(builder.discount_value),
            minimum_order_amount: Set(builder.minimum_order_amount),
            maximum_discount_amount: Set(builder.maximum_discount_amount),
            usage_limit: Set(builder.usage_limit),
            usage_limit_per_user: Set(builder.usage_limit_per_user),
            used_count: Set(0),
            is_active: Set(builder.is_active),
            start_date: Set(builder.start_date),
            end_date: Set(builder.end_date),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed coupon")
    }

    pub async fn seed_shipping_method(
        &self,
        base_cost: Decimal,
        cost_per_kg: Decimal,
        free_shipping_threshold: Option<Decimal>,
    ) -> ShippingMethodModel {
        shipping_method::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Standard".to_string()),
            description: Set(String::new()),
            base_cost: Set(base_cost),
            cost_per_kg: Set(cost_per_kg),
            free_shipping_threshold: Set(free_shipping_threshold),
            min_delivery_days: Set(2),
            max_delivery_days: Set(7),
            is_active: Set(true),
            available_countries: Set(serde_json::json!([])),
            max_weight: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed shipping method")
    }

    pub async fn product_stock(&self, product_id: Uuid) -> (i32, i32) {
        let p = Product::find_by_id(product_id)
            .one(&*self.state.db)
            .await
            .expect("query product")
            .expect("product exists");
        (p.stock_quantity, p.sales_count)
    }
}

/// Coupon seed parameters with sensible defaults: an active 10% coupon
/// valid for a day either side of now, no caps.
pub struct CouponBuilder {
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub minimum_order_amount: Decimal,
    pub maximum_discount_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: Option<i32>,
    pub is_active: bool,
    pub start_date: chrono::DateTime<Utc>,
    pub end_date: chrono::DateTime<Utc>,
}

impl Default for CouponBuilder {
    fn default() -> Self {
        Self {
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(10),
            minimum_order_amount: Decimal::ZERO,
            maximum_discount_amount: None,
            usage_limit: None,
            usage_limit_per_user: None,
            is_active: true,
            start_date: Utc::now() - Duration::days(1),
            end_date: Utc::now() + Duration::days(1),
        }
    }
}

/// Checkout context pointing at the given shipping method, shipping to the
/// default country.
pub fn checkout_context(
    shipping_method_id: Uuid,
    coupon_code: Option<&str>,
) -> marketplace_api::services::checkout::CheckoutContext {
    use marketplace_api::services::checkout::{Address, CheckoutContext, CustomerInfo};

    CheckoutContext {
        shipping_method_id,
        coupon_code: coupon_code.map(str::to_string),
        customer: CustomerInfo {
            email: "buyer@example.com".to_string(),
            phone: "+911234567890".to_string(),
            first_name: "Asha".to_string(),
            last_name: "Patel".to_string(),
        },
        shipping_address: Address {
            line_1: "1 MG Road".to_string(),
            line_2: String::new(),
            city: "Bengaluru".to_string(),
            state: "KA".to_string(),
            postal_code: "560001".to_string(),
            country: "IN".to_string(),
        },
        billing_address: None,
        payment_method: "card".to_string(),
        customer_notes: String::new(),
    }
}
