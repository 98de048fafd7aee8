use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{coupon, coupon_usage, Coupon, CouponModel, CouponUsage},
    errors::ServiceError,
};

/// Coupon evaluator: validation chain and discount quotes.
///
/// Validation and quoting never mutate anything; `used_count` increments and
/// `coupon_usages` rows are written only inside committed order creation.
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
}

/// Input for applying a coupon code to the current cart
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyCouponInput {
    pub code: String,
}

/// Stateless coupon quote: nothing is reserved by computing it, and the
/// checkout assembler re-validates the code at commit time.
#[derive(Debug, Serialize, ToSchema)]
pub struct CouponQuote {
    pub coupon: CouponModel,
    pub discount_amount: Decimal,
    pub new_total: Decimal,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_code(&self, code: &str) -> Result<CouponModel, ServiceError> {
        Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::InvalidCoupon(format!("Coupon {} does not exist", code)))
    }

    /// Validates a coupon against the order context.
    ///
    /// Checks run in a fixed order and the first failure wins: active flag,
    /// date window (inclusive at both boundary instants), minimum order
    /// amount, global usage cap, per-user usage cap.
    #[instrument(skip(self, coupon), fields(code = %coupon.code))]
    pub async fn validate(
        &self,
        coupon: &CouponModel,
        user_id: Uuid,
        cart_subtotal: Decimal,
    ) -> Result<(), ServiceError> {
        if !coupon.is_active {
            return Err(ServiceError::InvalidCoupon("Coupon is not active".into()));
        }

        let now = Utc::now();
        if now < coupon.start_date {
            return Err(ServiceError::InvalidCoupon("Coupon is not yet valid".into()));
        }
        if now > coupon.end_date {
            return Err(ServiceError::InvalidCoupon("Coupon has expired".into()));
        }

        if cart_subtotal < coupon.minimum_order_amount {
            return Err(ServiceError::InvalidCoupon(format!(
                "Minimum order amount is {}",
                coupon.minimum_order_amount
            )));
        }

        if let Some(limit) = coupon.usage_limit {
            if coupon.used_count >= limit {
                return Err(ServiceError::InvalidCoupon(
                    "Coupon usage limit reached".into(),
                ));
            }
        }

        if let Some(per_user_limit) = coupon.usage_limit_per_user {
            let user_usage = CouponUsage::find()
                .filter(coupon_usage::Column::CouponId.eq(coupon.id))
                .filter(coupon_usage::Column::UserId.eq(user_id))
                .count(&*self.db)
                .await?;
            if user_usage >= per_user_limit as u64 {
                return Err(ServiceError::InvalidCoupon(
                    "You have reached the usage limit for this coupon".into(),
                ));
            }
        }

        Ok(())
    }

    /// Validates the code and quotes the discount against the given
    /// subtotal. Replaces the session-stashed "applied coupon" of older
    /// storefronts: the caller carries the code into checkout explicitly.
    #[instrument(skip(self))]
    pub async fn quote(
        &self,
        user_id: Uuid,
        code: &str,
        cart_subtotal: Decimal,
    ) -> Result<CouponQuote, ServiceError> {
        let coupon = self.find_by_code(code).await?;
        self.validate(&coupon, user_id, cart_subtotal).await?;

        let discount_amount = coupon.calculate_discount(cart_subtotal);
        Ok(CouponQuote {
            discount_amount,
            new_total: cart_subtotal - discount_amount,
            coupon,
        })
    }
}
