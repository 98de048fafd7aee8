pub mod carts;
pub mod checkout;
pub mod coupons;
pub mod orders;
pub mod returns;
pub mod shipping;

pub use carts::CartService;
pub use checkout::CheckoutService;
pub use coupons::CouponService;
pub use orders::OrderService;
pub use returns::ReturnService;
pub use shipping::ShippingService;
