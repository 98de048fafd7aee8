pub mod cart;
pub mod cart_item;
pub mod coupon;
pub mod coupon_usage;
pub mod order;
pub mod order_item;
pub mod order_status_history;
pub mod product;
pub mod product_variation;
pub mod return_request;
pub mod shipping_method;

pub use cart::Entity as Cart;
pub use cart_item::Entity as CartItem;
pub use coupon::Entity as Coupon;
pub use coupon_usage::Entity as CouponUsage;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use order_status_history::Entity as OrderStatusHistory;
pub use product::Entity as Product;
pub use product_variation::Entity as ProductVariation;
pub use return_request::Entity as ReturnRequest;
pub use shipping_method::Entity as ShippingMethod;

pub use cart::Model as CartModel;
pub use cart_item::Model as CartItemModel;
pub use coupon::Model as CouponModel;
pub use coupon_usage::Model as CouponUsageModel;
pub use order::Model as OrderModel;
pub use order_item::Model as OrderItemModel;
pub use order_status_history::Model as OrderStatusHistoryModel;
pub use product::Model as ProductModel;
pub use product_variation::Model as ProductVariationModel;
pub use return_request::Model as ReturnRequestModel;
pub use shipping_method::Model as ShippingMethodModel;
