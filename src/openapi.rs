use utoipa::OpenApi;

/// OpenAPI document for the whole API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marketplace API",
        description = "Multi-vendor e-commerce backend: carts, coupons, shipping, atomic checkout, order lifecycle and returns"
    ),
    paths(
        crate::handlers::carts::get_cart,
        crate::handlers::carts::add_item,
        crate::handlers::carts::update_item,
        crate::handlers::carts::remove_item,
        crate::handlers::carts::clear_cart,
        crate::handlers::coupons::quote_coupon,
        crate::handlers::shipping::available_methods,
        crate::handlers::checkout::checkout_summary,
        crate::handlers::checkout::create_order,
        crate::handlers::checkout::cancel_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::vendor_items,
        crate::handlers::orders::update_item_status,
        crate::handlers::returns::create_return,
        crate::handlers::returns::list_user_returns,
        crate::handlers::returns::list_vendor_returns,
        crate::handlers::returns::process_return,
    ),
    components(schemas(
        crate::entities::cart::Model,
        crate::entities::cart_item::Model,
        crate::entities::coupon::Model,
        crate::entities::coupon::DiscountType,
        crate::entities::coupon_usage::Model,
        crate::entities::order::Model,
        crate::entities::order::OrderStatus,
        crate::entities::order::PaymentStatus,
        crate::entities::order_item::Model,
        crate::entities::order_status_history::Model,
        crate::entities::product::Model,
        crate::entities::product_variation::Model,
        crate::entities::product_variation::VariationAttribute,
        crate::entities::return_request::Model,
        crate::entities::return_request::ReturnStatus,
        crate::entities::return_request::ReturnReason,
        crate::entities::shipping_method::Model,
        crate::services::carts::CartTotals,
        crate::services::carts::CartWithItems,
        crate::services::carts::AddToCartInput,
        crate::services::coupons::ApplyCouponInput,
        crate::services::coupons::CouponQuote,
        crate::services::shipping::ShippingQuote,
        crate::services::checkout::Address,
        crate::services::checkout::CustomerInfo,
        crate::services::checkout::CheckoutContext,
        crate::services::checkout::CheckoutBreakdown,
        crate::services::checkout::CheckoutSummary,
        crate::services::orders::OrderPage,
        crate::services::orders::OrderDetails,
        crate::services::orders::UpdateStatusInput,
        crate::services::orders::UpdateItemStatusInput,
        crate::services::returns::CreateReturnInput,
        crate::services::returns::ProcessReturnInput,
        crate::handlers::carts::UpdateQuantityInput,
        crate::errors::ErrorResponse,
    )),
    tags(
        (name = "carts", description = "Shopping cart management"),
        (name = "coupons", description = "Coupon quotes"),
        (name = "shipping", description = "Shipping method availability and costs"),
        (name = "checkout", description = "Checkout pricing and order creation"),
        (name = "orders", description = "Order history and lifecycle"),
        (name = "vendors", description = "Vendor fulfilment"),
        (name = "returns", description = "Post-delivery returns")
    )
)]
pub struct ApiDoc;
