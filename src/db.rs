use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema,
};
use tracing::info;

use crate::config::AppConfig;
use crate::entities;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Establishes a connection pool sized from application configuration.
pub async fn establish_connection(cfg: &AppConfig) -> Result<DbPool, DbErr> {
    let mut options = ConnectOptions::new(cfg.database_url.clone());
    options
        .max_connections(cfg.db_max_connections)
        .min_connections(cfg.db_min_connections)
        .connect_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(cfg.is_development());

    let pool = Database::connect(options).await?;
    info!("Connected to database");
    Ok(pool)
}

/// Creates any missing tables from the entity definitions.
///
/// Used for sqlite development/test databases and fresh deployments; the
/// statements are `IF NOT EXISTS`, so an existing schema is left untouched.
pub async fn ensure_schema(conn: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    macro_rules! create_table {
        ($entity:expr) => {{
            let mut stmt = schema.create_table_from_entity($entity);
            stmt.if_not_exists();
            conn.execute(backend.build(&stmt)).await?;
        }};
    }

    create_table!(entities::Product);
    create_table!(entities::ProductVariation);
    create_table!(entities::Cart);
    create_table!(entities::CartItem);
    create_table!(entities::Coupon);
    create_table!(entities::CouponUsage);
    create_table!(entities::ShippingMethod);
    create_table!(entities::Order);
    create_table!(entities::OrderItem);
    create_table!(entities::OrderStatusHistory);
    create_table!(entities::ReturnRequest);

    info!("Database schema ensured");
    Ok(())
}
