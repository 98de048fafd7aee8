use std::{sync::Arc, time::Duration};

use tokio::{net::TcpListener, signal, sync::mpsc};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use marketplace_api::{
    config::{init_tracing, load_config},
    db::{ensure_schema, establish_connection},
    events::{process_events, EventSender},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = load_config()?;
    init_tracing(&cfg.log_level, cfg.log_json);

    let db = Arc::new(establish_connection(&cfg).await?);
    if cfg.auto_migrate {
        ensure_schema(&db).await?;
    }

    let (tx, rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = Arc::new(EventSender::new(tx));
    tokio::spawn(process_events(rx));

    let addr = format!("{}:{}", cfg.host, cfg.port);
    let state = Arc::new(AppState::new(db, Arc::new(cfg), event_sender));

    let app = marketplace_api::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
