use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::{signal, sync::mpsc};
use tracing::{error, info};

use storeflow_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events and their best-effort sidecars
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = api::events::EventSender::new(event_tx);

    let audit: Arc<dyn api::services::audit::AuditSink> =
        Arc::new(api::services::audit::TracingAuditSink);
    let notifier: Arc<dyn api::services::notifications::NotificationSink> =
        match cfg.notification_webhook_url.clone() {
            Some(url) => {
                info!("Webhook notifications enabled: {}", url);
                Arc::new(api::services::notifications::WebhookNotificationSink::new(
                    url,
                    Duration::from_secs(cfg.notification_timeout_secs),
                )?)
            }
            None => {
                info!("No notification webhook configured; logging notifications only");
                Arc::new(api::services::notifications::LogNotificationSink)
            }
        };

    tokio::spawn(api::events::process_events(event_rx, audit, notifier));

    // Build application
    let state = api::AppState::new(db_arc, cfg.clone(), event_sender);
    let app = api::build_router(state);

    // Bind and serve
    let addr: SocketAddr = cfg.server_addr().parse()?;
    info!("storeflow-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
