use std::{net::SocketAddr, sync::Arc};

use mongodb::Client;

use crypto_alerts::{
    config,
    routes,
    services::{
        alert_monitor::AlertMonitor,
        alerts_service::MongoAlertStore,
        db_init,
        mailer::SmtpMailer,
        market_data::BinanceClient,
        notifier::Notifier,
        scheduler::AlertScheduler,
        user_service::MongoUserDirectory,
    },
    templates, AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = db_init::ensure_indexes(&db).await {
        tracing::warn!(error = %e, "failed to ensure indexes");
    }

    let store_timeout = settings.scheduler.store_timeout;
    let store = Arc::new(MongoAlertStore::new(&db, store_timeout));
    let users = Arc::new(MongoUserDirectory::new(&db, store_timeout));
    let market = Arc::new(BinanceClient::new(
        settings.binance_spot_url.clone(),
        settings.binance_futures_url.clone(),
    ));
    let mailer = Arc::new(SmtpMailer::from_settings(&settings).expect("Invalid SMTP settings"));

    let notifier = Notifier::new(users, mailer, templates::build_handlebars());
    let monitor = Arc::new(AlertMonitor::new(
        store,
        market,
        notifier,
        settings.scheduler.clone(),
    ));
    let scheduler = Arc::new(AlertScheduler::new(monitor));

    if settings.scheduler_autostart {
        scheduler.start().await;
    }

    let state = AppState {
        db,
        settings: settings.clone(),
        scheduler: scheduler.clone(),
    };

    let app = routes::app(state);

    let addr = SocketAddr::from((
        settings
            .host
            .parse::<std::net::IpAddr>()
            .expect("HOST must be an IP address"),
        settings.port,
    ));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .expect("server error");

    scheduler.stop().await;
}
