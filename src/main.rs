use {
    credit_sync::{
        AppState,
        adapters::registry::GatewayRegistry,
        config::Config,
        infra::postgres::customer_repo::PgCustomerDirectory,
        services::{
            dispatcher::WebhookDispatcher,
            notifier::{EmailApiNotifier, LogNotifier, Notifier},
        },
        transport,
    },
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::signal,
    tracing_subscriber::EnvFilter,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Arc::new(Config::from_env().expect("invalid configuration"));

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let registry = GatewayRegistry::from_config(&config).expect("failed to build gateway clients");
    if registry.gateways().is_empty() {
        tracing::warn!("no gateway configured, every webhook will answer 404");
    }

    let notifier: Arc<dyn Notifier> = match config.email.clone() {
        Some(email) => {
            let customers = Arc::new(PgCustomerDirectory::new(pool.clone()));
            Arc::new(EmailApiNotifier::new(email, customers).expect("failed to build email client"))
        }
        None => Arc::new(LogNotifier),
    };

    let dispatcher = Arc::new(WebhookDispatcher::new(
        pool.clone(),
        registry,
        notifier.clone(),
        config.webhook_timeout,
    ));

    let state = AppState {
        pool,
        dispatcher,
        notifier,
        config: config.clone(),
    };
    let app = transport::http::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("failed to bind listener");
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
