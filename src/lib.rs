pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;
pub mod transport;

use {
    config::Config,
    services::{dispatcher::WebhookDispatcher, notifier::Notifier},
    std::sync::Arc,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<Config>,
}
