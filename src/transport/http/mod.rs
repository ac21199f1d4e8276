pub mod errors;
pub mod system_log;
pub mod webhook;

use {
    crate::AppState,
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    std::time::Duration,
    tower_http::{timeout::TimeoutLayer, trace::TraceLayer},
};

/// Gateway payloads are well under 20 KB.
pub const BODY_LIMIT: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    // Backstop only. The dispatcher enforces the real budget and answers 503 itself.
    let backstop = state.config.webhook_timeout + Duration::from_secs(2);

    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/webhook/{gateway}", post(webhook::webhook_handler))
        .route(
            "/api/system-log/create/",
            post(system_log::create_system_log),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TimeoutLayer::new(backstop))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
