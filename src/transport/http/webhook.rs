use {
    crate::{AppState, domain::gateway::RawWebhook, transport::http::errors::ApiError},
    axum::{
        Json,
        extract::{Path, State},
        http::HeaderMap,
    },
};

#[tracing::instrument(name = "webhook", skip_all, fields(gateway = %gateway))]
pub async fn webhook_handler(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let reply = state
        .dispatcher
        .handle(&gateway, RawWebhook { headers, body })
        .await?;

    tracing::info!(status = reply.status(), "webhook handled");
    Ok(Json(serde_json::json!({ "status": reply.status() })))
}
