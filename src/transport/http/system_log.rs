use {
    crate::{
        AppState,
        domain::system_log::{LogLevel, NewSystemLog},
        infra::postgres::system_log_repo,
        transport::http::errors::ApiError,
    },
    axum::{
        Json,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde::Deserialize,
};

#[derive(Debug, Deserialize)]
pub struct CreateSystemLog {
    pub level: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Client-side diagnostic logging. Off unless `SYSTEM_LOG_API_ENABLED`.
pub async fn create_system_log(
    State(state): State<AppState>,
    Json(input): Json<CreateSystemLog>,
) -> Result<Response, ApiError> {
    if !state.config.system_log_api_enabled {
        let body = serde_json::json!({
            "error_code": "forbidden",
            "message": "system log API is disabled",
        });
        return Ok((StatusCode::FORBIDDEN, Json(body)).into_response());
    }

    let level = LogLevel::try_from(input.level.as_str())?;
    let entry = NewSystemLog::new(level, input.category, input.description)?;
    system_log_repo::insert(&state.pool, &entry).await?;
    tracing::debug!(level = %level, "system log recorded");

    Ok(Json(serde_json::json!({ "success": true })).into_response())
}
