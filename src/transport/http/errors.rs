use {
    crate::domain::error::EngineError,
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
};

/// Newtype so the domain error can implement axum's `IntoResponse`.
/// The only place an `EngineError` becomes an HTTP status.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            EngineError::Authentication(_) | EngineError::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Gateway(_) | EngineError::Database(_) | EngineError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_code, message) = match &self.0 {
            EngineError::Authentication(_) => {
                ("webhook_error", "invalid webhook signature".to_string())
            }
            EngineError::MalformedPayload(msg) => ("malformed_payload", msg.clone()),
            EngineError::Validation(msg) => ("validation_error", msg.clone()),
            EngineError::NotFound(msg) => ("not_found", msg.clone()),
            EngineError::Timeout(_) => ("timeout", "webhook processing timed out".to_string()),
            EngineError::Gateway(msg) => ("gateway_error", msg.clone()),
            EngineError::Database(err) => {
                tracing::error!("database error: {err}");
                ("internal_error", "internal error".to_string())
            }
            EngineError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                ("internal_error", "internal error".to_string())
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (EngineError::Authentication("x".into()), StatusCode::BAD_REQUEST),
            (EngineError::MalformedPayload("x".into()), StatusCode::BAD_REQUEST),
            (EngineError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (EngineError::Timeout(8000), StatusCode::SERVICE_UNAVAILABLE),
            (EngineError::Gateway("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                EngineError::Database(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).into_response().status(), expected);
        }
    }
}
