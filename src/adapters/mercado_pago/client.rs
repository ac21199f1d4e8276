use {
    super::{Fetch, MercadoPagoLookup},
    crate::domain::error::EngineError,
    serde_json::Value,
    std::time::Duration,
};

/// Read-only client for the Mercado Pago REST API.
pub struct MercadoPagoApi {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MercadoPagoApi {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Gateway(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    async fn get(&self, path: String) -> Result<Value, EngineError> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| EngineError::Gateway(format!("Mercado Pago {path}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| EngineError::Gateway(format!("Mercado Pago {path}: {e}")))?;

        if !status.is_success() {
            return Err(EngineError::Gateway(format!(
                "Mercado Pago {path} answered {}: {body}",
                status.as_u16()
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| EngineError::Gateway(format!("Mercado Pago {path}: invalid JSON: {e}")))
    }
}

impl MercadoPagoLookup for MercadoPagoApi {
    fn payment<'a>(&'a self, id: &'a str) -> Fetch<'a> {
        Box::pin(self.get(format!("/v1/payments/{id}")))
    }

    fn preapproval<'a>(&'a self, id: &'a str) -> Fetch<'a> {
        Box::pin(self.get(format!("/preapproval/{id}")))
    }

    fn authorized_payment<'a>(&'a self, id: &'a str) -> Fetch<'a> {
        Box::pin(self.get(format!("/authorized_payments/{id}")))
    }
}
