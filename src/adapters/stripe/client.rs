use {
    super::{Lookup, StripeLookup},
    crate::{adapters::payload::{expandable_id, str_at}, domain::error::EngineError},
};

/// Re-fetches through the Stripe API.
pub struct StripeApi {
    client: stripe::Client,
}

impl StripeApi {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: stripe::Client::new(secret_key),
        }
    }

    async fn payment_intent_token_inner(&self, id: &str) -> Result<Option<String>, EngineError> {
        let pi_id = id
            .parse::<stripe::PaymentIntentId>()
            .map_err(|e| EngineError::Gateway(format!("invalid PaymentIntent id: {e}")))?;
        let pi = stripe::PaymentIntent::retrieve(&self.client, &pi_id, &[])
            .await
            .map_err(|e| EngineError::Gateway(format!("Stripe API: {e}")))?;

        let value = serde_json::to_value(&pi)?;
        Ok(str_at(&value, "/metadata/token").map(str::to_string))
    }

    async fn invoice_subscription_inner(&self, id: &str) -> Result<Option<String>, EngineError> {
        let invoice_id = id
            .parse::<stripe::InvoiceId>()
            .map_err(|e| EngineError::Gateway(format!("invalid Invoice id: {e}")))?;
        let invoice = stripe::Invoice::retrieve(&self.client, &invoice_id, &[])
            .await
            .map_err(|e| EngineError::Gateway(format!("Stripe API: {e}")))?;

        let value = serde_json::to_value(&invoice)?;
        Ok(expandable_id(&value, "/subscription").map(str::to_string))
    }
}

impl StripeLookup for StripeApi {
    fn payment_intent_token<'a>(&'a self, payment_intent_id: &'a str) -> Lookup<'a, Option<String>> {
        Box::pin(self.payment_intent_token_inner(payment_intent_id))
    }

    fn invoice_subscription<'a>(&'a self, invoice_id: &'a str) -> Lookup<'a, Option<String>> {
        Box::pin(self.invoice_subscription_inner(invoice_id))
    }
}
