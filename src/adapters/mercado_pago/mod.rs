pub mod client;

use {
    super::payload::{first_f64, id_at, str_at},
    crate::domain::{
        error::EngineError,
        event::{Correlation, NormalizedEvent},
        gateway::{Gateway, GatewayNormalizer, RawWebhook, UnresolvedPolicy},
        id::{CorrelationToken, GatewayNativeId},
        money::{Currency, MoneyAmount},
        object_ref::ObjectType,
        status::{CreditPurchaseStatus, SubscriptionStatus, TargetStatus},
    },
    serde_json::{Value, json},
    std::{future::Future, pin::Pin, sync::Arc},
};

pub type Fetch<'a> = Pin<Box<dyn Future<Output = Result<Value, EngineError>> + Send + 'a>>;

/// Mercado Pago notifications only say "something changed"; every resource is re-fetched.
pub trait MercadoPagoLookup: Send + Sync {
    fn payment<'a>(&'a self, id: &'a str) -> Fetch<'a>;
    fn preapproval<'a>(&'a self, id: &'a str) -> Fetch<'a>;
    fn authorized_payment<'a>(&'a self, id: &'a str) -> Fetch<'a>;
}

pub struct MercadoPagoNormalizer {
    lookup: Arc<dyn MercadoPagoLookup>,
    default_currency: Currency,
}

impl MercadoPagoNormalizer {
    pub fn new(lookup: Arc<dyn MercadoPagoLookup>, default_currency: Currency) -> Self {
        Self {
            lookup,
            default_currency,
        }
    }

    async fn normalize_inner(&self, raw: &RawWebhook) -> Result<NormalizedEvent, EngineError> {
        let notification: Value = serde_json::from_str(&raw.body)
            .map_err(|e| EngineError::MalformedPayload(format!("invalid JSON: {e}")))?;
        let (topic, data_id) = match (str_at(&notification, "/type"), id_at(&notification, "/data/id")) {
            (Some(topic), Some(id)) => (topic.to_string(), id),
            _ => {
                return Err(EngineError::MalformedPayload(
                    "missing 'type' or 'data.id'".into(),
                ));
            }
        };
        // The id ends up in an authenticated API path.
        if !is_resource_id(&data_id) {
            return Err(EngineError::MalformedPayload(format!(
                "unusable data.id: {data_id:?}"
            )));
        }

        match topic.as_str() {
            "payment" => {
                let resource = self.lookup.payment(&data_id).await?;
                self.from_payment(topic, &data_id, notification, resource)
            }
            "subscription_preapproval" => {
                let resource = self.lookup.preapproval(&data_id).await?;
                self.from_preapproval(topic, notification, resource)
            }
            "subscription_authorized_payment" => {
                let authorized = self.lookup.authorized_payment(&data_id).await?;
                let preapproval_id = id_at(&authorized, "/preapproval_id")
                    .filter(|id| is_resource_id(id))
                    .ok_or_else(|| {
                        EngineError::Gateway(format!(
                            "authorized payment {data_id} has no usable preapproval_id"
                        ))
                    })?;
                let resource = self.lookup.preapproval(&preapproval_id).await?;
                self.from_preapproval(topic, notification, resource)
            }
            other => Err(EngineError::MalformedPayload(format!(
                "unsupported topic: {other}"
            ))),
        }
    }

    fn from_payment(
        &self,
        topic: String,
        data_id: &str,
        notification: Value,
        payment: Value,
    ) -> Result<NormalizedEvent, EngineError> {
        let status = str_at(&payment, "/status").unwrap_or("unknown").to_string();
        let correlation = parse_reference(&payment).map(Correlation::Token);

        // Subscription cycles are driven by preapproval topics; a payment is only logged.
        let target = match correlation.as_ref().map(Correlation::object_type) {
            Some(ObjectType::CreditPurchase) => {
                Some(TargetStatus::CreditPurchase(map_payment_status(&status)))
            }
            _ => None,
        };

        let native_id = id_at(&payment, "/id").unwrap_or_else(|| data_id.to_string());

        Ok(NormalizedEvent {
            gateway: Gateway::MercadoPago,
            gateway_event_type: topic,
            gateway_status: status,
            target,
            amount: self.amount(&payment, &["/transaction_details/total_paid_amount", "/transaction_amount"])?,
            currency: Some(self.currency(&payment, "/currency_id")),
            correlation,
            native_id: GatewayNativeId::new(native_id)?,
            subscription_external_id: None,
            raw: json!({"notification": notification, "resource": payment}),
        })
    }

    fn from_preapproval(
        &self,
        topic: String,
        notification: Value,
        preapproval: Value,
    ) -> Result<NormalizedEvent, EngineError> {
        let id = id_at(&preapproval, "/id")
            .ok_or_else(|| EngineError::Gateway("preapproval response has no id".into()))?;
        let status = str_at(&preapproval, "/status").unwrap_or("unknown").to_string();

        // Checkout stores the preapproval id as the subscription's external id.
        let correlation = match parse_reference(&preapproval) {
            Some(token) => Correlation::Token(token),
            None => Correlation::ExternalSubscription(id.clone()),
        };
        let target = match correlation.object_type() {
            ObjectType::Subscription => {
                Some(TargetStatus::Subscription(map_preapproval_status(&status)))
            }
            _ => None,
        };

        // One dedup key per billing cycle.
        let native_id = match str_at(&preapproval, "/next_payment_date") {
            Some(next) => format!("{id}:{next}"),
            None => id.clone(),
        };

        Ok(NormalizedEvent {
            gateway: Gateway::MercadoPago,
            gateway_event_type: topic,
            gateway_status: status,
            target,
            amount: self.amount(&preapproval, &["/auto_recurring/transaction_amount"])?,
            currency: Some(self.currency(&preapproval, "/auto_recurring/currency_id")),
            correlation: Some(correlation),
            native_id: GatewayNativeId::new(native_id)?,
            subscription_external_id: Some(id),
            raw: json!({"notification": notification, "resource": preapproval}),
        })
    }

    fn amount(&self, resource: &Value, fields: &[&str]) -> Result<MoneyAmount, EngineError> {
        match first_f64(resource, fields) {
            Some(major) => MoneyAmount::from_major(major)
                .map_err(|e| EngineError::MalformedPayload(e.to_string())),
            None => Ok(MoneyAmount::ZERO),
        }
    }

    fn currency(&self, resource: &Value, pointer: &str) -> Currency {
        str_at(resource, pointer)
            .and_then(|c| Currency::new(c).ok())
            .unwrap_or_else(|| self.default_currency.clone())
    }
}

impl GatewayNormalizer for MercadoPagoNormalizer {
    fn gateway(&self) -> Gateway {
        Gateway::MercadoPago
    }

    fn normalize<'a>(
        &'a self,
        raw: &'a RawWebhook,
    ) -> Pin<Box<dyn Future<Output = Result<NormalizedEvent, EngineError>> + Send + 'a>> {
        Box::pin(self.normalize_inner(raw))
    }

    fn unresolved_policy(&self) -> UnresolvedPolicy {
        UnresolvedPolicy::NotFound
    }
}

fn is_resource_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn parse_reference(resource: &Value) -> Option<CorrelationToken> {
    let reference = str_at(resource, "/external_reference")?;
    match CorrelationToken::parse(reference) {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::debug!(reference, "unusable external_reference: {e}");
            None
        }
    }
}

pub fn map_payment_status(status: &str) -> CreditPurchaseStatus {
    match status {
        "approved" => CreditPurchaseStatus::Approved,
        "pending" | "in_process" => CreditPurchaseStatus::Analysis,
        "rejected" => CreditPurchaseStatus::Rejected,
        "cancelled" => CreditPurchaseStatus::Canceled,
        "refunded" => CreditPurchaseStatus::Refunded,
        "charged_back" => CreditPurchaseStatus::ChargedBack,
        _ => CreditPurchaseStatus::Failed,
    }
}

pub fn map_preapproval_status(status: &str) -> SubscriptionStatus {
    match status {
        "authorized" => SubscriptionStatus::Active,
        "paused" => SubscriptionStatus::Suspended,
        "cancelled" | "expired" => SubscriptionStatus::Canceled,
        "pending" => SubscriptionStatus::Analysis,
        "refunded" => SubscriptionStatus::Refunded,
        _ => SubscriptionStatus::Failed,
    }
}
