pub mod client;
pub mod signature;

use {
    super::payload::{expandable_id, first_non_negative_i64, str_at},
    crate::domain::{
        error::EngineError,
        event::{Correlation, NormalizedEvent},
        gateway::{Gateway, GatewayNormalizer, RawWebhook, UnresolvedPolicy},
        id::{CorrelationToken, GatewayNativeId},
        money::{Currency, MoneyAmount},
        object_ref::ObjectType,
        status::{CreditPurchaseStatus, SubscriptionStatus, TargetStatus},
    },
    serde_json::Value,
    signature::SignatureVerifier,
    std::{future::Future, pin::Pin, sync::Arc},
};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

const AMOUNT_FIELDS: &[&str] = &["/total", "/amount_paid", "/amount_total", "/amount", "/plan/amount"];

pub type Lookup<'a, T> = Pin<Box<dyn Future<Output = Result<T, EngineError>> + Send + 'a>>;

/// Stripe API re-fetches used while chasing a correlation token.
pub trait StripeLookup: Send + Sync {
    /// `metadata.token` of a payment intent.
    fn payment_intent_token<'a>(&'a self, payment_intent_id: &'a str) -> Lookup<'a, Option<String>>;

    /// Stripe subscription id an invoice was billed for.
    fn invoice_subscription<'a>(&'a self, invoice_id: &'a str) -> Lookup<'a, Option<String>>;
}

pub struct StripeNormalizer {
    verifier: SignatureVerifier,
    lookup: Arc<dyn StripeLookup>,
    default_currency: Currency,
}

impl StripeNormalizer {
    pub fn new(
        verifier: SignatureVerifier,
        lookup: Arc<dyn StripeLookup>,
        default_currency: Currency,
    ) -> Self {
        Self {
            verifier,
            lookup,
            default_currency,
        }
    }

    async fn normalize_inner(&self, raw: &RawWebhook) -> Result<NormalizedEvent, EngineError> {
        let header = raw
            .headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| EngineError::Authentication("missing Stripe-Signature header".into()))?;
        self.verifier
            .verify(header, &raw.body, chrono::Utc::now().timestamp())?;

        let payload: Value = serde_json::from_str(&raw.body)
            .map_err(|e| EngineError::MalformedPayload(format!("invalid JSON: {e}")))?;
        let event_type = str_at(&payload, "/type")
            .ok_or_else(|| EngineError::MalformedPayload("event has no type".into()))?
            .to_string();
        let object = payload
            .pointer("/data/object")
            .filter(|o| o.is_object())
            .ok_or_else(|| EngineError::MalformedPayload("event has no data.object".into()))?;

        let native_id = native_id(object)?;
        let correlation = self.correlate(&event_type, object).await?;
        let target = correlation
            .as_ref()
            .and_then(|c| map_event_type(c.object_type(), &event_type));

        // A negative total (customer credit balance) falls through to the next field.
        let amount = match first_non_negative_i64(object, AMOUNT_FIELDS) {
            Some(cents) => MoneyAmount::new(cents)
                .map_err(|e| EngineError::MalformedPayload(e.to_string()))?,
            None => MoneyAmount::ZERO,
        };
        let currency = str_at(object, "/currency")
            .or_else(|| str_at(object, "/plan/currency"))
            .and_then(|c| Currency::new(c).ok())
            .unwrap_or_else(|| self.default_currency.clone());

        Ok(NormalizedEvent {
            gateway: Gateway::Stripe,
            gateway_status: event_type.clone(),
            gateway_event_type: event_type.clone(),
            target,
            amount,
            currency: Some(currency),
            correlation,
            native_id,
            subscription_external_id: subscription_external_id(&event_type, object),
            raw: payload,
        })
    }

    /// Token chase. Lifecycle events carry the Stripe subscription itself;
    /// everything else walks reference id, metadata, payment intent, invoice, subscription.
    async fn correlate(
        &self,
        event_type: &str,
        object: &Value,
    ) -> Result<Option<Correlation>, EngineError> {
        if event_type.starts_with("customer.subscription.") {
            if let Some(token) = parse_token(str_at(object, "/metadata/token")) {
                return Ok(Some(Correlation::Token(token)));
            }
            return Ok(str_at(object, "/id")
                .map(|id| Correlation::ExternalSubscription(id.to_string())));
        }

        if let Some(token) = parse_token(str_at(object, "/client_reference_id")) {
            return Ok(Some(Correlation::Token(token)));
        }
        if let Some(token) = parse_token(str_at(object, "/metadata/token")) {
            return Ok(Some(Correlation::Token(token)));
        }
        if let Some(pi) = expandable_id(object, "/payment_intent") {
            let fetched = self.lookup.payment_intent_token(pi).await?;
            if let Some(token) = parse_token(fetched.as_deref()) {
                return Ok(Some(Correlation::Token(token)));
            }
        }
        if let Some(invoice) = expandable_id(object, "/invoice") {
            if let Some(sub) = self.lookup.invoice_subscription(invoice).await? {
                return Ok(Some(Correlation::ExternalSubscription(sub)));
            }
        }
        Ok(expandable_id(object, "/subscription")
            .map(|sub| Correlation::ExternalSubscription(sub.to_string())))
    }
}

impl GatewayNormalizer for StripeNormalizer {
    fn gateway(&self) -> Gateway {
        Gateway::Stripe
    }

    fn normalize<'a>(
        &'a self,
        raw: &'a RawWebhook,
    ) -> Pin<Box<dyn Future<Output = Result<NormalizedEvent, EngineError>> + Send + 'a>> {
        Box::pin(self.normalize_inner(raw))
    }

    fn unresolved_policy(&self) -> UnresolvedPolicy {
        UnresolvedPolicy::Acknowledge
    }
}

fn parse_token(raw: Option<&str>) -> Option<CorrelationToken> {
    let raw = raw?;
    match CorrelationToken::parse(raw) {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::debug!(token = raw, "ignoring unparsable correlation token: {e}");
            None
        }
    }
}

/// Payment intent id when the object has one, so every event about one
/// payment shares a ledger dedup key.
fn native_id(object: &Value) -> Result<GatewayNativeId, EngineError> {
    let id = expandable_id(object, "/payment_intent")
        .or_else(|| str_at(object, "/id"))
        .ok_or_else(|| EngineError::MalformedPayload("data.object has no id".into()))?;
    GatewayNativeId::new(id)
}

fn subscription_external_id(event_type: &str, object: &Value) -> Option<String> {
    let id = if event_type.starts_with("customer.subscription.") {
        str_at(object, "/id")
    } else {
        expandable_id(object, "/subscription")
    };
    id.map(str::to_string)
}

/// Stripe's vocabulary is the event type. Unlisted types are informational.
pub fn map_event_type(object_type: ObjectType, event_type: &str) -> Option<TargetStatus> {
    match object_type {
        ObjectType::Subscription => {
            let status = match event_type {
                "invoice.payment_succeeded" | "invoice.paid" => SubscriptionStatus::Active,
                "invoice.payment_failed" => SubscriptionStatus::Failed,
                "charge.refunded" => SubscriptionStatus::Refunded,
                "charge.dispute.created" => SubscriptionStatus::ChargedBack,
                "customer.subscription.deleted" => SubscriptionStatus::Canceled,
                "customer.subscription.paused" => SubscriptionStatus::Suspended,
                _ => return None,
            };
            Some(TargetStatus::Subscription(status))
        }
        ObjectType::CreditPurchase => {
            let status = match event_type {
                "payment_intent.succeeded" | "checkout.session.completed" | "charge.succeeded" => {
                    CreditPurchaseStatus::Approved
                }
                "payment_intent.processing" => CreditPurchaseStatus::Analysis,
                "payment_intent.payment_failed" => CreditPurchaseStatus::Failed,
                "payment_intent.canceled" | "checkout.session.expired" => {
                    CreditPurchaseStatus::Canceled
                }
                "charge.refunded" => CreditPurchaseStatus::Refunded,
                "charge.dispute.created" => CreditPurchaseStatus::ChargedBack,
                _ => return None,
            };
            Some(TargetStatus::CreditPurchase(status))
        }
        _ => None,
    }
}
